//! Run orchestration: fetch, classify, confirm, execute, report.
//!
//! The delete jobs (`dedupe`, `purge`) walk a fixed sequence of phases.
//! `AwaitingConfirmation` is entered only for live runs that would change
//! something; a declined prompt jumps straight to `Reporting`.

pub mod classify;
pub mod execute;
pub mod fetch;
pub mod ingest;
pub mod report;

use std::fmt;
use std::io::Write;

use crate::confirm::Confirm;
use crate::error::ExecuteError;
use crate::pipeline::classify::{Action, Policy};
use crate::pipeline::execute::{ExecuteOptions, authorize, execute_deletions};
use crate::pipeline::fetch::fetch_all;
use crate::pipeline::ingest::execute_creations;
use crate::pipeline::report::{
    DUPLICATE_PREVIEW_LIMIT, ImportSummary, Job, PURGE_PREVIEW_LIMIT, RunSummary,
    render_duplicate_preview, render_purge_preview,
};
use crate::service::NotesService;
use crate::source::{MediaFetcher, PostSource, SeenPosts, plan_batch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Classifying,
    AwaitingConfirmation,
    Executing,
    Reporting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Classifying => "classifying",
            RunPhase::AwaitingConfirmation => "awaiting confirmation",
            RunPhase::Executing => "executing",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives one job against a notes service.
///
/// Previews and the final report go to `out`; progress goes to the log.
pub struct Pipeline<'a, W: Write> {
    service: &'a dyn NotesService,
    options: ExecuteOptions,
    out: W,
    trail: Vec<RunPhase>,
}

impl<'a, W: Write> Pipeline<'a, W> {
    pub fn new(service: &'a dyn NotesService, options: ExecuteOptions, out: W) -> Self {
        Self {
            service,
            options,
            out,
            trail: vec![RunPhase::Idle],
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.trail.last().copied().unwrap_or(RunPhase::Idle)
    }

    /// Every phase entered so far, starting with `Idle`.
    pub fn trail(&self) -> &[RunPhase] {
        &self.trail
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn enter(&mut self, next: RunPhase) {
        log::debug!("phase: {} -> {}", self.phase(), next);
        self.trail.push(next);
    }

    /// Runs a delete job under `policy`.
    ///
    /// Only console failures surface as errors. Fetch and action failures
    /// are folded into the summary.
    pub async fn run(
        &mut self,
        policy: Policy,
        confirm: &mut dyn Confirm,
    ) -> Result<RunSummary, ExecuteError> {
        let job = match policy {
            Policy::Cutoff(_) => Job::Purge,
            Policy::Duplicates(_) => Job::Dedupe,
        };
        let mut summary = RunSummary::new(job, self.options.dry_run);
        if self.options.dry_run {
            log::info!("dry run: no memos will be deleted");
        }

        self.enter(RunPhase::Fetching);
        let fetched = fetch_all(self.service).await;
        summary.fetched = fetched.records.len();
        summary.pages = fetched.pages;
        summary.malformed = fetched.malformed;
        summary.repeated = fetched.repeated;
        summary.fetch_failure = fetched.failure.clone();

        self.enter(RunPhase::Classifying);
        let classification = policy.classify(&fetched.records);
        let plan = classification.plan;
        summary.planned = plan.count(Action::Delete);
        summary.skipped = plan.count(Action::Skip);

        let preview = match policy {
            Policy::Cutoff(_) => render_purge_preview(&plan, PURGE_PREVIEW_LIMIT),
            Policy::Duplicates(_) => {
                render_duplicate_preview(&classification.groups, DUPLICATE_PREVIEW_LIMIT)
            }
        };
        write!(self.out, "{preview}")?;
        self.out.flush()?;

        if !self.options.dry_run && plan.mutating() > 0 {
            self.enter(RunPhase::AwaitingConfirmation);
            match authorize(&plan, &self.options, confirm) {
                Ok(()) => {}
                Err(ExecuteError::ConfirmationDeclined) => {
                    log::warn!("deletion cancelled by user");
                    summary.declined = true;
                    return self.report(summary);
                }
                Err(err) => return Err(err),
            }
        }

        self.enter(RunPhase::Executing);
        let outcome = execute_deletions(self.service, &plan, &self.options).await;
        summary.succeeded = outcome.succeeded;
        summary.failed = outcome.failed;
        summary.failures = outcome.failures;

        self.report(summary)
    }

    /// Imports posts from `source`, reading at most `max_batches` batches.
    pub async fn run_import(
        &mut self,
        source: &mut dyn PostSource,
        media: &dyn MediaFetcher,
        max_batches: usize,
    ) -> Result<ImportSummary, ExecuteError> {
        let mut summary = ImportSummary {
            dry_run: self.options.dry_run,
            ..ImportSummary::default()
        };
        let mut seen = SeenPosts::default();

        if let Err(err) = source.restart().await {
            log::error!("could not rewind post source: {}", err);
            summary.source_failure = Some(err.to_string());
            return self.report_import(summary);
        }

        while summary.batches < max_batches {
            self.enter(RunPhase::Fetching);
            let batch = match source.next_batch().await {
                Ok(Some(batch)) => batch,
                Ok(None) => {
                    log::info!("post source exhausted after {} batches", summary.batches);
                    break;
                }
                Err(err) => {
                    log::error!("post source failed: {}", err);
                    summary.source_failure = Some(err.to_string());
                    break;
                }
            };
            summary.batches += 1;
            summary.posts_seen += batch.len();

            self.enter(RunPhase::Classifying);
            let plan = plan_batch(batch, &mut seen);
            let fresh = plan.count(Action::Create);
            summary.repeats += plan.count(Action::Skip);
            log::info!(
                "batch {}: {} posts, {} new",
                summary.batches,
                plan.len(),
                fresh
            );
            if fresh == 0 {
                log::info!("batch {}: no new posts in this batch", summary.batches);
                continue;
            }

            self.enter(RunPhase::Executing);
            let outcome =
                execute_creations(self.service, media, &plan, self.options.dry_run).await;
            summary.outcome.merge(outcome);
        }

        summary.unique = seen.len();
        self.report_import(summary)
    }

    fn report(&mut self, summary: RunSummary) -> Result<RunSummary, ExecuteError> {
        self.enter(RunPhase::Reporting);
        writeln!(self.out, "{summary}")?;
        self.out.flush()?;
        self.enter(RunPhase::Done);
        Ok(summary)
    }

    fn report_import(&mut self, summary: ImportSummary) -> Result<ImportSummary, ExecuteError> {
        self.enter(RunPhase::Reporting);
        writeln!(self.out, "{summary}")?;
        self.out.flush()?;
        self.enter(RunPhase::Done);
        Ok(summary)
    }
}
