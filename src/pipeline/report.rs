//! Summary reporting.
//!
//! Everything here only reads counters collected by the other stages.

use std::fmt;

use crate::models::Record;
use crate::pipeline::classify::{Action, ActionPlan, DuplicateGroup};
use crate::pipeline::execute::ActionFailure;
use crate::pipeline::ingest::IngestOutcome;

const RULE: &str = "============================================================";

/// Duplicate groups shown in full before asking for confirmation.
pub const DUPLICATE_PREVIEW_LIMIT: usize = 15;
/// Purge targets listed before asking for confirmation.
pub const PURGE_PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Dedupe,
    Purge,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Dedupe => write!(f, "duplicate cleanup"),
            Job::Purge => write!(f, "cleanup of old memos"),
        }
    }
}

/// Counters for a delete run (dedupe or purge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub job: Job,
    pub dry_run: bool,
    pub fetched: usize,
    pub pages: usize,
    pub malformed: usize,
    pub repeated: usize,
    pub fetch_failure: Option<String>,
    pub planned: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub declined: bool,
    pub failures: Vec<ActionFailure>,
}

impl RunSummary {
    pub fn new(job: Job, dry_run: bool) -> Self {
        Self {
            job,
            dry_run,
            fetched: 0,
            pages: 0,
            malformed: 0,
            repeated: 0,
            fetch_failure: None,
            planned: 0,
            skipped: 0,
            succeeded: 0,
            failed: 0,
            declined: false,
            failures: Vec::new(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "SUMMARY: {}", self.job)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Fetched: {} memos ({} pages)", self.fetched, self.pages)?;
        if self.malformed > 0 {
            writeln!(f, "Unaddressable memos ignored: {}", self.malformed)?;
        }
        if self.repeated > 0 {
            writeln!(f, "Repeated memos ignored: {}", self.repeated)?;
        }
        if let Some(reason) = &self.fetch_failure {
            writeln!(f, "Fetch stopped early: {reason}")?;
        }
        writeln!(f, "Planned deletions: {}", self.planned)?;
        writeln!(f, "Kept: {}", self.skipped)?;

        if self.declined {
            writeln!(f, "Deletion cancelled, nothing was changed")?;
        } else if self.dry_run {
            writeln!(f, "Dry run: would delete {} memos", self.succeeded)?;
        } else {
            writeln!(f, "Deleted: {}, failed: {}", self.succeeded, self.failed)?;
            for failure in &self.failures {
                writeln!(f, "  {}: {}", failure.identifier, failure.reason)?;
            }
        }
        write!(f, "{RULE}")
    }
}

/// Counters for an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub dry_run: bool,
    pub batches: usize,
    pub posts_seen: usize,
    pub unique: usize,
    pub repeats: usize,
    pub source_failure: Option<String>,
    pub outcome: IngestOutcome,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = &self.outcome;
        writeln!(f, "{RULE}")?;
        writeln!(f, "SUMMARY: import")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Batches scanned: {}", self.batches)?;
        writeln!(
            f,
            "Posts seen: {} ({} unique, {} repeats)",
            self.posts_seen, self.unique, self.repeats
        )?;
        if let Some(reason) = &self.source_failure {
            writeln!(f, "Source stopped early: {reason}")?;
        }
        if self.dry_run {
            writeln!(f, "Dry run: would create {} memos", outcome.created)?;
        } else {
            writeln!(
                f,
                "Created: {}, failed: {}",
                outcome.created, outcome.create_failed
            )?;
            writeln!(
                f,
                "Backdated: {}, backdate failed: {}",
                outcome.backdated, outcome.backdate_failed
            )?;
            writeln!(
                f,
                "Attachments uploaded: {}, failed: {}",
                outcome.attachments_uploaded, outcome.attachments_failed
            )?;
            for failure in &outcome.failures {
                writeln!(f, "  {}: {}", failure.identifier, failure.reason)?;
            }
        }
        write!(f, "{RULE}")
    }
}

fn created_label(record: &Record) -> String {
    record
        .created_at
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "N/A".to_string())
}

/// Describes the first `limit` duplicate groups in detail.
pub fn render_duplicate_preview(groups: &[DuplicateGroup], limit: usize) -> String {
    if groups.is_empty() {
        return "No duplicates found.\n".to_string();
    }

    let mut out = format!(
        "Found {} sets of duplicate content on the same date\n\n",
        groups.len()
    );
    for (index, group) in groups.iter().take(limit).enumerate() {
        out.push_str(&format!(
            "Set {}: {} copies on {}\n",
            index + 1,
            group.duplicates.len() + 1,
            group.date()
        ));
        out.push_str(&format!("  Content: {}...\n", group.keep.preview(60)));
        out.push_str(&format!("  Will keep: {} (oldest)\n", group.keep.identifier));
        out.push_str(&format!(
            "  Will delete: {} duplicate(s)\n",
            group.duplicates.len()
        ));
        for member in group.members() {
            out.push_str(&format!(
                "    - {}: {}\n",
                member.identifier,
                created_label(member)
            ));
        }
        out.push('\n');
    }
    if groups.len() > limit {
        out.push_str(&format!(
            "... and {} more duplicate sets\n",
            groups.len() - limit
        ));
    }

    let total: usize = groups.iter().map(|g| g.duplicates.len()).sum();
    out.push_str(&format!("Total duplicates to delete: {total}\n"));
    out
}

/// Lists the first `limit` records planned for deletion.
pub fn render_purge_preview(plan: &ActionPlan<Record>, limit: usize) -> String {
    let total = plan.count(Action::Delete);
    let mut out = format!("Found {total} memos to delete\n");
    for (index, record) in plan.items(Action::Delete).take(limit).enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {}...\n",
            index + 1,
            created_label(record),
            record.preview(50)
        ));
    }
    if total > limit {
        out.push_str(&format!("  ... and {} more\n", total - limit));
    }
    out
}
