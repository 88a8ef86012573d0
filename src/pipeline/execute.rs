//! Deletion executor.

use std::time::Duration;

use crate::confirm::Confirm;
use crate::error::ExecuteError;
use crate::models::Record;
use crate::pipeline::classify::{Action, ActionPlan};
use crate::service::NotesService;

#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Report every action as done without calling the service.
    pub dry_run: bool,
    /// Pause between consecutive requests.
    pub delay: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            delay: Duration::from_millis(100),
        }
    }
}

/// One action the service refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<ActionFailure>,
}

/// Gate in front of live deletions.
///
/// Passes without asking in dry-run mode or when nothing would be deleted.
pub fn authorize(
    plan: &ActionPlan<Record>,
    options: &ExecuteOptions,
    confirm: &mut dyn Confirm,
) -> Result<(), ExecuteError> {
    let deletions = plan.count(Action::Delete);
    if options.dry_run || deletions == 0 {
        return Ok(());
    }

    let prompt = format!("This will permanently delete {deletions} memos. Continue?");
    if confirm.confirm(&prompt)? {
        Ok(())
    } else {
        Err(ExecuteError::ConfirmationDeclined)
    }
}

/// Deletes every record planned for deletion, one request at a time.
///
/// A failed delete is logged and counted, then the next record is tried.
pub async fn execute_deletions(
    service: &dyn NotesService,
    plan: &ActionPlan<Record>,
    options: &ExecuteOptions,
) -> ExecutionOutcome {
    let total = plan.count(Action::Delete);
    let mut outcome = ExecutionOutcome::default();

    for (index, record) in plan.items(Action::Delete).enumerate() {
        outcome.attempted += 1;

        if options.dry_run {
            log::info!(
                "[{}/{}] would delete {}: {}",
                index + 1,
                total,
                record.identifier,
                record.preview(50)
            );
            outcome.succeeded += 1;
            continue;
        }

        if index > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        match service.delete_record(&record.identifier).await {
            Ok(()) => {
                log::info!("[{}/{}] deleted {}", index + 1, total, record.identifier);
                outcome.succeeded += 1;
            }
            Err(err) => {
                log::error!(
                    "[{}/{}] failed to delete {}: {}",
                    index + 1,
                    total,
                    record.identifier,
                    err
                );
                outcome.failed += 1;
                outcome.failures.push(ActionFailure {
                    identifier: record.identifier.clone(),
                    reason: err.to_string(),
                });
            }
        }

        if (index + 1) % 10 == 0 {
            log::info!("progress: {}/{} deletions processed", index + 1, total);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Preset;
    use crate::test_support::{Call, FakeNotes, record};

    fn plan() -> ActionPlan<Record> {
        vec![
            (record("memos/1", "a", "2020-01-01T00:00:00Z"), Action::Delete),
            (record("memos/2", "b", "2030-01-01T00:00:00Z"), Action::Skip),
            (record("memos/3", "c", "2020-01-02T00:00:00Z"), Action::Delete),
            (record("memos/4", "d", "2020-01-03T00:00:00Z"), Action::Delete),
        ]
        .into_iter()
        .collect()
    }

    fn live() -> ExecuteOptions {
        ExecuteOptions {
            dry_run: false,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_the_service() {
        let fake = FakeNotes::default();
        let options = ExecuteOptions {
            dry_run: true,
            delay: Duration::ZERO,
        };

        let outcome = execute_deletions(&fake, &plan(), &options).await;

        assert!(fake.calls().is_empty());
        assert_eq!(outcome.succeeded, plan().count(Action::Delete));
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_the_batch() {
        let fake = FakeNotes::default().failing_delete("memos/3");

        let outcome = execute_deletions(&fake, &plan(), &live()).await;

        assert_eq!(
            fake.calls(),
            vec![
                Call::Delete("memos/1".into()),
                Call::Delete("memos/3".into()),
                Call::Delete("memos/4".into()),
            ]
        );
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].identifier, "memos/3");
    }

    #[test]
    fn test_live_run_requires_confirmation() {
        let mut declined = Preset::no();
        let err = authorize(&plan(), &live(), &mut declined).unwrap_err();
        assert!(matches!(err, ExecuteError::ConfirmationDeclined));
        assert_eq!(declined.asked(), 1);

        let mut accepted = Preset::yes();
        authorize(&plan(), &live(), &mut accepted).unwrap();
    }

    #[test]
    fn test_no_prompt_for_dry_run_or_empty_plan() {
        let mut preset = Preset::no();
        let dry = ExecuteOptions {
            dry_run: true,
            delay: Duration::ZERO,
        };
        authorize(&plan(), &dry, &mut preset).unwrap();
        authorize(&ActionPlan::default(), &live(), &mut preset).unwrap();
        assert_eq!(preset.asked(), 0);
    }

    #[tokio::test]
    async fn test_delay_applies_between_requests() {
        let fake = FakeNotes::default();
        let options = ExecuteOptions {
            dry_run: false,
            delay: Duration::from_millis(20),
        };
        let started = std::time::Instant::now();

        execute_deletions(&fake, &plan(), &options).await;

        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
