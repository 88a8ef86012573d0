//! Creation executor: turns planned drafts into notes.
//!
//! The service does not accept a past creation time on create, so each note
//! is created first and then patched to the source timestamp. If the patch
//! fails the note stays with its upload time; that is reported and left as is.

use crate::error::MediaError;
use crate::models::{Attachment, Draft};
use crate::pipeline::classify::{Action, ActionPlan};
use crate::pipeline::execute::ActionFailure;
use crate::service::NotesService;
use crate::source::MediaFetcher;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub created: usize,
    pub create_failed: usize,
    pub backdated: usize,
    /// Notes that exist but kept the wrong creation time.
    pub backdate_failed: usize,
    pub attachments_uploaded: usize,
    pub attachments_failed: usize,
    pub failures: Vec<ActionFailure>,
}

impl IngestOutcome {
    pub fn merge(&mut self, other: IngestOutcome) {
        self.created += other.created;
        self.create_failed += other.create_failed;
        self.backdated += other.backdated;
        self.backdate_failed += other.backdate_failed;
        self.attachments_uploaded += other.attachments_uploaded;
        self.attachments_failed += other.attachments_failed;
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, identifier: &str, reason: String) {
        self.failures.push(ActionFailure {
            identifier: identifier.to_string(),
            reason,
        });
    }
}

/// Creates every draft planned for creation, in order.
pub async fn execute_creations(
    service: &dyn NotesService,
    media: &dyn MediaFetcher,
    plan: &ActionPlan<Draft>,
    dry_run: bool,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for draft in plan.items(Action::Create) {
        outcome.merge(create_one(service, media, draft, dry_run).await);
    }
    outcome
}

async fn create_one(
    service: &dyn NotesService,
    media: &dyn MediaFetcher,
    draft: &Draft,
    dry_run: bool,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    let preview = draft.preview(50);

    if dry_run {
        log::info!(
            "would create `{}` dated {} with {} images{}",
            preview,
            draft.created_at.as_deref().unwrap_or("now"),
            draft.images.len(),
            if draft.video.is_some() { " and a video" } else { "" }
        );
        outcome.created += 1;
        return outcome;
    }

    let name = match service.create_record(&draft.content).await {
        Ok(name) => {
            log::info!("created {}: {}", name, preview);
            outcome.created += 1;
            name
        }
        Err(err) => {
            log::error!("failed to create note `{}`: {}", preview, err);
            outcome.create_failed += 1;
            outcome.fail(&preview, format!("create failed: {err}"));
            return outcome;
        }
    };

    if let Some(created_at) = draft.created_at.as_deref() {
        match service.set_created_at(&name, created_at).await {
            Ok(()) => {
                log::info!("{} backdated to {}", name, created_at);
                outcome.backdated += 1;
            }
            Err(err) => {
                log::warn!(
                    "{} was created but keeps its upload time, backdate to {} failed: {}",
                    name,
                    created_at,
                    err
                );
                outcome.backdate_failed += 1;
                outcome.fail(&name, format!("backdate to {created_at} failed: {err}"));
            }
        }
    }

    for url in &draft.images {
        let fetched = media.fetch_image(url).await;
        attach(service, &name, url, fetched, &mut outcome).await;
    }

    if let Some(post_url) = draft.video.as_deref() {
        let fetched = media.fetch_video(post_url).await;
        attach(service, &name, post_url, fetched, &mut outcome).await;
    }

    outcome
}

async fn attach(
    service: &dyn NotesService,
    parent: &str,
    origin: &str,
    fetched: Result<Attachment, MediaError>,
    outcome: &mut IngestOutcome,
) {
    let attachment = match fetched {
        Ok(attachment) => attachment,
        Err(err) => {
            log::warn!("{}: could not download {}: {}", parent, origin, err);
            outcome.attachments_failed += 1;
            outcome.fail(parent, format!("download of {origin} failed: {err}"));
            return;
        }
    };

    match service.create_attachment(parent, &attachment).await {
        Ok(name) => {
            log::info!("{}: attached {}", parent, name);
            outcome.attachments_uploaded += 1;
        }
        Err(err) => {
            log::warn!("{}: failed to upload {}: {}", parent, attachment.filename, err);
            outcome.attachments_failed += 1;
            outcome.fail(
                parent,
                format!("upload of {} failed: {err}", attachment.filename),
            );
        }
    }
}
