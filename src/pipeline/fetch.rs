//! Paginated fetching.

use std::collections::HashSet;

use crate::models::Record;
use crate::service::{NotesService, PageOutcome};

/// Everything retrieved before pagination stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub records: Vec<Record>,
    pub pages: usize,
    /// Items the service returned that could not be addressed.
    pub malformed: usize,
    /// Records already received on an earlier page, dropped.
    pub repeated: usize,
    /// Why fetching stopped early, if it did. `records` still holds the pages
    /// that arrived before the failure.
    pub failure: Option<String>,
}

impl FetchResult {
    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}

/// Walks the continuation tokens until the service signals the end.
///
/// Failures are not retried. A failed page stops pagination but keeps the
/// records already received so later stages can still run on them.
pub async fn fetch_all(service: &dyn NotesService) -> FetchResult {
    let mut result = FetchResult::default();
    let mut token: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        let page_number = result.pages + 1;
        match service.list_page(token.as_deref()).await {
            PageOutcome::Page {
                records,
                next_token,
                malformed,
            } => {
                result.pages = page_number;
                result.malformed += malformed;
                log::info!("page {}: {} memos", page_number, records.len());
                for record in records {
                    if seen.insert(record.identifier.clone()) {
                        result.records.push(record);
                    } else {
                        log::warn!(
                            "page {}: {} was already fetched, ignoring the repeat",
                            page_number,
                            record.identifier
                        );
                        result.repeated += 1;
                    }
                }

                match next_token {
                    Some(next) if token.as_deref() == Some(next.as_str()) => {
                        log::warn!("page {}: service repeated token, stopping", page_number);
                        break;
                    }
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
            PageOutcome::EndOfStream => {
                log::info!("page {}: no more memos", page_number);
                break;
            }
            PageOutcome::FetchFailed(reason) => {
                log::error!("page {}: fetch failed: {}", page_number, reason);
                if !result.records.is_empty() {
                    log::warn!(
                        "continuing with {} memos fetched so far",
                        result.records.len()
                    );
                }
                result.failure = Some(reason);
                break;
            }
        }
    }

    log::info!(
        "fetched {} memos across {} pages",
        result.records.len(),
        result.pages
    );
    result
}
