//! The notes service as the pipeline sees it.

use async_trait::async_trait;

use crate::error::MemosError;
use crate::models::{Attachment, Record};

/// Result of requesting one page of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Page {
        records: Vec<Record>,
        next_token: Option<String>,
        /// Items on the page that could not be turned into a `Record`.
        malformed: usize,
    },
    /// The service has nothing further to return.
    EndOfStream,
    /// The page could not be fetched; earlier pages remain valid.
    FetchFailed(String),
}

/// Remote operations used by the pipeline. Implemented by
/// [`MemosClient`](crate::memos::MemosClient).
#[async_trait]
pub trait NotesService: Send + Sync {
    async fn list_page(&self, page_token: Option<&str>) -> PageOutcome;

    async fn delete_record(&self, identifier: &str) -> Result<(), MemosError>;

    /// Creates a note and returns its resource name.
    async fn create_record(&self, content: &str) -> Result<String, MemosError>;

    /// Overwrites the creation time of an existing note.
    async fn set_created_at(&self, identifier: &str, created_at: &str) -> Result<(), MemosError>;

    /// Uploads `attachment` under the note `parent` and returns the attachment name.
    async fn create_attachment(
        &self,
        parent: &str,
        attachment: &Attachment,
    ) -> Result<String, MemosError>;
}
