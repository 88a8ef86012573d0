//! In-memory stand-ins for the remote collaborators, used by unit tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::error::MemosError;
use crate::models::{Attachment, Record, Timestamp};
use crate::service::{NotesService, PageOutcome};

pub fn record(id: &str, content: &str, created_at: &str) -> Record {
    Record::new(id, content).created(Timestamp::Iso(created_at.to_string()))
}

/// Every mutating call the fake received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Delete(String),
    Create(String),
    Backdate(String, String),
    Attach(String, String),
}

#[derive(Default)]
pub struct FakeNotes {
    pages: Mutex<VecDeque<PageOutcome>>,
    calls: Mutex<Vec<Call>>,
    list_calls: Mutex<Vec<Option<String>>>,
    failing_deletes: HashSet<String>,
    failing_attachments: HashSet<String>,
    fail_create: bool,
    fail_backdate: bool,
    next_id: Mutex<u32>,
}

impl FakeNotes {
    pub fn with_pages(pages: Vec<PageOutcome>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Self::default()
        }
    }

    pub fn failing_delete(mut self, identifier: &str) -> Self {
        self.failing_deletes.insert(identifier.to_string());
        self
    }

    pub fn failing_attachment(mut self, filename: &str) -> Self {
        self.failing_attachments.insert(filename.to_string());
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_backdate(mut self) -> Self {
        self.fail_backdate = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error() -> MemosError {
    MemosError::status(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string())
}

#[async_trait]
impl NotesService for FakeNotes {
    async fn list_page(&self, page_token: Option<&str>) -> PageOutcome {
        self.list_calls
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PageOutcome::EndOfStream)
    }

    async fn delete_record(&self, identifier: &str) -> Result<(), MemosError> {
        self.record_call(Call::Delete(identifier.to_string()));
        if self.failing_deletes.contains(identifier) {
            return Err(server_error());
        }
        Ok(())
    }

    async fn create_record(&self, content: &str) -> Result<String, MemosError> {
        self.record_call(Call::Create(content.to_string()));
        if self.fail_create {
            return Err(server_error());
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(format!("memos/{}", *next))
    }

    async fn set_created_at(&self, identifier: &str, created_at: &str) -> Result<(), MemosError> {
        self.record_call(Call::Backdate(
            identifier.to_string(),
            created_at.to_string(),
        ));
        if self.fail_backdate {
            return Err(server_error());
        }
        Ok(())
    }

    async fn create_attachment(
        &self,
        parent: &str,
        attachment: &Attachment,
    ) -> Result<String, MemosError> {
        self.record_call(Call::Attach(
            parent.to_string(),
            attachment.filename.clone(),
        ));
        if self.failing_attachments.contains(&attachment.filename) {
            return Err(server_error());
        }
        Ok(format!("attachments/{}", attachment.filename))
    }
}
