//! Typed records shared by the pipeline stages.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimestampError;

/// Creation time exactly as the notes service reported it.
///
/// Newer Memos releases send an RFC 3339 `createTime`, older ones an integer
/// `createdTs`. The raw value is kept so previews can show what the service
/// said, and parsing is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Iso(String),
}

impl Timestamp {
    pub fn parse(&self) -> Result<DateTime<Utc>, TimestampError> {
        match self {
            Timestamp::Iso(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|source| TimestampError::Invalid {
                    raw: raw.clone(),
                    reason: source.to_string(),
                }),
            Timestamp::Epoch(secs) => {
                DateTime::<Utc>::from_timestamp(*secs, 0).ok_or(TimestampError::OutOfRange(*secs))
            }
        }
    }

    /// Like [`parse`](Self::parse), but also reads ISO strings without an
    /// offset, taking them as UTC. Not for deciding deletions by time.
    pub fn parse_lenient(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = self.parse() {
            return Some(parsed);
        }
        let Timestamp::Iso(raw) = self else {
            return None;
        };
        let raw = raw.trim();
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|day| day.and_hms_opt(0, 0, 0))
            })
            .map(|naive| naive.and_utc())
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timestamp::Iso(raw) => write!(f, "{raw}"),
            Timestamp::Epoch(secs) => write!(f, "{secs}"),
        }
    }
}

/// A note fetched from the remote service. Never mutated after the fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Resource name used to address the note, e.g. `memos/42`.
    pub identifier: String,
    pub content: String,
    pub created_at: Option<Timestamp>,
    /// Resource names of attachments, in service order.
    pub attachments: Vec<String>,
}

impl Record {
    pub fn new(identifier: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
            created_at: None,
            attachments: Vec::new(),
        }
    }

    pub fn created(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Parsed creation time; `None` when missing or unparseable.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(|ts| ts.parse().ok())
    }

    /// Creation time for grouping; offset-less times are read as UTC.
    pub fn created_at_lenient(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(Timestamp::parse_lenient)
    }

    /// Calendar day (UTC) the note was created on.
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at_lenient().map(|dt| dt.date_naive())
    }

    /// First `max_chars` characters of the content on a single line.
    pub fn preview(&self, max_chars: usize) -> String {
        preview_text(&self.content, max_chars)
    }
}

/// A note that should be created, built from an external post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    /// Original publication time the created note is backdated to.
    pub created_at: Option<String>,
    pub images: Vec<String>,
    /// Permalink of the post, handed to the video fetcher.
    pub video: Option<String>,
}

impl Draft {
    pub fn preview(&self, max_chars: usize) -> String {
        preview_text(&self.content, max_chars)
    }
}

/// Binary payload ready to be attached to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub(crate) fn preview_text(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
