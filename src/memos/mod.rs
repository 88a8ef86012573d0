//! Memos REST API client.
//!
//! Speaks the `/api/v1` surface of a self-hosted Memos instance: paginated
//! listing, deletion, creation, timestamp patching and attachment upload.
//! All requests carry the configured bearer token.

pub mod client;
pub mod types;

pub use client::MemosClient;
pub use types::{ListMemosResponse, MemoDto};
