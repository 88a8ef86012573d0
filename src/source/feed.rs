use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{Post, PostSource};
use crate::error::SourceError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Wrapped { batches: Vec<Vec<Post>> },
    Bare(Vec<Vec<Post>>),
}

impl FeedDocument {
    fn into_batches(self) -> Vec<Vec<Post>> {
        match self {
            FeedDocument::Wrapped { batches } => batches,
            FeedDocument::Bare(batches) => batches,
        }
    }
}

/// Reads scroll batches captured from a browser session and saved as JSON.
///
/// Accepts either `{"batches": [[post, …], …]}` or a bare array of batches.
#[derive(Debug)]
pub struct FeedFileSource {
    path: PathBuf,
    batches: Vec<Vec<Post>>,
    cursor: usize,
}

impl FeedFileSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let batches = load(&path).await?;
        log::info!("loaded {} batches from {}", batches.len(), path.display());
        Ok(Self {
            path,
            batches,
            cursor: 0,
        })
    }

    pub fn from_batches(batches: Vec<Vec<Post>>) -> Self {
        Self {
            path: PathBuf::new(),
            batches,
            cursor: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.batches.len().saturating_sub(self.cursor)
    }
}

async fn load(path: &Path) -> Result<Vec<Vec<Post>>, SourceError> {
    let raw = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let document: FeedDocument = serde_json::from_slice(&raw)?;
    Ok(document.into_batches())
}

#[async_trait]
impl PostSource for FeedFileSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<Post>>, SourceError> {
        let batch = self.batches.get(self.cursor).cloned();
        if batch.is_some() {
            self.cursor += 1;
        }
        Ok(batch)
    }

    async fn restart(&mut self) -> Result<(), SourceError> {
        // Pick up a re-exported file if one was written since the last read.
        if !self.path.as_os_str().is_empty() {
            self.batches = load(&self.path).await?;
        }
        self.cursor = 0;
        Ok(())
    }
}
