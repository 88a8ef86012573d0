//! External post source consumed by the `import` job.
//!
//! The social profile is read as a sequence of batches, one per scroll of the
//! timeline. Consecutive batches overlap heavily, so every post is reduced to
//! a signature and only the first sighting of a signature becomes a `Create`.

pub mod feed;
pub mod media;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::error::SourceError;
use crate::models::Draft;
use crate::pipeline::classify::{Action, ActionPlan};

pub use feed::FeedFileSource;
pub use media::{HttpMediaFetcher, MediaFetcher};

/// Separator placed between a repost's own text and the quoted text.
pub const QUOTE_SEPARATOR: &str = "\n\n---\n\n";

/// A post as scraped from the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Post {
    /// Text blocks in page order. Quotes and reposts carry more than one.
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Permalink of a post that embeds a video.
    #[serde(default)]
    pub video: Option<String>,
}

impl Post {
    /// The note body, or `None` when the post has no text at all.
    pub fn text(&self) -> Option<String> {
        let mut parts = self.texts.iter().filter(|text| !text.is_empty());
        let first = parts.next()?;
        Some(match parts.next() {
            Some(quoted) => format!("{first}{QUOTE_SEPARATOR}{quoted}"),
            None => first.clone(),
        })
    }

    pub fn into_draft(self) -> Option<Draft> {
        let content = self.text()?;
        Some(Draft {
            content,
            created_at: self.timestamp,
            images: self.images,
            video: self.video,
        })
    }
}

/// Identity of a post across overlapping batches.
pub fn signature(draft: &Draft) -> String {
    let material = format!(
        "{}{}{}{}",
        draft.content,
        draft.created_at.as_deref().unwrap_or("None"),
        draft.images.len(),
        draft.video.is_some()
    );
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

/// Signatures observed so far in this run.
#[derive(Debug, Default)]
pub struct SeenPosts {
    signatures: HashSet<String>,
}

impl SeenPosts {
    /// Records `draft`; `true` the first time it is seen.
    pub fn insert(&mut self, draft: &Draft) -> bool {
        self.signatures.insert(signature(draft))
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Plans one batch: new posts are created, repeats are skipped, textless posts
/// are dropped.
pub fn plan_batch(batch: Vec<Post>, seen: &mut SeenPosts) -> ActionPlan<Draft> {
    batch
        .into_iter()
        .filter_map(Post::into_draft)
        .map(|draft| {
            let action = if seen.insert(&draft) {
                Action::Create
            } else {
                Action::Skip
            };
            (draft, action)
        })
        .collect()
}

/// Ordered, restartable production of post batches.
#[async_trait]
pub trait PostSource: Send {
    /// Next batch, or `None` once the source is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<Post>>, SourceError>;

    /// Rewinds to the first batch.
    async fn restart(&mut self) -> Result<(), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(texts: &[&str], timestamp: &str) -> Post {
        Post {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            timestamp: Some(timestamp.to_string()),
            ..Post::default()
        }
    }

    #[test]
    fn test_quote_combines_first_two_texts() {
        let quoted = post(&["my take", "original", "ignored"], "2024-01-01T00:00:00.000Z");
        assert_eq!(quoted.text().unwrap(), "my take\n\n---\n\noriginal");
    }

    #[test]
    fn test_textless_post_is_dropped() {
        let empty = post(&["", ""], "2024-01-01T00:00:00.000Z");
        assert!(empty.into_draft().is_none());
    }

    #[test]
    fn test_whitespace_text_still_counts() {
        let spaces = post(&["", "  "], "2024-01-01T00:00:00.000Z");
        assert_eq!(spaces.into_draft().unwrap().content, "  ");
    }

    #[test]
    fn test_signature_depends_on_media() {
        let plain = post(&["hi"], "2024-01-01T00:00:00.000Z").into_draft().unwrap();
        let mut with_image = plain.clone();
        with_image.images.push("https://pbs.twimg.com/media/a.jpg".into());
        let mut with_video = plain.clone();
        with_video.video = Some("https://x.com/u/status/1".into());

        assert_ne!(signature(&plain), signature(&with_image));
        assert_ne!(signature(&plain), signature(&with_video));
        assert_eq!(signature(&plain), signature(&plain.clone()));
    }

    #[test]
    fn test_overlapping_batches_create_once() {
        let mut seen = SeenPosts::default();
        let first = plan_batch(
            vec![post(&["a"], "t1"), post(&["b"], "t2")],
            &mut seen,
        );
        let second = plan_batch(
            vec![post(&["b"], "t2"), post(&["c"], "t3"), post(&["c"], "t3")],
            &mut seen,
        );

        assert_eq!(first.count(Action::Create), 2);
        assert_eq!(second.count(Action::Create), 1);
        assert_eq!(second.count(Action::Skip), 2);
        assert_eq!(seen.len(), 3);
    }
}
