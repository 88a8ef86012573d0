//! Wire types for the Memos `/api/v1` endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Record, Timestamp};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMemosResponse {
    #[serde(default)]
    pub memos: Vec<MemoDto>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Numeric on old releases, a string on newer ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MemoId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoId::Number(id) => write!(f, "{id}"),
            MemoId::Text(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<MemoId>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub create_time: Option<Timestamp>,
    #[serde(default)]
    pub created_ts: Option<Timestamp>,
    #[serde(default, alias = "resources")]
    pub attachments: Vec<AttachmentRef>,
}

impl MemoDto {
    /// Resource name used to address this memo, if the service gave us enough to build one.
    pub fn identifier(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            return Some(name.to_string());
        }
        self.id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.uid.clone())
            .filter(|id| !id.is_empty())
            .map(|id| format!("memos/{id}"))
    }

    pub fn into_record(self) -> Option<Record> {
        let identifier = self.identifier()?;
        Some(Record {
            identifier,
            content: self.content,
            created_at: self.create_time.or(self.created_ts),
            attachments: self
                .attachments
                .into_iter()
                .filter_map(|attachment| attachment.name)
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateMemoRequest<'a> {
    pub content: &'a str,
    pub visibility: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemoRequest<'a> {
    pub create_time: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateAttachmentRequest<'a> {
    pub filename: &'a str,
    /// Base64 encoded payload.
    pub content: String,
    #[serde(rename = "type")]
    pub mime_type: &'a str,
    pub memo: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_prefers_name_over_id() {
        let dto: MemoDto = serde_json::from_str(
            r#"{"name":"memos/abc","id":7,"content":"hi","createTime":"2024-01-01T10:00:00Z"}"#,
        )
        .unwrap();
        let record = dto.into_record().unwrap();
        assert_eq!(record.identifier, "memos/abc");
        assert_eq!(
            record.created_at,
            Some(Timestamp::Iso("2024-01-01T10:00:00Z".to_string()))
        );
    }

    #[test]
    fn test_legacy_memo_uses_numeric_id_and_epoch() {
        let dto: MemoDto =
            serde_json::from_str(r#"{"id":42,"content":"old","createdTs":1704103200}"#).unwrap();
        let record = dto.into_record().unwrap();
        assert_eq!(record.identifier, "memos/42");
        assert_eq!(record.created_at, Some(Timestamp::Epoch(1_704_103_200)));
    }

    #[test]
    fn test_memo_without_any_identifier_is_dropped() {
        let dto: MemoDto = serde_json::from_str(r#"{"content":"orphan"}"#).unwrap();
        assert!(dto.into_record().is_none());
    }

    #[test]
    fn test_attachment_names_are_kept_in_order() {
        let dto: MemoDto = serde_json::from_str(
            r#"{"name":"memos/1","attachments":[{"name":"attachments/a"},{"name":"attachments/b"}]}"#,
        )
        .unwrap();
        let record = dto.into_record().unwrap();
        assert_eq!(record.attachments, vec!["attachments/a", "attachments/b"]);
    }

    #[test]
    fn test_attachment_request_uses_type_key() {
        let body = serde_json::to_value(CreateAttachmentRequest {
            filename: "a.jpg",
            content: "AAAA".to_string(),
            mime_type: "image/jpeg",
            memo: "memos/1",
        })
        .unwrap();
        assert_eq!(body["type"], "image/jpeg");
        assert_eq!(body["memo"], "memos/1");
    }
}
