//! Core types for comment-sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Comment as returned by the remote API
///
/// The wire format uses `id` for the external identifier and `postId` for the
/// group the comment belongs to. Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalComment {
    /// Identifier assigned by the remote API (natural key of stored comments)
    #[serde(rename = "id")]
    pub external_id: i64,
    /// Group (post) the comment belongs to
    #[serde(rename = "postId")]
    pub group_id: i64,
    /// Comment title
    pub name: String,
    /// Author email
    pub email: String,
    /// Comment text
    pub body: String,
}

/// Comment as persisted in the local store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredComment {
    /// Store-assigned primary key, stable after the first insert
    pub id: i64,
    /// Identifier assigned by the remote API (unique)
    pub external_id: i64,
    /// Group (post) the comment belongs to
    pub group_id: i64,
    /// Comment title
    pub name: String,
    /// Author email
    pub email: String,
    /// Comment text
    pub body: String,
    /// When the comment was first stored
    pub created_at: DateTime<Utc>,
    /// When the comment was last written
    pub updated_at: DateTime<Utc>,
}

/// Stage of a single sync operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncStage {
    /// Calling the remote API (including retries)
    Fetching,
    /// Mapping the remote comment to a storable record
    Transforming,
    /// Writing the record to the store
    Persisting,
    /// Finished successfully
    Done,
    /// Stopped by an error
    Failed,
}

impl SyncStage {
    /// Lowercase stage name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Fetching => "fetching",
            SyncStage::Transforming => "transforming",
            SyncStage::Persisting => "persisting",
            SyncStage::Done => "done",
            SyncStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn external_comment_reads_remote_field_names() {
        let json = r#"{
            "postId": 1,
            "id": 3,
            "name": "odio adipisci rerum",
            "email": "Nikita@garfield.biz",
            "body": "quia molestiae reprehenderit",
            "extra": true
        }"#;

        let comment: ExternalComment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.external_id, 3);
        assert_eq!(comment.group_id, 1);
        assert_eq!(comment.email, "Nikita@garfield.biz");
    }

    #[test]
    fn external_comment_missing_field_fails() {
        let json = r#"{ "postId": 1, "id": 3, "name": "n", "email": "e" }"#;
        assert!(serde_json::from_str::<ExternalComment>(json).is_err());
    }

    #[test]
    fn stored_comment_serializes_camel_case() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let comment = StoredComment {
            id: 10,
            external_id: 42,
            group_id: 7,
            name: "A".into(),
            email: "a@x.com".into(),
            body: "hi".into(),
            created_at: ts,
            updated_at: ts,
        };

        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["externalId"], 42);
        assert_eq!(json["groupId"], 7);
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20.123Z");
        assert!(json.get("external_id").is_none());
    }

    #[test]
    fn stage_names() {
        assert_eq!(SyncStage::Fetching.to_string(), "fetching");
        assert_eq!(SyncStage::Persisting.as_str(), "persisting");
        assert_eq!(SyncStage::Failed.to_string(), "failed");
    }
}
