use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserSummary;

/// A row in the `comments` table. The text column is named `comment`
/// remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub post_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub user_id: Uuid,
}

/// Comment joined with its author's summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Comment fields embedded into joined like fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSummary {
    pub id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub post_id: i64,
}
