use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CommentSummary, UserSummary};

/// A row in the `likes_comments` join table: user X liked comment Y.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeComment {
    pub id: i64,
    pub comment_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLikeComment {
    pub comment_id: i64,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeCommentWithUser {
    #[serde(flatten)]
    pub like: LikeComment,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeCommentWithComment {
    #[serde(flatten)]
    pub like: LikeComment,
    #[serde(default)]
    pub comment: Option<CommentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeCommentWithDetails {
    #[serde(flatten)]
    pub like: LikeComment,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub comment: Option<CommentSummary>,
}

/// Optional list filters; present fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct LikeCommentFilters {
    pub user_id: Option<Uuid>,
    pub comment_id: Option<i64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}
