use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserSummary;

/// A row in the `posts` table. The like count is not part of the row: it
/// is derived from `likes_posts` at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub description: String,
    #[serde(default)]
    pub img_path: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub description: String,
    #[serde(default)]
    pub img_path: Option<String>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
}

/// Post joined with its author's summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithUser {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Optional list filters. `likes_min`/`likes_max` bound the derived like
/// count; the rest push down to the store.
#[derive(Debug, Clone, Default)]
pub struct PostFilters {
    pub description: Option<String>,
    pub likes_min: Option<u64>,
    pub likes_max: Option<u64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}
