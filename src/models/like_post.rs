use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in the `likes_posts` join table: user X liked post Y. At most
/// one row per (user_id, post_id) pair, enforced by the check in the
/// like service rather than a store constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikePost {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLikePost {
    pub post_id: i64,
    pub user_id: Uuid,
}
