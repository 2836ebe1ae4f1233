//! Post likes: existence checks, per-post and batched counts, and the
//! like/unlike toggle.
//!
//! The toggle is a check-then-act sequence over two independent round
//! trips; concurrent toggles for the same (user, post) can race into a
//! double insert or double delete. Known gap, see DESIGN.md.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{LikePost, NewLikePost};
use crate::services::{row_into, DeleteResponse, ServiceResponse};
use crate::store::{Query, RemoteStore};

#[derive(Debug, Clone, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub liked: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: u64,
    pub error: Option<String>,
}

/// Batched per-post counts. Posts with zero likes are absent from the
/// map; callers default to zero.
#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    pub counts: HashMap<i64, u64>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct LikePostService {
    store: Arc<dyn RemoteStore>,
}

impl LikePostService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    fn pair_query(user_id: Uuid, post_id: i64) -> Query {
        Query::new()
            .eq("user_id", user_id.to_string())
            .eq("post_id", post_id)
    }

    pub async fn check_user_liked(&self, user_id: Uuid, post_id: i64) -> LikedResponse {
        let query = Self::pair_query(user_id, post_id).columns(&["id"]);
        match self.store.select_maybe("likes_posts", &query).await {
            Ok(found) => LikedResponse {
                liked: found.is_some(),
                error: None,
            },
            Err(e) => LikedResponse {
                liked: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn count_by_post(&self, post_id: i64) -> CountResponse {
        match self
            .store
            .count("likes_posts", &Query::new().eq("post_id", post_id))
            .await
        {
            Ok(count) => CountResponse { count, error: None },
            Err(e) => CountResponse {
                count: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Counts for a whole set of posts in a single round trip: fetch every
    /// like row referencing the set and fold per post id.
    pub async fn count_by_posts(&self, post_ids: &[i64]) -> CountsResponse {
        if post_ids.is_empty() {
            return CountsResponse {
                counts: HashMap::new(),
                error: None,
            };
        }
        let query = Query::new()
            .columns(&["post_id"])
            .is_in("post_id", post_ids.to_vec());
        match self.store.select("likes_posts", &query).await {
            Ok(rows) => CountsResponse {
                counts: fold_counts(&rows, "post_id"),
                error: None,
            },
            Err(e) => CountsResponse {
                counts: HashMap::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Explicit like. Rejects a duplicate instead of inserting a second
    /// row for the same (user, post) pair.
    pub async fn like(&self, user_id: Uuid, post_id: i64) -> ServiceResponse<LikePost> {
        let check = self.check_user_liked(user_id, post_id).await;
        if let Some(error) = check.error {
            return ServiceResponse::err(error);
        }
        if check.liked {
            return ServiceResponse::err("User already liked this post");
        }
        self.insert_like(user_id, post_id).await.into()
    }

    pub async fn unlike(&self, user_id: Uuid, post_id: i64) -> DeleteResponse {
        self.store
            .delete("likes_posts", &Self::pair_query(user_id, post_id))
            .await
            .into()
    }

    /// Flip the liked state: delete the row when present, insert it when
    /// absent. Reports the state after the call.
    pub async fn toggle(&self, user_id: Uuid, post_id: i64) -> ToggleResponse {
        let check = self.check_user_liked(user_id, post_id).await;
        if let Some(error) = check.error {
            return ToggleResponse {
                liked: false,
                error: Some(error),
            };
        }

        if check.liked {
            let removed = self.unlike(user_id, post_id).await;
            ToggleResponse {
                liked: false,
                error: removed.error,
            }
        } else {
            match self.insert_like(user_id, post_id).await {
                Ok(_) => ToggleResponse {
                    liked: true,
                    error: None,
                },
                Err(e) => ToggleResponse {
                    liked: false,
                    error: Some(e.to_string()),
                },
            }
        }
    }

    async fn insert_like(&self, user_id: Uuid, post_id: i64) -> Result<LikePost, StoreError> {
        let row = self
            .store
            .insert(
                "likes_posts",
                &serde_json::to_value(NewLikePost { post_id, user_id })?,
            )
            .await?;
        row_into(row)
    }
}

pub(crate) fn fold_counts(rows: &[Value], key: &str) -> HashMap<i64, u64> {
    let mut counts = HashMap::new();
    for row in rows {
        if let Some(id) = row.get(key).and_then(Value::as_i64) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}
