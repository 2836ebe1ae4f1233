//! Comment likes: the same check/count/toggle contract as post likes,
//! plus the joined list variants. Shares the check-then-act race noted
//! in `likes_posts`.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    LikeComment, LikeCommentFilters, LikeCommentWithComment, LikeCommentWithDetails,
    LikeCommentWithUser, NewLikeComment,
};
use crate::services::likes_posts::{CountResponse, LikedResponse, ToggleResponse};
use crate::services::{row_into, rows_into, DeleteResponse, ServiceResponse};
use crate::store::{Embed, Query, RemoteStore};

#[derive(Clone)]
pub struct LikeCommentService {
    store: Arc<dyn RemoteStore>,
}

impl LikeCommentService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    fn user_embed() -> Embed {
        Embed::new(
            "user",
            "users",
            "user_id",
            "user_id",
            &["id", "complete_name", "nick_name", "profile_image"],
        )
    }

    fn comment_embed() -> Embed {
        Embed::new(
            "comment",
            "comments",
            "comment_id",
            "id",
            &["id", "comment", "post_id"],
        )
    }

    fn pair_query(user_id: Uuid, comment_id: i64) -> Query {
        Query::new()
            .eq("user_id", user_id.to_string())
            .eq("comment_id", comment_id)
    }

    fn filtered(filters: Option<&LikeCommentFilters>) -> Query {
        let mut query = Query::new().order_desc("created_at");
        if let Some(f) = filters {
            if let Some(user_id) = f.user_id {
                query = query.eq("user_id", user_id.to_string());
            }
            if let Some(comment_id) = f.comment_id {
                query = query.eq("comment_id", comment_id);
            }
            if let Some(after) = &f.created_after {
                query = query.gte("created_at", after.to_rfc3339());
            }
            if let Some(before) = &f.created_before {
                query = query.lte("created_at", before.to_rfc3339());
            }
        }
        query
    }

    pub async fn get_all(
        &self,
        filters: Option<&LikeCommentFilters>,
    ) -> ServiceResponse<Vec<LikeComment>> {
        self.store
            .select("likes_comments", &Self::filtered(filters))
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn get_with_user(
        &self,
        filters: Option<&LikeCommentFilters>,
    ) -> ServiceResponse<Vec<LikeCommentWithUser>> {
        self.store
            .select(
                "likes_comments",
                &Self::filtered(filters).embed(Self::user_embed()),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn get_with_details(
        &self,
        filters: Option<&LikeCommentFilters>,
    ) -> ServiceResponse<Vec<LikeCommentWithDetails>> {
        self.store
            .select(
                "likes_comments",
                &Self::filtered(filters)
                    .embed(Self::user_embed())
                    .embed(Self::comment_embed()),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    /// Likes a user has given, each with the liked comment attached.
    pub async fn get_by_user(
        &self,
        user_id: Uuid,
    ) -> ServiceResponse<Vec<LikeCommentWithComment>> {
        self.store
            .select(
                "likes_comments",
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .order_desc("created_at")
                    .embed(Self::comment_embed()),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    /// Likes received by a comment, each with the liking user attached.
    pub async fn get_by_comment(
        &self,
        comment_id: i64,
    ) -> ServiceResponse<Vec<LikeCommentWithUser>> {
        self.store
            .select(
                "likes_comments",
                &Query::new()
                    .eq("comment_id", comment_id)
                    .order_desc("created_at")
                    .embed(Self::user_embed()),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn check_user_liked(&self, user_id: Uuid, comment_id: i64) -> LikedResponse {
        let query = Self::pair_query(user_id, comment_id).columns(&["id"]);
        match self.store.select_maybe("likes_comments", &query).await {
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

    pub async fn count_by_comment(&self, comment_id: i64) -> CountResponse {
        match self
            .store
            .count("likes_comments", &Query::new().eq("comment_id", comment_id))
            .await
        {
            Ok(count) => CountResponse { count, error: None },
            Err(e) => CountResponse {
                count: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Explicit like; duplicates are rejected, matching the post-like
    /// policy.
    pub async fn like(&self, user_id: Uuid, comment_id: i64) -> ServiceResponse<LikeComment> {
        let check = self.check_user_liked(user_id, comment_id).await;
        if let Some(error) = check.error {
            return ServiceResponse::err(error);
        }
        if check.liked {
            return ServiceResponse::err("User already liked this comment");
        }
        self.insert_like(user_id, comment_id).await.into()
    }

    pub async fn unlike(&self, user_id: Uuid, comment_id: i64) -> DeleteResponse {
        self.store
            .delete("likes_comments", &Self::pair_query(user_id, comment_id))
            .await
            .into()
    }

    pub async fn toggle(&self, user_id: Uuid, comment_id: i64) -> ToggleResponse {
        let check = self.check_user_liked(user_id, comment_id).await;
        if let Some(error) = check.error {
            return ToggleResponse {
                liked: false,
                error: Some(error),
            };
        }

        if check.liked {
            let removed = self.unlike(user_id, comment_id).await;
            ToggleResponse {
                liked: false,
                error: removed.error,
            }
        } else {
            match self.insert_like(user_id, comment_id).await {
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

    /// Remove a like row directly by its id.
    pub async fn delete(&self, id: i64) -> DeleteResponse {
        self.store
            .delete("likes_comments", &Query::new().eq("id", id))
            .await
            .into()
    }

    async fn insert_like(
        &self,
        user_id: Uuid,
        comment_id: i64,
    ) -> Result<LikeComment, StoreError> {
        let row = self
            .store
            .insert(
                "likes_comments",
                &serde_json::to_value(NewLikeComment {
                    comment_id,
                    user_id,
                })?,
            )
            .await?;
        row_into(row)
    }
}
