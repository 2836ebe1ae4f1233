use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{Comment, CommentWithUser, NewComment};
use crate::services::{row_into, rows_into, DeleteResponse, ServiceResponse};
use crate::store::{Embed, Query, RemoteStore};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn RemoteStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    fn author_embed() -> Embed {
        Embed::new(
            "user",
            "users",
            "user_id",
            "user_id",
            &["id", "complete_name", "nick_name", "profile_image"],
        )
    }

    /// Comments under a post, newest first, each with its author summary.
    pub async fn get_by_post(&self, post_id: i64) -> ServiceResponse<Vec<CommentWithUser>> {
        self.store
            .select(
                "comments",
                &Query::new()
                    .eq("post_id", post_id)
                    .order_desc("created_at")
                    .embed(Self::author_embed()),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResponse<Comment> {
        self.store
            .select_one("comments", &Query::new().eq("id", id))
            .await
            .and_then(row_into)
            .into()
    }

    pub async fn create(&self, comment: &NewComment) -> ServiceResponse<Comment> {
        let result: Result<Comment, StoreError> = async {
            let row = self
                .store
                .insert("comments", &serde_json::to_value(comment)?)
                .await?;
            row_into(row)
        }
        .await;
        result.into()
    }

    pub async fn delete(&self, id: i64) -> DeleteResponse {
        self.store
            .delete("comments", &Query::new().eq("id", id))
            .await
            .into()
    }
}
