use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPost, Post, PostFilters, PostPatch, PostWithUser};
use crate::services::likes_posts::LikePostService;
use crate::services::{row_into, rows_into, DeleteResponse, ServiceResponse};
use crate::store::{Embed, Query, RemoteStore};

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn RemoteStore>,
    likes: LikePostService,
}

impl PostService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            likes: LikePostService::new(Arc::clone(&store)),
            store,
        }
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

    /// Push-down filters. Like-count bounds are applied afterwards against
    /// counts derived from the join table.
    fn filtered(filters: Option<&PostFilters>) -> Query {
        let mut query = Query::new().order_desc("created_at");
        if let Some(f) = filters {
            if let Some(description) = &f.description {
                query = query.ilike("description", description);
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

    pub async fn get_all(&self, filters: Option<&PostFilters>) -> ServiceResponse<Vec<Post>> {
        let result: Result<Vec<Post>, StoreError> = async {
            let rows = self.store.select("posts", &Self::filtered(filters)).await?;
            let posts = rows_into(rows)?;
            self.apply_like_bounds(posts, filters, |post: &Post| post.id)
                .await
        }
        .await;
        result.into()
    }

    pub async fn get_with_user(
        &self,
        filters: Option<&PostFilters>,
    ) -> ServiceResponse<Vec<PostWithUser>> {
        let result: Result<Vec<PostWithUser>, StoreError> = async {
            let query = Self::filtered(filters).embed(Self::author_embed());
            let rows = self.store.select("posts", &query).await?;
            let posts = rows_into(rows)?;
            self.apply_like_bounds(posts, filters, |post: &PostWithUser| post.post.id)
                .await
        }
        .await;
        result.into()
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResponse<Post> {
        self.store
            .select_one("posts", &Query::new().eq("id", id))
            .await
            .and_then(row_into)
            .into()
    }

    pub async fn get_by_id_with_user(&self, id: i64) -> ServiceResponse<PostWithUser> {
        self.store
            .select_one(
                "posts",
                &Query::new().eq("id", id).embed(Self::author_embed()),
            )
            .await
            .and_then(row_into)
            .into()
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> ServiceResponse<Vec<Post>> {
        self.store
            .select(
                "posts",
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .order_desc("created_at"),
            )
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn create(&self, post: &NewPost) -> ServiceResponse<Post> {
        let result: Result<Post, StoreError> = async {
            let row = self
                .store
                .insert("posts", &serde_json::to_value(post)?)
                .await?;
            row_into(row)
        }
        .await;
        result.into()
    }

    pub async fn update(&self, id: i64, patch: &PostPatch) -> ServiceResponse<Post> {
        let result: Result<Post, StoreError> = async {
            let row = self
                .store
                .update(
                    "posts",
                    &Query::new().eq("id", id),
                    &serde_json::to_value(patch)?,
                )
                .await?;
            row_into(row)
        }
        .await;
        result.into()
    }

    pub async fn delete(&self, id: i64) -> DeleteResponse {
        self.store
            .delete("posts", &Query::new().eq("id", id))
            .await
            .into()
    }

    /// Keep only items whose derived like count falls inside the requested
    /// bounds (inclusive). One batched count query for the whole page.
    async fn apply_like_bounds<T>(
        &self,
        items: Vec<T>,
        filters: Option<&PostFilters>,
        id_of: fn(&T) -> i64,
    ) -> Result<Vec<T>, StoreError> {
        let (min, max) = match filters {
            Some(f) if f.likes_min.is_some() || f.likes_max.is_some() => (f.likes_min, f.likes_max),
            _ => return Ok(items),
        };

        let ids: Vec<i64> = items.iter().map(id_of).collect();
        let response = self.likes.count_by_posts(&ids).await;
        if let Some(error) = response.error {
            return Err(StoreError::api(None, error));
        }

        Ok(items
            .into_iter()
            .filter(|item| {
                let count = response.counts.get(&id_of(item)).copied().unwrap_or(0);
                min.map_or(true, |m| count >= m) && max.map_or(true, |m| count <= m)
            })
            .collect())
    }
}
