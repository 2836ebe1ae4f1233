use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewUser, User, UserFilters, UserPatch};
use crate::services::{row_into, rows_into, DeleteResponse, ServiceResponse};
use crate::store::{Query, RemoteStore};

/// Result of a uniqueness probe. The no-rows lookup outcome is a
/// successful `exists: false`, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RemoteStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    fn filtered(filters: Option<&UserFilters>) -> Query {
        let mut query = Query::new().order_desc("created_at");
        if let Some(f) = filters {
            if let Some(name) = &f.name {
                query = query.ilike("complete_name", name);
            }
            if let Some(email) = &f.email {
                query = query.ilike("email", email);
            }
            if let Some(nick) = &f.nick_name {
                query = query.ilike("nick_name", nick);
            }
            if let Some(gender) = &f.gender {
                query = query.eq("gender", gender.as_str());
            }
            if let Some(min) = f.age_min {
                query = query.gte("age", min);
            }
            if let Some(max) = f.age_max {
                query = query.lte("age", max);
            }
        }
        query
    }

    pub async fn get_all(&self, filters: Option<&UserFilters>) -> ServiceResponse<Vec<User>> {
        self.store
            .select("users", &Self::filtered(filters))
            .await
            .and_then(rows_into)
            .into()
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResponse<User> {
        self.store
            .select_one("users", &Query::new().eq("id", id))
            .await
            .and_then(row_into)
            .into()
    }

    /// Lookup by the auth identity UUID rather than the row id.
    pub async fn get_by_user_id(&self, user_id: Uuid) -> ServiceResponse<User> {
        self.store
            .select_one("users", &Query::new().eq("user_id", user_id.to_string()))
            .await
            .and_then(row_into)
            .into()
    }

    pub async fn create(&self, user: &NewUser) -> ServiceResponse<User> {
        let result: Result<User, StoreError> = async {
            let row = self
                .store
                .insert("users", &serde_json::to_value(user)?)
                .await?;
            row_into(row)
        }
        .await;
        result.into()
    }

    pub async fn update(&self, id: i64, patch: &UserPatch) -> ServiceResponse<User> {
        let result: Result<User, StoreError> = async {
            let row = self
                .store
                .update(
                    "users",
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
            .delete("users", &Query::new().eq("id", id))
            .await
            .into()
    }

    /// Delete the shadow profile by auth identity UUID (admin path).
    pub async fn delete_by_user_id(&self, user_id: Uuid) -> DeleteResponse {
        self.store
            .delete("users", &Query::new().eq("user_id", user_id.to_string()))
            .await
            .into()
    }

    pub async fn check_email_exists(&self, email: &str) -> ExistsResponse {
        self.check_exists(Query::new().columns(&["id"]).eq("email", email))
            .await
    }

    pub async fn check_nickname_exists(&self, nick_name: &str) -> ExistsResponse {
        self.check_exists(Query::new().columns(&["id"]).eq("nick_name", nick_name))
            .await
    }

    async fn check_exists(&self, query: Query) -> ExistsResponse {
        match self.store.select_maybe("users", &query).await {
            Ok(found) => ExistsResponse {
                exists: found.is_some(),
                error: None,
            },
            Err(e) => ExistsResponse {
                exists: false,
                error: Some(e.to_string()),
            },
        }
    }
}
