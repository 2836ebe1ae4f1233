use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in the `users` table: the shadow profile kept alongside the auth
/// subsystem's identity record, linked through `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: Uuid,
    pub complete_name: String,
    pub nick_name: String,
    pub email: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert shape; generated columns are left to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub user_id: Uuid,
    pub complete_name: String,
    pub nick_name: String,
    pub email: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Author fields embedded into joined fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub complete_name: String,
    pub nick_name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Optional list filters; present fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub name: Option<String>,
    pub email: Option<String>,
    pub nick_name: Option<String>,
    pub gender: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}
