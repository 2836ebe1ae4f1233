//! In-process implementation of both backend traits: tables of JSON rows
//! plus a tiny identity registry. Drives the test suite and works as an
//! offline double for consumers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{AuthBackend, AuthSession, AuthUser, Filter, Query, RemoteStore};

#[derive(Debug, Clone)]
struct Identity {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    next_id: AtomicI64,
    identities: RwLock<HashMap<String, Identity>>,
    session: RwLock<Option<AuthSession>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(col, expected) => row.get(col) == Some(expected),
        Filter::Ilike(col, fragment) => row
            .get(col)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&fragment.to_lowercase()))
            .unwrap_or(false),
        Filter::Gte(col, bound) => row
            .get(col)
            .and_then(|v| compare(v, bound))
            .map(|o| o != Ordering::Less)
            .unwrap_or(false),
        Filter::Lte(col, bound) => row
            .get(col)
            .and_then(|v| compare(v, bound))
            .map(|o| o != Ordering::Greater)
            .unwrap_or(false),
        Filter::In(col, values) => row
            .get(col)
            .map(|v| values.contains(v))
            .unwrap_or(false),
    }
}

fn project(row: &Value, columns: &[String]) -> Value {
    let mut out = Map::new();
    for col in columns {
        if let Some(v) = row.get(col) {
            out.insert(col.clone(), v.clone());
        }
    }
    Value::Object(out)
}

impl MemoryBackend {
    /// Query evaluation shared by select/count: filter, order, embed, project.
    fn run_query(
        &self,
        tables: &HashMap<String, Vec<Value>>,
        table: &str,
        query: &Query,
    ) -> Vec<Value> {
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        rows.into_iter()
            .map(|row| {
                let mut shaped = match &query.columns {
                    Some(columns) => project(&row, columns),
                    None => row.clone(),
                };
                for embed in &query.embeds {
                    let related = tables
                        .get(&embed.table)
                        .and_then(|candidates| {
                            candidates
                                .iter()
                                .find(|c| c.get(&embed.foreign_key) == row.get(&embed.local_key))
                        })
                        .map(|c| project(c, &embed.columns))
                        .unwrap_or(Value::Null);
                    if let Value::Object(obj) = &mut shaped {
                        obj.insert(embed.alias.clone(), related);
                    }
                }
                shaped
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        Ok(self.run_query(&tables, table, query))
    }

    async fn select_one(&self, table: &str, query: &Query) -> Result<Value, StoreError> {
        let tables = self.tables.read().await;
        self.run_query(&tables, table, query)
            .into_iter()
            .next()
            .ok_or(StoreError::NoRows)
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(self.run_query(&tables, table, query).len() as u64)
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<Value, StoreError> {
        let mut stored = row.clone();
        let obj = stored
            .as_object_mut()
            .ok_or_else(|| StoreError::api(None, "Insert payload must be an object"))?;
        if !obj.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            obj.insert("id".to_string(), Value::from(id));
        }
        if !obj.contains_key("created_at") {
            obj.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));
        }
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        let patch = patch
            .as_object()
            .ok_or_else(|| StoreError::api(None, "Update payload must be an object"))?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = None;
        for row in rows.iter_mut() {
            if query.filters.iter().all(|f| matches(row, f)) {
                if let Value::Object(obj) = row {
                    for (k, v) in patch {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                if updated.is_none() {
                    updated = Some(row.clone());
                }
            }
        }
        updated.ok_or(StoreError::NoRows)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !query.filters.iter().all(|f| matches(row, f)));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let mut identities = self.identities.write().await;
        if identities.contains_key(email) {
            return Err(StoreError::api(
                Some("user_already_exists".to_string()),
                "User already registered",
            ));
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
        };
        identities.insert(email.to_string(), identity.clone());
        Ok(AuthUser {
            id: identity.id,
            email: identity.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StoreError> {
        let identities = self.identities.read().await;
        let identity = identities
            .get(email)
            .filter(|identity| identity.password == password)
            .ok_or_else(|| {
                StoreError::api(
                    Some("invalid_credentials".to_string()),
                    "Invalid login credentials",
                )
            })?;
        let session = AuthSession {
            access_token: Uuid::new_v4().to_string(),
            user: AuthUser {
                id: identity.id,
                email: identity.email.clone(),
            },
        };
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        *self.session.write().await = None;
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, StoreError> {
        Ok(self.session.read().await.clone())
    }

    async fn admin_delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut identities = self.identities.write().await;
        let email = identities
            .values()
            .find(|identity| identity.id == id)
            .map(|identity| identity.email.clone())
            .ok_or_else(|| {
                StoreError::api(Some("user_not_found".to_string()), "User not found")
            })?;
        identities.remove(&email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Embed;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_created_at() {
        let store = MemoryBackend::new();
        let row = store
            .insert("posts", &json!({ "description": "hi", "user_id": "u1" }))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(1));
        assert!(row["created_at"].is_string());

        let next = store
            .insert("posts", &json!({ "description": "again", "user_id": "u1" }))
            .await
            .unwrap();
        assert_eq!(next["id"], json!(2));
    }

    #[tokio::test]
    async fn filters_narrow_results() {
        let store = MemoryBackend::new();
        for (desc, age) in [("morning run", 20), ("evening walk", 35), ("Morning swim", 50)] {
            store
                .insert("posts", &json!({ "description": desc, "age": age }))
                .await
                .unwrap();
        }

        let rows = store
            .select("posts", &Query::new().ilike("description", "morning"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = store
            .select("posts", &Query::new().gte("age", 30).lte("age", 40))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["description"], json!("evening walk"));
    }

    #[tokio::test]
    async fn select_one_reports_no_rows() {
        let store = MemoryBackend::new();
        let err = store
            .select_one("posts", &Query::new().eq("id", 99))
            .await
            .unwrap_err();
        assert!(err.is_no_rows());
    }

    #[tokio::test]
    async fn embeds_attach_related_rows() {
        let store = MemoryBackend::new();
        store
            .insert("users", &json!({ "user_id": "u1", "nick_name": "ana" }))
            .await
            .unwrap();
        store
            .insert("posts", &json!({ "description": "hi", "user_id": "u1" }))
            .await
            .unwrap();

        let rows = store
            .select(
                "posts",
                &Query::new().embed(Embed::new(
                    "user",
                    "users",
                    "user_id",
                    "user_id",
                    &["nick_name"],
                )),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["user"]["nick_name"], json!("ana"));
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let store = MemoryBackend::new();
        store
            .insert("posts", &json!({ "description": "old" }))
            .await
            .unwrap();
        let updated = store
            .update(
                "posts",
                &Query::new().eq("id", 1),
                &json!({ "description": "new" }),
            )
            .await
            .unwrap();
        assert_eq!(updated["description"], json!("new"));

        let err = store
            .update("posts", &Query::new().eq("id", 99), &json!({ "x": 1 }))
            .await
            .unwrap_err();
        assert!(err.is_no_rows());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let store = MemoryBackend::new();
        store.sign_up("a@b.co", "secret1").await.unwrap();
        let err = store.sign_up("a@b.co", "other").await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn sign_in_requires_matching_password() {
        let store = MemoryBackend::new();
        store.sign_up("a@b.co", "secret1").await.unwrap();
        assert!(store.sign_in("a@b.co", "wrong").await.is_err());

        let session = store.sign_in("a@b.co", "secret1").await.unwrap();
        assert_eq!(session.user.email, "a@b.co");
        assert!(store.current_session().await.unwrap().is_some());

        store.sign_out().await.unwrap();
        assert!(store.current_session().await.unwrap().is_none());
    }
}
