//! Seam between the services and the hosted platform.
//!
//! `RemoteStore` covers row queries and mutations against named tables;
//! `AuthBackend` covers the platform's identity subsystem. `HttpBackend`
//! speaks the real wire protocol, `MemoryBackend` is an in-process double
//! for tests and offline use.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;

/// One row-level comparison. Filters on a query combine with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact match.
    Eq(String, Value),
    /// Case-insensitive substring match.
    Ilike(String, String),
    /// Greater-or-equal (numbers, timestamps).
    Gte(String, Value),
    /// Less-or-equal (numbers, timestamps).
    Lte(String, Value),
    /// Membership in a value set.
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A nested related row requested alongside each result row, resolved
/// through a declared foreign-key relationship: for every parent row,
/// the row of `table` whose `foreign_key` equals the parent's
/// `local_key` is attached under `alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub alias: String,
    pub table: String,
    pub local_key: String,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

impl Embed {
    pub fn new(
        alias: &str,
        table: &str,
        local_key: &str,
        foreign_key: &str,
        columns: &[&str],
    ) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            local_key: local_key.to_string(),
            foreign_key: foreign_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Builder for a filtered select/mutation against one table.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub embeds: Vec<Embed>,
    pub order: Option<Order>,
    /// Column projection; `None` selects every column.
    pub columns: Option<Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, fragment: &str) -> Self {
        self.filters
            .push(Filter::Ilike(column.to_string(), fragment.to_string()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(column.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: Vec<V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

/// Row queries and mutations against the platform's named tables.
///
/// Every call is one independent round trip: no retries, no timeouts
/// beyond the transport's own, no cancellation once issued.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows matching the query.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Exactly one row; `StoreError::NoRows` when nothing matches.
    async fn select_one(&self, table: &str, query: &Query) -> Result<Value, StoreError>;

    /// Number of rows matching the query, without fetching them.
    async fn count(&self, table: &str, query: &Query) -> Result<u64, StoreError>;

    /// Insert a row and return the stored representation.
    async fn insert(&self, table: &str, row: &Value) -> Result<Value, StoreError>;

    /// Patch all matching rows and return the first updated representation.
    async fn update(&self, table: &str, query: &Query, patch: &Value)
        -> Result<Value, StoreError>;

    /// Delete all matching rows.
    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError>;

    /// Zero-or-one row lookup; the no-rows condition is a successful `None`.
    async fn select_maybe(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Option<Value>, StoreError> {
        match self.select_one(table, query).await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Identity record held by the auth subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated session as reported by the auth subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Operations consumed from the platform's auth subsystem.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StoreError>;

    async fn sign_out(&self) -> Result<(), StoreError>;

    /// The current session, if any identity is signed in.
    async fn current_session(&self) -> Result<Option<AuthSession>, StoreError>;

    /// Privileged identity deletion. Fails without admin rights upstream.
    async fn admin_delete_user(&self, id: Uuid) -> Result<(), StoreError>;
}
