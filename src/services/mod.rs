//! Entity services: typed CRUD over the remote store. Every method is a
//! terminal boundary: failures come back inside the envelope, never as
//! `Err`, so callers check `error`/`success` instead of matching.

pub mod auth;
pub mod comments;
pub mod likes_comments;
pub mod likes_posts;
pub mod posts;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Uniform response envelope for fetch/create/update calls. `loading`
/// mirrors the UI convention for this shape and is always `false` here.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            loading: false,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            loading: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<Result<T, StoreError>> for ServiceResponse<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Envelope for delete calls.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

impl From<Result<(), StoreError>> for DeleteResponse {
    fn from(result: Result<(), StoreError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

pub(crate) fn row_into<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn rows_into<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(row_into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_from_result() {
        let ok: ServiceResponse<i32> = Ok(5).into();
        assert_eq!(ok.data, Some(5));
        assert!(ok.is_ok());
        assert!(!ok.loading);

        let err: ServiceResponse<i32> = Err(StoreError::NoRows).into();
        assert_eq!(err.data, None);
        assert_eq!(err.error.as_deref(), Some("No rows found"));
    }

    #[test]
    fn delete_envelope_from_result() {
        let ok: DeleteResponse = Ok(()).into();
        assert!(ok.success);

        let err: DeleteResponse = Err(StoreError::api(None, "nope")).into();
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("nope"));
    }
}
