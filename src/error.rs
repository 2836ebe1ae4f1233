use thiserror::Error;

/// Code the platform returns when a single-row lookup matches nothing.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No rows found")]
    NoRows,

    #[error("{message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl StoreError {
    /// Build an error from the platform's error descriptor. The no-rows
    /// code maps to its own variant so callers can treat it specially.
    pub fn api(code: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        if code.as_deref() == Some(NO_ROWS_CODE) {
            return StoreError::NoRows;
        }
        StoreError::Api { code, message }
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, StoreError::NoRows)
    }
}

/// Translate the auth subsystem's known error messages into user-facing
/// copy; anything unrecognized passes through verbatim.
pub fn friendly_auth_message(raw: &str) -> String {
    match raw {
        "Invalid login credentials" => "Email or password is incorrect".to_string(),
        "User already registered" => "That account already exists".to_string(),
        "Email not confirmed" => "Confirm your email before signing in".to_string(),
        "Too many requests" => "Too many attempts, try again later".to_string(),
        "Password should be at least 6 characters" => {
            "Password must be at least 6 characters".to_string()
        }
        other => other.to_string(),
    }
}
