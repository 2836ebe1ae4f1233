//! Authentication flows against the platform's identity subsystem, plus
//! the shadow profile row kept in the `users` table. The identity record
//! and the profile row are written in two steps with no transaction:
//! signup tolerates a failed profile write, admin deletion tolerates a
//! failed identity delete. Both outcomes are logged.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::friendly_auth_message;
use crate::models::{NewUser, User};
use crate::services::row_into;
use crate::services::users::UserService;
use crate::store::{AuthBackend, AuthSession, AuthUser, Query, RemoteStore};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub nick_name: String,
    pub complete_name: String,
    pub password: String,
    pub confirm_password: Option<String>,
}

/// Envelope for auth calls: the raw session result alongside the shadow
/// profile row, when one could be fetched.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub success: bool,
    pub user: Option<User>,
    pub session: Option<AuthSession>,
    pub error: Option<String>,
}

impl AuthResponse {
    fn succeeded(user: Option<User>, session: Option<AuthSession>) -> Self {
        Self {
            success: true,
            user,
            session,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            session: None,
            error: Some(error.into()),
        }
    }
}

/// Field name -> message, empty when the input is acceptable.
pub type ValidationErrors = HashMap<&'static str, String>;

#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    store: Arc<dyn RemoteStore>,
    users: UserService,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthBackend>, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            auth,
            users: UserService::new(Arc::clone(&store)),
            store,
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResponse {
        match self
            .auth
            .sign_in(&credentials.email, &credentials.password)
            .await
        {
            Ok(session) => {
                let user = self.fetch_profile(&session.user.email).await;
                AuthResponse::succeeded(user, Some(session))
            }
            Err(e) => AuthResponse::failed(friendly_auth_message(&e.to_string())),
        }
    }

    /// Register an identity, then write the shadow profile row. A failed
    /// profile write is logged and the call still reports success: the
    /// identity already exists upstream.
    pub async fn sign_up(&self, registration: &Registration) -> AuthResponse {
        match self
            .auth
            .sign_up(&registration.email, &registration.password)
            .await
        {
            Ok(identity) => {
                self.create_profile(&identity, registration).await;
                AuthResponse::succeeded(None, None)
            }
            Err(e) => AuthResponse::failed(friendly_auth_message(&e.to_string())),
        }
    }

    pub async fn sign_out(&self) -> AuthResponse {
        match self.auth.sign_out().await {
            Ok(()) => AuthResponse::succeeded(None, None),
            Err(e) => AuthResponse::failed(e.to_string()),
        }
    }

    /// The current session and its profile row; a missing session is a
    /// successful empty result.
    pub async fn current_session(&self) -> AuthResponse {
        match self.auth.current_session().await {
            Ok(Some(session)) => {
                let user = self.fetch_profile(&session.user.email).await;
                AuthResponse::succeeded(user, Some(session))
            }
            Ok(None) => AuthResponse::succeeded(None, None),
            Err(e) => AuthResponse::failed(e.to_string()),
        }
    }

    /// Admin-initiated registration: uniqueness is pre-checked so a
    /// duplicate nickname fails before the identity is created.
    pub async fn create_user_from_admin(&self, registration: &Registration) -> AuthResponse {
        let check = self.users.check_nickname_exists(&registration.nick_name).await;
        if let Some(error) = check.error {
            return AuthResponse::failed(error);
        }
        if check.exists {
            return AuthResponse::failed("That username is already taken");
        }
        self.sign_up(registration).await
    }

    /// Admin-initiated deletion: the profile row goes first; a failed
    /// identity delete is tolerated, so the identity record may outlive
    /// the profile.
    pub async fn delete_user_from_admin(&self, user_id: Uuid) -> AuthResponse {
        let removed = self.users.delete_by_user_id(user_id).await;
        if let Some(error) = removed.error {
            return AuthResponse::failed(error);
        }

        if let Err(e) = self.auth.admin_delete_user(user_id).await {
            tracing::warn!(%user_id, error = %e, "identity deletion failed after profile removal");
        }
        AuthResponse::succeeded(None, None)
    }

    async fn fetch_profile(&self, email: &str) -> Option<User> {
        let lookup = self
            .store
            .select_one("users", &Query::new().eq("email", email))
            .await
            .and_then(row_into);
        match lookup {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(email, error = %e, "profile row lookup failed");
                None
            }
        }
    }

    async fn create_profile(&self, identity: &AuthUser, registration: &Registration) {
        let profile = NewUser {
            user_id: identity.id,
            complete_name: registration.complete_name.clone(),
            nick_name: registration.nick_name.clone(),
            email: registration.email.clone(),
            age: 0,
            gender: None,
            profile_image: None,
        };
        let created = self.users.create(&profile).await;
        if let Some(error) = created.error {
            tracing::warn!(email = %registration.email, error, "profile row write failed after signup");
        }
    }

    pub fn validate_credentials(credentials: &Credentials) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if credentials.email.trim().is_empty() {
            errors.insert("email", "Email is required".to_string());
        } else if !is_valid_email(&credentials.email) {
            errors.insert("email", "Enter a valid email address".to_string());
        }
        if credentials.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        }
        errors
    }

    pub fn validate_registration(registration: &Registration) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if registration.email.trim().is_empty() {
            errors.insert("email", "Email is required".to_string());
        } else if !is_valid_email(&registration.email) {
            errors.insert("email", "Enter a valid email address".to_string());
        }

        if registration.nick_name.trim().is_empty() {
            errors.insert("nick_name", "Username is required".to_string());
        } else if !is_valid_nickname(&registration.nick_name) {
            errors.insert(
                "nick_name",
                "Username must be 3-20 characters: letters, numbers and underscores".to_string(),
            );
        }

        if registration.complete_name.trim().is_empty() {
            errors.insert("complete_name", "Full name is required".to_string());
        } else if !is_valid_name(registration.complete_name.trim()) {
            errors.insert(
                "complete_name",
                "Name must be 2-50 characters: letters and spaces".to_string(),
            );
        }

        if registration.password.is_empty() {
            errors.insert("password", "Password is required".to_string());
        } else if registration.password.chars().count() < 6 {
            errors.insert(
                "password",
                "Password must be at least 6 characters".to_string(),
            );
        }

        match &registration.confirm_password {
            None => {
                errors.insert("confirm_password", "Confirm your password".to_string());
            }
            Some(confirm) if confirm != &registration.password => {
                errors.insert("confirm_password", "Passwords do not match".to_string());
            }
            Some(_) => {}
        }

        errors
    }
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn is_valid_nickname(nick: &str) -> bool {
    let len = nick.chars().count();
    (3..=20).contains(&len) && nick.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=50).contains(&len) && name.chars().all(|c| c.is_alphabetic() || c == ' ')
}
