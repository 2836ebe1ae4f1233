//! Process-wide session state, held by one explicitly owned instance and
//! injected wherever the current user matters (permission checks, route
//! guard). Initialized once on application start, cleared on logout.

use tokio::sync::{watch, Mutex, RwLock};

use crate::models::User;
use crate::services::auth::{AuthResponse, AuthService, Credentials};

/// Point-in-time copy of the session: the cached user row and the
/// authentication flag. Replaced wholesale, never partially mutated.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub authenticated: bool,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    authenticated: bool,
    initialized: bool,
}

pub struct SessionContext {
    auth: AuthService,
    state: RwLock<SessionState>,
    init_lock: Mutex<()>,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionContext {
    pub fn new(auth: AuthService) -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            auth,
            state: RwLock::new(SessionState::default()),
            init_lock: Mutex::new(()),
            tx,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Resolve the remote session into local state. Failures and missing
    /// sessions both land as signed-out.
    pub async fn initialize(&self) {
        let response = self.auth.current_session().await;
        let user = if response.success { response.user } else { None };
        self.apply(user).await;
    }

    /// Single-flight initialization: concurrent callers wait on the first
    /// attempt instead of issuing their own.
    pub async fn ensure_initialized(&self) {
        if self.state.read().await.initialized {
            return;
        }
        let _guard = self.init_lock.lock().await;
        if self.state.read().await.initialized {
            return;
        }
        self.initialize().await;
    }

    pub async fn login(&self, credentials: &Credentials) -> AuthResponse {
        let response = self.auth.sign_in(credentials).await;
        if response.success {
            self.apply(response.user.clone()).await;
        }
        response
    }

    /// Local state clears even when the remote sign-out fails.
    pub async fn logout(&self) -> AuthResponse {
        let response = self.auth.sign_out().await;
        self.apply(None).await;
        response
    }

    pub async fn set_user(&self, user: User) {
        self.apply(Some(user)).await;
    }

    pub async fn clear_user(&self) {
        self.apply(None).await;
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            user: state.user.clone(),
            authenticated: state.authenticated,
        }
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    pub async fn is_admin(&self) -> bool {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(user_is_admin)
            .unwrap_or(false)
    }

    /// Auth-state-change subscription: the receiver observes every
    /// snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    async fn apply(&self, user: Option<User>) {
        let mut state = self.state.write().await;
        state.authenticated = user.is_some();
        state.user = user;
        state.initialized = true;
        let snapshot = SessionSnapshot {
            user: state.user.clone(),
            authenticated: state.authenticated,
        };
        drop(state);
        let _ = self.tx.send(snapshot);
    }
}

/// Admin predicate over the cached user row: the explicit flag, with a
/// nickname fallback kept as a development convenience. Both are
/// client-side checks and spoofable; the store's own row policies are the
/// real boundary.
/// TODO: drop the nickname fallback once row-level policies carry the
/// admin distinction.
pub fn user_is_admin(user: &User) -> bool {
    if user.is_admin {
        return true;
    }
    user.nick_name == "admin"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::Registration;
    use crate::store::memory::MemoryBackend;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    fn user(nick: &str, is_admin: bool) -> User {
        User {
            id: 1,
            user_id: Uuid::new_v4(),
            complete_name: "Ana Torres".to_string(),
            nick_name: nick.to_string(),
            email: "ana@example.com".to_string(),
            age: 0,
            gender: None,
            profile_image: None,
            is_admin,
            created_at: Utc::now(),
        }
    }

    fn context() -> SessionContext {
        let backend = Arc::new(MemoryBackend::new());
        SessionContext::new(AuthService::new(backend.clone(), backend))
    }

    #[test]
    fn admin_flag_grants_admin_regardless_of_nickname() {
        assert!(user_is_admin(&user("ana", true)));
    }

    #[test]
    fn nickname_fallback_grants_admin_without_flag() {
        assert!(user_is_admin(&user("admin", false)));
    }

    #[test]
    fn plain_users_are_not_admin() {
        assert!(!user_is_admin(&user("ana", false)));
    }

    #[tokio::test]
    async fn login_and_logout_replace_the_snapshot() {
        let session = context();
        session
            .auth()
            .sign_up(&Registration {
                email: "ana@example.com".to_string(),
                nick_name: "ana".to_string(),
                complete_name: "Ana Torres".to_string(),
                password: "secret1".to_string(),
                confirm_password: Some("secret1".to_string()),
            })
            .await;

        let mut changes = session.subscribe();

        let login = session
            .login(&Credentials {
                email: "ana@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert!(login.success);
        assert!(session.is_authenticated().await);
        assert_eq!(session.current_user().await.unwrap().nick_name, "ana");

        changes.changed().await.unwrap();
        assert!(changes.borrow().authenticated);

        session.logout().await;
        assert!(!session.is_authenticated().await);
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn failed_login_leaves_state_untouched() {
        let session = context();
        let response = session
            .login(&Credentials {
                email: "ghost@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;
        assert!(!response.success);
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn ensure_initialized_runs_once() {
        let session = context();
        session.ensure_initialized().await;
        assert!(!session.is_authenticated().await);

        // A user set afterwards is not clobbered by later ensure calls.
        session.set_user(user("ana", false)).await;
        session.ensure_initialized().await;
        assert!(session.is_authenticated().await);
    }

    #[tokio::test]
    async fn is_admin_reads_the_cached_user() {
        let session = context();
        assert!(!session.is_admin().await);
        session.set_user(user("admin", false)).await;
        assert!(session.is_admin().await);
        session.clear_user().await;
        assert!(!session.is_admin().await);
    }
}
