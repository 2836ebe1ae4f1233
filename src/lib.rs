// Library exports for Plaza
// This allows integration tests and external code to use Plaza modules

pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod services;
pub mod session;
pub mod store;

use std::sync::Arc;

use crate::config::Config;
use crate::error::StoreError;
use crate::guard::RouteGuard;
use crate::services::auth::AuthService;
use crate::services::comments::CommentService;
use crate::services::likes_comments::LikeCommentService;
use crate::services::likes_posts::LikePostService;
use crate::services::posts::PostService;
use crate::services::users::UserService;
use crate::session::SessionContext;
use crate::store::http::HttpBackend;
use crate::store::{AuthBackend, RemoteStore};

/// The whole client wired together: one backend shared by every service,
/// one session context feeding the route guard.
pub struct Plaza {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub likes_posts: LikePostService,
    pub likes_comments: LikeCommentService,
    pub auth: AuthService,
    pub session: Arc<SessionContext>,
    pub guard: RouteGuard,
}

impl Plaza {
    /// Connect to the configured remote platform.
    pub fn connect(config: &Config) -> Result<Self, StoreError> {
        let backend = Arc::new(HttpBackend::new(config)?);
        Ok(Self::with_backends(backend.clone(), backend))
    }

    /// Wire explicit backends (e.g. `MemoryBackend` for tests or offline
    /// use).
    pub fn with_backends(store: Arc<dyn RemoteStore>, auth: Arc<dyn AuthBackend>) -> Self {
        let auth_service = AuthService::new(auth, Arc::clone(&store));
        let session = Arc::new(SessionContext::new(auth_service.clone()));
        Self {
            users: UserService::new(Arc::clone(&store)),
            posts: PostService::new(Arc::clone(&store)),
            comments: CommentService::new(Arc::clone(&store)),
            likes_posts: LikePostService::new(Arc::clone(&store)),
            likes_comments: LikeCommentService::new(Arc::clone(&store)),
            auth: auth_service,
            guard: RouteGuard::new(Arc::clone(&session)),
            session,
        }
    }
}
