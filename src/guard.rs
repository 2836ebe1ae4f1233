//! Navigation guard over the session context.
//!
//! On every attempt the session is initialized first (single in-flight
//! init), then the rules apply in order: authentication required, admin
//! required, guest-only, proceed.

use std::sync::Arc;

use crate::session::{user_is_admin, SessionContext};

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/";

/// What a route demands of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
    GuestOnly,
}

/// Route table, most specific prefix first. Unknown paths are public.
const ROUTES: &[(&str, Access)] = &[
    ("/login", Access::GuestOnly),
    ("/register", Access::GuestOnly),
    ("/admin", Access::Admin),
    ("/profile", Access::Authenticated),
    ("/explore", Access::Public),
    ("/trending", Access::Public),
    ("/user", Access::Public),
    ("/", Access::Public),
];

pub fn access_for(path: &str) -> Access {
    for (prefix, access) in ROUTES {
        let matched = if *prefix == "/" {
            path == "/"
        } else {
            path == *prefix
                || path
                    .strip_prefix(*prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        };
        if matched {
            return *access;
        }
    }
    Access::Public
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Redirect(&'static str),
}

pub struct RouteGuard {
    session: Arc<SessionContext>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self { session }
    }

    pub async fn resolve(&self, path: &str) -> Decision {
        self.session.ensure_initialized().await;
        let snapshot = self.session.snapshot().await;
        let is_admin = snapshot.user.as_ref().map(user_is_admin).unwrap_or(false);

        match access_for(path) {
            Access::Authenticated | Access::Admin if !snapshot.authenticated => {
                Decision::Redirect(LOGIN_ROUTE)
            }
            Access::Admin if !is_admin => Decision::Redirect(HOME_ROUTE),
            Access::GuestOnly if snapshot.authenticated => Decision::Redirect(HOME_ROUTE),
            _ => Decision::Proceed,
        }
    }
}
