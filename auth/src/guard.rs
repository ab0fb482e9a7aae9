//! Route guard: decides whether a navigation may proceed.
//!
//! The guard asks the facade directly instead of reading the session cache,
//! so it is correct before the cache has been populated. A failed check
//! counts as signed out.

use tracing::debug;

use crate::notify::Notifier;
use crate::service::AuthService;

pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/";
pub const MSG_SIGN_IN_REQUIRED: &str = "Please sign in to access this page";

/// Access requirements attached to a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteAccess {
    pub requires_auth: bool,
    pub requires_guest: bool,
}

impl RouteAccess {
    pub const PUBLIC: Self = Self { requires_auth: false, requires_guest: false };
    pub const AUTH: Self = Self { requires_auth: true, requires_guest: false };
    pub const GUEST: Self = Self { requires_auth: false, requires_guest: true };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate to `to` instead. `replace` swaps the current history entry.
    Redirect { to: String, replace: bool },
}

/// Login path that returns to `full_path` after signing in.
#[must_use]
pub fn login_redirect(full_path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(full_path))
}

/// Pure guard policy.
#[must_use]
pub fn decide(access: RouteAccess, full_path: &str, authenticated: bool) -> GuardDecision {
    if access.requires_auth && !authenticated {
        return GuardDecision::Redirect { to: login_redirect(full_path), replace: false };
    }
    if access.requires_guest && authenticated {
        return GuardDecision::Redirect { to: HOME_PATH.to_owned(), replace: true };
    }
    GuardDecision::Allow
}

#[derive(Clone)]
pub struct RouteGuard {
    service: AuthService,
    notifier: Notifier,
}

impl RouteGuard {
    #[must_use]
    pub fn new(service: AuthService, notifier: Notifier) -> Self {
        Self { service, notifier }
    }

    pub async fn check(&self, access: RouteAccess, full_path: &str) -> GuardDecision {
        let authenticated = self.service.is_authenticated().await;
        let decision = decide(access, full_path, authenticated);
        if access.requires_auth && !authenticated {
            self.notifier.warning(MSG_SIGN_IN_REQUIRED);
        }
        debug!(path = full_path, authenticated, ?decision, "route guard");
        decision
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
