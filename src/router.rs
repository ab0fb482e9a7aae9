//! Route table and guarded navigation.
//!
//! DESIGN
//! ======
//! Every navigation runs the route guard first. A redirect restarts the
//! navigation at the new target, keeping a replace request from either the
//! caller or the guard, until a route is allowed. Redirect chains are
//! bounded so a misconfigured table cannot loop forever.
//!
//! The committed history is a plain stack: `push` appends, `replace` swaps
//! the top entry, `back` pops it.

use auth::{GuardDecision, RouteAccess, RouteGuard};
use tracing::{debug, info};

/// Redirect hops allowed before a navigation is abandoned.
pub const MAX_REDIRECTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub title: &'static str,
    pub access: RouteAccess,
}

pub static ROUTES: [Route; 6] = [
    Route { name: "login", path: "/auth/login", title: "Sign in", access: RouteAccess::GUEST },
    Route { name: "register", path: "/auth/register", title: "Register", access: RouteAccess::GUEST },
    Route { name: "forgot-password", path: "/auth/forgot-password", title: "Forgot password", access: RouteAccess::GUEST },
    Route { name: "update-password", path: "/auth/update-password", title: "Update password", access: RouteAccess::AUTH },
    Route { name: "home", path: "/", title: "Home", access: RouteAccess::AUTH },
    Route { name: "profile", path: "/profile", title: "Profile", access: RouteAccess::AUTH },
];

pub static NOT_FOUND: Route =
    Route { name: "not-found", path: "*", title: "Page not found", access: RouteAccess::PUBLIC };

/// Match a full path (query and fragment allowed) against the table.
#[must_use]
pub fn resolve(full_path: &str) -> &'static Route {
    let end = full_path.find(['?', '#']).unwrap_or(full_path.len());
    let path = &full_path[..end];
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    ROUTES.iter().find(|route| route.path == path).unwrap_or(&NOT_FOUND)
}

/// A committed history entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub full_path: String,
    pub route: &'static Route,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation to {path} redirected more than {MAX_REDIRECTS} times")]
    TooManyRedirects { path: String },
}

// =============================================================================
// ROUTER
// =============================================================================

pub struct Router {
    guard: RouteGuard,
    app_name: String,
    history: Vec<Location>,
}

impl Router {
    #[must_use]
    pub fn new(guard: RouteGuard, app_name: impl Into<String>) -> Self {
        Self { guard, app_name: app_name.into(), history: Vec::new() }
    }

    /// # Errors
    ///
    /// Returns [`NavigationError::TooManyRedirects`] when the guard keeps
    /// redirecting.
    pub async fn push(&mut self, full_path: &str) -> Result<&Location, NavigationError> {
        self.navigate(full_path, false).await
    }

    /// # Errors
    ///
    /// See [`Router::push`].
    pub async fn replace(&mut self, full_path: &str) -> Result<&Location, NavigationError> {
        self.navigate(full_path, true).await
    }

    /// Drop the current entry and return to the previous one, if any.
    pub fn back(&mut self) -> Option<&Location> {
        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        self.history.last()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Location> {
        self.history.last()
    }

    #[must_use]
    pub fn history(&self) -> &[Location] {
        &self.history
    }

    /// Document title for the current entry.
    #[must_use]
    pub fn title(&self) -> String {
        match self.current() {
            Some(location) => format!("{} - {}", location.route.title, self.app_name),
            None => self.app_name.clone(),
        }
    }

    async fn navigate(&mut self, full_path: &str, mut replace: bool) -> Result<&Location, NavigationError> {
        let mut target = full_path.to_owned();
        for _ in 0..=MAX_REDIRECTS {
            let route = resolve(&target);
            match self.guard.check(route.access, &target).await {
                GuardDecision::Allow => {
                    let location = Location { full_path: target, route };
                    info!(path = %location.full_path, route = route.name, replace, "navigated");
                    if replace {
                        self.history.pop();
                    }
                    self.history.push(location);
                    return Ok(&self.history[self.history.len() - 1]);
                }
                GuardDecision::Redirect { to, replace: guard_replace } => {
                    debug!(from = %target, to = %to, "navigation redirected");
                    target = to;
                    replace |= guard_replace;
                }
            }
        }
        Err(NavigationError::TooManyRedirects { path: full_path.to_owned() })
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
