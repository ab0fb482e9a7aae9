//! Authentication core for profilehub.
//!
//! Wraps a hosted identity provider behind a facade that always answers with
//! [`AuthResult`], keeps the current session in a reactive cache, and decides
//! route access. Errors are split into system errors (raised as global
//! notifications) and business errors (returned to the form).
//!
//! Layering, bottom to top: `provider` and `gotrue` talk to the remote,
//! `normalize` and `service` produce results, `query` and `cache` hold state,
//! `actions` and `guard` are what the application calls.

pub mod actions;
pub mod cache;
pub mod gotrue;
pub mod guard;
pub mod normalize;
pub mod notify;
pub mod provider;
pub mod query;
pub mod service;
pub mod store;
pub mod types;
pub mod validators;

#[cfg(any(test, feature = "test-util"))]
pub mod test_helpers;

pub use actions::{ActionState, AuthActions};
pub use cache::{SessionCache, SessionHandle, SessionSnapshot};
pub use guard::{GuardDecision, RouteAccess, RouteGuard};
pub use notify::{Level, Notification, Notifier};
pub use query::{Query, QueryClient, QueryStatus, Snapshot};
pub use service::{AuthService, Subscription};
pub use types::{AuthError, AuthResult, AuthSession, AuthUser, SessionChangeKind, SessionChanged, SignUpOutcome};
