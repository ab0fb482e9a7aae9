//! profilehub: account and profile management over a hosted auth provider.
//!
//! The authentication core lives in the `auth` crate. This crate adds the
//! application around it: configuration, the profile feature, guarded
//! routing and the shared state the CLI drives.

pub mod config;
pub mod profile;
pub mod router;
pub mod state;
