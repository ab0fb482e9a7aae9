//! User profile feature: the `profiles` row behind the profile page.

pub mod avatars;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

pub use service::ProfileService;
pub use store::{PostgrestProfiles, ProfileStore};
pub use types::{AddressInfo, BasicInfo, EmailChange, Gender, PasswordChange, ProfileError, ProfileUpdate, UserProfile};
