//! Accounts, sessions, and the bearer-token extractor.

pub mod domain;
mod extract;
mod password;
pub mod router;
pub mod service;

pub use domain::{AccountView, Principal, Role, Session, UserAccount};
pub use extract::CurrentUser;
pub use router::auth_router;
pub use service::{require_role, AuthError, AuthService};
