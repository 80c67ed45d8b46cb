pub mod domain;
pub mod router;
pub mod service;

pub use domain::{ProfileForm, StudentProfile};
pub use router::profile_router;
pub use service::{ProfileError, ProfileService};
