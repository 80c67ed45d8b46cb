//! Applications: intake, status pipeline, joined listings, and CSV export.

pub mod domain;
pub mod export;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{Application, ApplicationStatus, ApplyRequest, StatusUpdate};
pub use export::{applications_csv, write_applications_csv};
pub use router::application_router;
pub use service::{ApplicationError, ApplicationService};
pub use views::{ApplicationView, CompanySummary, PostingSummary, StudentSummary};
