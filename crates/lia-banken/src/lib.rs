//! LIA Banken: internship placement platform for schools, companies, and students.

pub mod access;
pub mod applications;
pub mod auth;
pub mod config;
pub mod dashboards;
pub mod directory;
pub mod error;
mod http;
pub mod ids;
pub mod notifications;
pub mod platform;
pub mod postings;
pub mod profiles;
pub mod storage;
pub mod store;
pub mod telemetry;

pub use error::AppError;
pub use platform::Platform;
