//! Role-specific summary counts for the landing page.

pub mod router;
pub mod service;
pub mod views;

pub use router::dashboard_router;
pub use service::DashboardService;
pub use views::{
    AdminDashboard, CompanyDashboard, Dashboard, SchoolDashboard, StatusCounts, StudentDashboard,
};
