use std::collections::BTreeMap;

use serde::Serialize;

/// Counts keyed by status label, with every known status present.
pub type StatusCounts = BTreeMap<&'static str, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Student(StudentDashboard),
    Company(CompanyDashboard),
    School(SchoolDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentDashboard {
    pub applications_total: usize,
    pub applications_by_status: StatusCounts,
    pub active_postings: usize,
    pub profile_completeness: u8,
    pub has_cv: bool,
    pub has_school: bool,
    pub has_skills: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyDashboard {
    pub company_name: Option<String>,
    pub postings_by_status: StatusCounts,
    pub applications_total: usize,
    pub applications_by_status: StatusCounts,
    /// Positions across active postings.
    pub open_positions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolDashboard {
    pub school_name: Option<String>,
    pub programs: usize,
    pub lia_periods: usize,
    pub students: usize,
    /// Students holding at least one accepted application.
    pub placed_students: usize,
    pub total_slots: u64,
    pub open_slots: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminDashboard {
    pub users_total: usize,
    pub users_by_role: StatusCounts,
    pub schools: usize,
    pub companies: usize,
    pub postings: usize,
    pub active_postings: usize,
    pub applications: usize,
}
