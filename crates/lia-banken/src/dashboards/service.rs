use std::collections::HashSet;
use std::sync::Arc;

use super::views::{
    AdminDashboard, CompanyDashboard, Dashboard, SchoolDashboard, StatusCounts, StudentDashboard,
};
use crate::applications::domain::{Application, ApplicationStatus};
use crate::auth::{Principal, Role};
use crate::postings::domain::{JobPosting, PostingStatus};
use crate::store::{
    ApplicationRepository, DirectoryRepository, PostingRepository, ProfileRepository,
    RepositoryError, UserRepository,
};

/// Per-role summary counts.
pub struct DashboardService {
    users: Arc<dyn UserRepository>,
    directory: Arc<dyn DirectoryRepository>,
    profiles: Arc<dyn ProfileRepository>,
    postings: Arc<dyn PostingRepository>,
    applications: Arc<dyn ApplicationRepository>,
}

impl DashboardService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        directory: Arc<dyn DirectoryRepository>,
        profiles: Arc<dyn ProfileRepository>,
        postings: Arc<dyn PostingRepository>,
        applications: Arc<dyn ApplicationRepository>,
    ) -> Self {
        Self {
            users,
            directory,
            profiles,
            postings,
            applications,
        }
    }

    pub fn dashboard(&self, principal: &Principal) -> Result<Dashboard, RepositoryError> {
        Ok(match principal.role {
            Role::Student => Dashboard::Student(self.student(principal)?),
            Role::Company => Dashboard::Company(self.company(principal)?),
            Role::School => Dashboard::School(self.school(principal)?),
            Role::Admin => Dashboard::Admin(self.admin()?),
        })
    }

    pub fn student(&self, principal: &Principal) -> Result<StudentDashboard, RepositoryError> {
        let applications = self.applications.applications_for_student(&principal.user_id)?;
        let active_postings = self
            .postings
            .postings()?
            .iter()
            .filter(|posting| posting.status == PostingStatus::Active)
            .count();
        let profile = self.profiles.profile(&principal.user_id)?;

        Ok(StudentDashboard {
            applications_total: applications.len(),
            applications_by_status: application_counts(&applications),
            active_postings,
            profile_completeness: profile.as_ref().map_or(0, |p| p.completeness()),
            has_cv: profile.as_ref().map_or(false, |p| p.cv_path.is_some()),
            has_school: profile.as_ref().map_or(false, |p| p.school_id.is_some()),
            has_skills: profile.as_ref().map_or(false, |p| !p.skills.is_empty()),
        })
    }

    pub fn company(&self, principal: &Principal) -> Result<CompanyDashboard, RepositoryError> {
        let Some(company) = self.directory.company_by_owner(&principal.user_id)? else {
            return Ok(CompanyDashboard {
                company_name: None,
                postings_by_status: posting_counts(&[]),
                applications_total: 0,
                applications_by_status: application_counts(&[]),
                open_positions: 0,
            });
        };

        let postings = self.postings.postings_for_company(&company.id)?;
        let ids: Vec<_> = postings.iter().map(|posting| posting.id).collect();
        let applications = self.applications.applications_for_postings(&ids)?;
        let open_positions = postings
            .iter()
            .filter(|posting| posting.status == PostingStatus::Active)
            .map(|posting| u64::from(posting.positions))
            .sum();

        Ok(CompanyDashboard {
            company_name: Some(company.name),
            postings_by_status: posting_counts(&postings),
            applications_total: applications.len(),
            applications_by_status: application_counts(&applications),
            open_positions,
        })
    }

    pub fn school(&self, principal: &Principal) -> Result<SchoolDashboard, RepositoryError> {
        let Some(school) = self.directory.school_by_owner(&principal.user_id)? else {
            return Ok(SchoolDashboard {
                school_name: None,
                programs: 0,
                lia_periods: 0,
                students: 0,
                placed_students: 0,
                total_slots: 0,
                open_slots: 0,
            });
        };

        let programs = self.directory.programs_for_school(&school.id)?.len();
        let periods = self.directory.lia_periods_for_school(&school.id)?;
        let students = self.profiles.profiles_for_school(&school.id)?;
        let student_ids: Vec<_> = students.iter().map(|profile| profile.user_id).collect();
        let placed: HashSet<_> = self
            .applications
            .applications_for_students(&student_ids)?
            .into_iter()
            .filter(|application| application.status == ApplicationStatus::Accepted)
            .map(|application| application.student_id)
            .collect();

        let total_slots: u64 = periods.iter().map(|period| u64::from(period.slots)).sum();
        let placed_students = placed.len();
        let open_slots =
            total_slots.saturating_sub(u64::try_from(placed_students).unwrap_or(u64::MAX));

        Ok(SchoolDashboard {
            school_name: Some(school.name),
            programs,
            lia_periods: periods.len(),
            students: students.len(),
            placed_students,
            total_slots,
            open_slots,
        })
    }

    pub fn admin(&self) -> Result<AdminDashboard, RepositoryError> {
        let users = self.users.users()?;
        let mut users_by_role: StatusCounts =
            Role::all().iter().map(|role| (role.label(), 0)).collect();
        for user in &users {
            *users_by_role.entry(user.role.label()).or_default() += 1;
        }
        let postings = self.postings.postings()?;

        Ok(AdminDashboard {
            users_total: users.len(),
            users_by_role,
            schools: self.directory.schools()?.len(),
            companies: self.directory.companies()?.len(),
            active_postings: postings
                .iter()
                .filter(|posting| posting.status == PostingStatus::Active)
                .count(),
            postings: postings.len(),
            applications: self.applications.applications()?.len(),
        })
    }
}

fn application_counts(applications: &[Application]) -> StatusCounts {
    let mut counts: StatusCounts = ApplicationStatus::all()
        .iter()
        .map(|status| (status.label(), 0))
        .collect();
    for application in applications {
        *counts.entry(application.status.label()).or_default() += 1;
    }
    counts
}

fn posting_counts(postings: &[JobPosting]) -> StatusCounts {
    let mut counts: StatusCounts = PostingStatus::all()
        .iter()
        .map(|status| (status.label(), 0))
        .collect();
    for posting in postings {
        *counts.entry(posting.status.label()).or_default() += 1;
    }
    counts
}
