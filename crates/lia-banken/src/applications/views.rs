//! Read-then-join loader that stitches applications to their related rows.

use std::collections::HashMap;

use serde::Serialize;

use super::domain::Application;
use crate::directory::domain::Company;
use crate::ids::{CompanyId, PostingId, UserId};
use crate::postings::domain::JobPosting;
use crate::profiles::domain::StudentProfile;
use crate::store::{DirectoryRepository, PostingRepository, ProfileRepository, RepositoryError};

/// An application with the posting, company, and student it refers to.
///
/// Related rows that no longer exist are reported as `None`; the application
/// itself is never dropped from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub posting: Option<PostingSummary>,
    pub company: Option<CompanySummary>,
    pub student: Option<StudentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingSummary {
    pub id: PostingId,
    pub title: String,
    pub category: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanySummary {
    pub id: CompanyId,
    pub name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub user_id: UserId,
    pub full_name: String,
    pub city: Option<String>,
    pub skills: Vec<String>,
}

impl From<&JobPosting> for PostingSummary {
    fn from(posting: &JobPosting) -> Self {
        Self {
            id: posting.id,
            title: posting.title.clone(),
            category: posting.category.clone(),
            location: posting.location.clone(),
        }
    }
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
            city: company.city.clone(),
        }
    }
}

impl From<&StudentProfile> for StudentSummary {
    fn from(profile: &StudentProfile) -> Self {
        Self {
            user_id: profile.user_id,
            full_name: profile.full_name.clone(),
            city: profile.city.clone(),
            skills: profile.skills.clone(),
        }
    }
}

pub(crate) struct ApplicationJoiner<'a> {
    pub postings: &'a dyn PostingRepository,
    pub directory: &'a dyn DirectoryRepository,
    pub profiles: &'a dyn ProfileRepository,
}

impl ApplicationJoiner<'_> {
    /// One batch lookup per related table, then stitch in memory, newest first.
    pub fn join(
        &self,
        mut applications: Vec<Application>,
    ) -> Result<Vec<ApplicationView>, RepositoryError> {
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let posting_ids = distinct(applications.iter().map(|app| app.posting_id));
        let postings: HashMap<PostingId, JobPosting> = self
            .postings
            .postings_by_ids(&posting_ids)?
            .into_iter()
            .map(|posting| (posting.id, posting))
            .collect();

        let company_ids = distinct(postings.values().map(|posting| posting.company_id));
        let companies: HashMap<CompanyId, Company> = self
            .directory
            .companies_by_ids(&company_ids)?
            .into_iter()
            .map(|company| (company.id, company))
            .collect();

        let student_ids = distinct(applications.iter().map(|app| app.student_id));
        let students: HashMap<UserId, StudentProfile> = self
            .profiles
            .profiles_by_ids(&student_ids)?
            .into_iter()
            .map(|profile| (profile.user_id, profile))
            .collect();

        Ok(applications
            .into_iter()
            .map(|application| {
                let posting = postings.get(&application.posting_id);
                let company = posting.and_then(|posting| companies.get(&posting.company_id));
                ApplicationView {
                    posting: posting.map(PostingSummary::from),
                    company: company.map(CompanySummary::from),
                    student: students
                        .get(&application.student_id)
                        .map(StudentSummary::from),
                    application,
                }
            })
            .collect())
    }
}

fn distinct<T: Ord>(ids: impl Iterator<Item = T>) -> Vec<T> {
    let mut ids: Vec<T> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}
