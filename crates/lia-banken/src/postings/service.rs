use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::domain::{
    CompanyPostingView, JobPosting, PostingFilter, PostingForm, PostingListing, PostingStatus,
};
use crate::access;
use crate::applications::domain::ApplicationStatus;
use crate::auth::{require_role, AuthError, Principal, Role};
use crate::directory::domain::{clean, Company};
use crate::ids::{CompanyId, LiaPeriodId, PostingId};
use crate::store::{
    ApplicationRepository, DirectoryRepository, PostingRepository, RepositoryError,
};

/// Company job postings and the public posting board.
pub struct PostingService {
    postings: Arc<dyn PostingRepository>,
    directory: Arc<dyn DirectoryRepository>,
    applications: Arc<dyn ApplicationRepository>,
}

impl PostingService {
    pub fn new(
        postings: Arc<dyn PostingRepository>,
        directory: Arc<dyn DirectoryRepository>,
        applications: Arc<dyn ApplicationRepository>,
    ) -> Self {
        Self {
            postings,
            directory,
            applications,
        }
    }

    /// Validate the posting form and create exactly one row for the caller's company.
    pub fn create_posting(
        &self,
        principal: &Principal,
        form: PostingForm,
    ) -> Result<JobPosting, PostingError> {
        let company = self.caller_company(principal)?;
        let fields = self.validate(form)?;
        let now = Utc::now();

        let posting = JobPosting {
            id: PostingId::new(),
            company_id: company.id,
            title: fields.title,
            category: fields.category,
            description: fields.description,
            location: fields.location,
            remote: fields.remote,
            positions: fields.positions,
            lia_period_id: fields.lia_period_id,
            requirements: fields.requirements,
            deadline: fields.deadline,
            status: fields.status,
            created_at: now,
            updated_at: now,
        };

        let stored = self.postings.insert_posting(posting)?;
        info!(
            posting_id = %stored.id,
            company_id = %stored.company_id,
            status = stored.status.label(),
            "job posting created"
        );
        Ok(stored)
    }

    pub fn update_posting(
        &self,
        principal: &Principal,
        id: &PostingId,
        form: PostingForm,
    ) -> Result<JobPosting, PostingError> {
        let existing = self.owned_posting(principal, id)?;
        let fields = self.validate(form)?;
        let posting = JobPosting {
            title: fields.title,
            category: fields.category,
            description: fields.description,
            location: fields.location,
            remote: fields.remote,
            positions: fields.positions,
            lia_period_id: fields.lia_period_id,
            requirements: fields.requirements,
            deadline: fields.deadline,
            status: if fields.status == PostingStatus::Active {
                PostingStatus::Active
            } else {
                existing.status
            },
            updated_at: Utc::now(),
            ..existing
        };
        self.postings.update_posting(posting.clone())?;
        Ok(posting)
    }

    pub fn set_status(
        &self,
        principal: &Principal,
        id: &PostingId,
        status: PostingStatus,
    ) -> Result<JobPosting, PostingError> {
        let mut posting = self.owned_posting(principal, id)?;
        posting.status = status;
        posting.updated_at = Utc::now();
        self.postings.update_posting(posting.clone())?;
        info!(posting_id = %posting.id, status = status.label(), "posting status changed");
        Ok(posting)
    }

    /// Postings that already received applications are closed, not deleted.
    pub fn delete_posting(&self, principal: &Principal, id: &PostingId) -> Result<(), PostingError> {
        let posting = self.owned_posting(principal, id)?;
        if !self
            .applications
            .applications_for_postings(&[posting.id])?
            .is_empty()
        {
            return Err(PostingError::HasApplications);
        }
        Ok(self.postings.delete_posting(&posting.id)?)
    }

    /// Public view of one posting; drafts are only visible to their company.
    pub fn posting(
        &self,
        principal: Option<&Principal>,
        id: &PostingId,
    ) -> Result<PostingListing, PostingError> {
        let posting = self.postings.posting(id)?.ok_or(PostingError::NotFound)?;
        let company = self.directory.company(&posting.company_id)?;
        if posting.status != PostingStatus::Active {
            let visible = match (principal, company.as_ref()) {
                (Some(principal), Some(company)) => access::owns_company(principal, company),
                (Some(principal), None) => principal.is_admin(),
                _ => false,
            };
            if !visible {
                return Err(PostingError::NotFound);
            }
        }
        Ok(PostingListing {
            posting,
            company_name: company.map(|company| company.name),
        })
    }

    /// Active postings matching the filter, newest first, stitched to company names.
    pub fn list_active(&self, filter: &PostingFilter) -> Result<Vec<PostingListing>, PostingError> {
        let mut postings: Vec<JobPosting> = self
            .postings
            .postings()?
            .into_iter()
            .filter(|posting| posting.status == PostingStatus::Active && filter.matches(posting))
            .collect();
        postings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut company_ids: Vec<CompanyId> =
            postings.iter().map(|posting| posting.company_id).collect();
        company_ids.sort();
        company_ids.dedup();
        let names: HashMap<CompanyId, String> = self
            .directory
            .companies_by_ids(&company_ids)?
            .into_iter()
            .map(|company| (company.id, company.name))
            .collect();

        Ok(postings
            .into_iter()
            .map(|posting| PostingListing {
                company_name: names.get(&posting.company_id).cloned(),
                posting,
            })
            .collect())
    }

    /// The caller's postings with per-status application counts.
    pub fn list_company_postings(
        &self,
        principal: &Principal,
    ) -> Result<Vec<CompanyPostingView>, PostingError> {
        let company = self.caller_company(principal)?;
        let mut postings = self.postings.postings_for_company(&company.id)?;
        postings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let ids: Vec<PostingId> = postings.iter().map(|posting| posting.id).collect();
        let mut counts: HashMap<PostingId, BTreeMap<&'static str, usize>> = HashMap::new();
        for application in self.applications.applications_for_postings(&ids)? {
            *counts
                .entry(application.posting_id)
                .or_default()
                .entry(application.status.label())
                .or_default() += 1;
        }

        Ok(postings
            .into_iter()
            .map(|posting| {
                let mut by_status = counts.remove(&posting.id).unwrap_or_default();
                for status in ApplicationStatus::all() {
                    by_status.entry(status.label()).or_insert(0);
                }
                CompanyPostingView {
                    applications_total: by_status.values().sum(),
                    applications_by_status: by_status,
                    posting,
                }
            })
            .collect())
    }

    fn caller_company(&self, principal: &Principal) -> Result<Company, PostingError> {
        require_role(principal, &[Role::Company])?;
        self.directory
            .company_by_owner(&principal.user_id)?
            .ok_or(PostingError::MissingCompany)
    }

    fn owned_posting(
        &self,
        principal: &Principal,
        id: &PostingId,
    ) -> Result<JobPosting, PostingError> {
        let posting = self.postings.posting(id)?.ok_or(PostingError::NotFound)?;
        let allowed = match self.directory.company(&posting.company_id)? {
            Some(company) => access::owns_company(principal, &company),
            None => principal.is_admin(),
        };
        if !allowed {
            return Err(PostingError::Forbidden);
        }
        Ok(posting)
    }

    fn validate(&self, form: PostingForm) -> Result<ValidPosting, PostingError> {
        let title = form.title.trim().to_string();
        if title.is_empty() {
            return Err(PostingError::Validation("title is required".to_string()));
        }
        let category = form.category.trim().to_string();
        if category.is_empty() {
            return Err(PostingError::Validation("category is required".to_string()));
        }

        let positions = form.positions.unwrap_or(1);
        if positions == 0 {
            return Err(PostingError::Validation(
                "positions must be greater than zero".to_string(),
            ));
        }

        if let Some(deadline) = form.deadline {
            if deadline < Utc::now().date_naive() {
                return Err(PostingError::Validation(
                    "deadline cannot be in the past".to_string(),
                ));
            }
        }

        if let Some(period_id) = &form.lia_period_id {
            if self.directory.lia_period(period_id)?.is_none() {
                return Err(PostingError::Validation("unknown lia_period_id".to_string()));
            }
        }

        let requirements = form
            .requirements
            .into_iter()
            .map(|requirement| requirement.trim().to_string())
            .filter(|requirement| !requirement.is_empty())
            .collect();

        Ok(ValidPosting {
            title,
            category,
            description: clean(form.description),
            location: clean(form.location),
            remote: form.remote,
            positions,
            lia_period_id: form.lia_period_id,
            requirements,
            deadline: form.deadline,
            status: if form.publish {
                PostingStatus::Active
            } else {
                PostingStatus::Draft
            },
        })
    }
}

struct ValidPosting {
    title: String,
    category: String,
    description: Option<String>,
    location: Option<String>,
    remote: bool,
    positions: u32,
    lia_period_id: Option<LiaPeriodId>,
    requirements: Vec<String>,
    deadline: Option<NaiveDate>,
    status: PostingStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("{0}")]
    Validation(String),
    #[error("posting not found")]
    NotFound,
    #[error("register a company before posting jobs")]
    MissingCompany,
    #[error("not allowed to modify this posting")]
    Forbidden,
    #[error("posting has applications; close it instead")]
    HasApplications,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
