use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{Application, ApplicationStatus, ApplyRequest};
use super::export::applications_csv;
use super::views::{ApplicationJoiner, ApplicationView};
use crate::access;
use crate::auth::{require_role, AuthError, Principal, Role};
use crate::directory::domain::{clean, Company};
use crate::ids::{ApplicationId, PostingId, UserId};
use crate::notifications::{ApplicationEvent, NotificationPublisher};
use crate::store::{
    ApplicationRepository, DirectoryRepository, PostingRepository, ProfileRepository,
    RepositoryError,
};

/// Students applying to postings and companies working through applicants.
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    postings: Arc<dyn PostingRepository>,
    directory: Arc<dyn DirectoryRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn NotificationPublisher>,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        postings: Arc<dyn PostingRepository>,
        directory: Arc<dyn DirectoryRepository>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            applications,
            postings,
            directory,
            profiles,
            notifier,
        }
    }

    /// Submit a pending application carrying the student's current CV.
    pub fn apply(
        &self,
        principal: &Principal,
        request: ApplyRequest,
    ) -> Result<Application, ApplicationError> {
        require_role(principal, &[Role::Student])?;
        let profile = self
            .profiles
            .profile(&principal.user_id)?
            .ok_or(ApplicationError::MissingProfile)?;
        let posting = self
            .postings
            .posting(&request.posting_id)?
            .ok_or(ApplicationError::NotFound("posting"))?;
        if !posting.accepts_applications(Utc::now().date_naive()) {
            return Err(ApplicationError::PostingClosed);
        }

        let now = Utc::now();
        let application = Application {
            id: ApplicationId::new(),
            posting_id: posting.id,
            student_id: principal.user_id,
            cover_letter: clean(request.cover_letter),
            cv_path: profile.cv_path,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let stored = match self.applications.insert_application(application) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(ApplicationError::AlreadyApplied),
            Err(err) => return Err(err.into()),
        };

        info!(
            application_id = %stored.id,
            posting_id = %stored.posting_id,
            student_id = %stored.student_id,
            "application stored"
        );
        self.notify(ApplicationEvent::Submitted {
            application_id: stored.id,
            posting_id: stored.posting_id,
            student_id: stored.student_id,
        });
        Ok(stored)
    }

    /// Move an application to any status the caller is allowed to set.
    pub fn update_status(
        &self,
        principal: &Principal,
        id: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<Application, ApplicationError> {
        let mut application = self
            .applications
            .application(id)?
            .ok_or(ApplicationError::NotFound("application"))?;
        let company = self.company_for_posting(&application.posting_id)?;
        if !access::can_set_application_status(principal, &application, company.as_ref(), next) {
            return Err(ApplicationError::Forbidden);
        }

        let previous = application.status;
        application.status = next;
        application.updated_at = Utc::now();
        self.applications.update_application(application.clone())?;

        info!(
            application_id = %application.id,
            from = previous.label(),
            to = next.label(),
            changed_by = %principal.user_id,
            "application status changed"
        );
        self.notify(ApplicationEvent::StatusChanged {
            application_id: application.id,
            student_id: application.student_id,
            from: previous,
            to: next,
            changed_by: principal.user_id,
        });
        Ok(application)
    }

    pub fn application(
        &self,
        principal: &Principal,
        id: &ApplicationId,
    ) -> Result<ApplicationView, ApplicationError> {
        let application = self
            .applications
            .application(id)?
            .ok_or(ApplicationError::NotFound("application"))?;
        let company = self.company_for_posting(&application.posting_id)?;
        let school = match self.profiles.profile(&application.student_id)? {
            Some(profile) => match profile.school_id {
                Some(school_id) => self.directory.school(&school_id)?,
                None => None,
            },
            None => None,
        };
        if !access::can_read_application(principal, &application, company.as_ref(), school.as_ref())
        {
            return Err(ApplicationError::Forbidden);
        }
        let mut views = self.joiner().join(vec![application])?;
        views.pop().ok_or(ApplicationError::NotFound("application"))
    }

    /// Role-scoped listing for the caller.
    pub fn list_for(&self, principal: &Principal) -> Result<Vec<ApplicationView>, ApplicationError> {
        match principal.role {
            Role::Student => self.list_for_student(principal),
            Role::Company => self.list_for_company(principal),
            Role::School => self.list_for_school(principal),
            Role::Admin => self.list_all(principal),
        }
    }

    pub fn list_for_student(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ApplicationView>, ApplicationError> {
        require_role(principal, &[Role::Student])?;
        let rows = self.applications.applications_for_student(&principal.user_id)?;
        Ok(self.joiner().join(rows)?)
    }

    pub fn list_for_company(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ApplicationView>, ApplicationError> {
        require_role(principal, &[Role::Company])?;
        let Some(company) = self.directory.company_by_owner(&principal.user_id)? else {
            return Ok(Vec::new());
        };
        let posting_ids: Vec<PostingId> = self
            .postings
            .postings_for_company(&company.id)?
            .into_iter()
            .map(|posting| posting.id)
            .collect();
        let rows = self.applications.applications_for_postings(&posting_ids)?;
        Ok(self.joiner().join(rows)?)
    }

    /// Applications from students linked to the caller's school.
    pub fn list_for_school(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ApplicationView>, ApplicationError> {
        require_role(principal, &[Role::School])?;
        let Some(school) = self.directory.school_by_owner(&principal.user_id)? else {
            return Ok(Vec::new());
        };
        let student_ids: Vec<UserId> = self
            .profiles
            .profiles_for_school(&school.id)?
            .into_iter()
            .map(|profile| profile.user_id)
            .collect();
        let rows = self.applications.applications_for_students(&student_ids)?;
        Ok(self.joiner().join(rows)?)
    }

    pub fn list_all(&self, principal: &Principal) -> Result<Vec<ApplicationView>, ApplicationError> {
        require_role(principal, &[Role::Admin])?;
        self.all_views()
    }

    pub fn export_csv(&self, principal: &Principal) -> Result<String, ApplicationError> {
        require_role(principal, &[Role::Admin])?;
        let views = self.all_views()?;
        applications_csv(&views).map_err(|err| ApplicationError::Export(err.to_string()))
    }

    /// Every application, joined, without a caller check. Used by offline exports.
    pub fn all_views(&self) -> Result<Vec<ApplicationView>, ApplicationError> {
        let rows = self.applications.applications()?;
        Ok(self.joiner().join(rows)?)
    }

    fn joiner(&self) -> ApplicationJoiner<'_> {
        ApplicationJoiner {
            postings: self.postings.as_ref(),
            directory: self.directory.as_ref(),
            profiles: self.profiles.as_ref(),
        }
    }

    fn company_for_posting(&self, posting_id: &PostingId) -> Result<Option<Company>, ApplicationError> {
        match self.postings.posting(posting_id)? {
            Some(posting) => Ok(self.directory.company(&posting.company_id)?),
            None => Ok(None),
        }
    }

    /// The row is already committed; a failed hook is logged, not surfaced.
    fn notify(&self, event: ApplicationEvent) {
        if let Err(err) = self.notifier.publish(event) {
            warn!(error = %err, "failed to publish application event");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("create your student profile before applying")]
    MissingProfile,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("posting is not accepting applications")]
    PostingClosed,
    #[error("you have already applied to this posting")]
    AlreadyApplied,
    #[error("not allowed to access this application")]
    Forbidden,
    #[error("export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
