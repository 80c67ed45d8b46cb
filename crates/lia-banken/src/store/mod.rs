//! Repository seams for every table the platform owns.
//!
//! Services only see these traits; `MemoryDatabase` is the bundled backend.

mod memory;

pub use memory::MemoryDatabase;

use crate::applications::domain::Application;
use crate::auth::domain::{Session, UserAccount};
use crate::directory::domain::{Company, EducationProgram, LiaPeriod, School};
use crate::ids::{
    ApplicationId, CompanyId, LiaPeriodId, PostingId, ProgramId, SchoolId, UserId,
};
use crate::postings::domain::JobPosting;
use crate::profiles::domain::StudentProfile;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the e-mail (case-insensitive) is taken.
    fn insert_user(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    fn user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError>;
    fn users(&self) -> Result<Vec<UserAccount>, RepositoryError>;

    fn insert_session(&self, session: Session) -> Result<(), RepositoryError>;
    fn session(&self, token: &str) -> Result<Option<Session>, RepositoryError>;
    fn remove_session(&self, token: &str) -> Result<(), RepositoryError>;
}

pub trait DirectoryRepository: Send + Sync {
    fn save_school(&self, school: School) -> Result<School, RepositoryError>;
    fn school(&self, id: &SchoolId) -> Result<Option<School>, RepositoryError>;
    fn school_by_owner(&self, owner: &UserId) -> Result<Option<School>, RepositoryError>;
    fn schools(&self) -> Result<Vec<School>, RepositoryError>;

    fn save_company(&self, company: Company) -> Result<Company, RepositoryError>;
    fn company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn company_by_owner(&self, owner: &UserId) -> Result<Option<Company>, RepositoryError>;
    fn companies(&self) -> Result<Vec<Company>, RepositoryError>;
    fn companies_by_ids(&self, ids: &[CompanyId]) -> Result<Vec<Company>, RepositoryError>;

    fn save_program(&self, program: EducationProgram)
        -> Result<EducationProgram, RepositoryError>;
    fn program(&self, id: &ProgramId) -> Result<Option<EducationProgram>, RepositoryError>;
    fn programs_for_school(
        &self,
        school: &SchoolId,
    ) -> Result<Vec<EducationProgram>, RepositoryError>;
    fn delete_program(&self, id: &ProgramId) -> Result<(), RepositoryError>;

    fn save_lia_period(&self, period: LiaPeriod) -> Result<LiaPeriod, RepositoryError>;
    fn lia_period(&self, id: &LiaPeriodId) -> Result<Option<LiaPeriod>, RepositoryError>;
    fn lia_periods_for_school(&self, school: &SchoolId)
        -> Result<Vec<LiaPeriod>, RepositoryError>;
    fn delete_lia_period(&self, id: &LiaPeriodId) -> Result<(), RepositoryError>;
}

pub trait ProfileRepository: Send + Sync {
    fn save_profile(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError>;
    fn profile(&self, user: &UserId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn profiles_by_ids(&self, ids: &[UserId]) -> Result<Vec<StudentProfile>, RepositoryError>;
    fn profiles_for_school(
        &self,
        school: &SchoolId,
    ) -> Result<Vec<StudentProfile>, RepositoryError>;
}

pub trait PostingRepository: Send + Sync {
    fn insert_posting(&self, posting: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn update_posting(&self, posting: JobPosting) -> Result<(), RepositoryError>;
    fn posting(&self, id: &PostingId) -> Result<Option<JobPosting>, RepositoryError>;
    fn postings_by_ids(&self, ids: &[PostingId]) -> Result<Vec<JobPosting>, RepositoryError>;
    fn postings_for_company(
        &self,
        company: &CompanyId,
    ) -> Result<Vec<JobPosting>, RepositoryError>;
    fn postings(&self) -> Result<Vec<JobPosting>, RepositoryError>;
    fn delete_posting(&self, id: &PostingId) -> Result<(), RepositoryError>;
}

pub trait ApplicationRepository: Send + Sync {
    /// Fails with `Conflict` when the student already applied to the posting.
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn applications_for_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_postings(
        &self,
        postings: &[PostingId],
    ) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_students(
        &self,
        students: &[UserId],
    ) -> Result<Vec<Application>, RepositoryError>;
    fn applications(&self) -> Result<Vec<Application>, RepositoryError>;
}

/// Everything a platform needs from one backend.
pub trait Database:
    UserRepository
    + DirectoryRepository
    + ProfileRepository
    + PostingRepository
    + ApplicationRepository
{
}

impl<T> Database for T where
    T: UserRepository
        + DirectoryRepository
        + ProfileRepository
        + PostingRepository
        + ApplicationRepository
{
}
