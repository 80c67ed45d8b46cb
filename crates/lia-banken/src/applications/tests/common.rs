use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::applications::domain::{Application, ApplicationStatus, ApplyRequest};
use crate::applications::ApplicationService;
use crate::auth::domain::{SignInRequest, SignUpRequest};
use crate::auth::{Principal, Role};
use crate::config::{AuthConfig, StorageConfig};
use crate::directory::domain::{Company, CompanyForm, School, SchoolForm, Supervisor};
use crate::ids::{ApplicationId, PostingId, UserId};
use crate::notifications::RecordingNotifier;
use crate::platform::Platform;
use crate::postings::domain::{JobPosting, PostingForm};
use crate::profiles::domain::{ProfileForm, StudentProfile};
use crate::storage::MemoryObjectStore;
use crate::store::{ApplicationRepository, MemoryDatabase, RepositoryError};

pub(super) struct World {
    pub(super) db: Arc<MemoryDatabase>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) platform: Platform,
}

impl World {
    pub(super) fn new() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let platform = Platform::new(
            db.clone(),
            Arc::new(MemoryObjectStore::new()),
            notifier.clone(),
            AuthConfig::default(),
            &StorageConfig::default(),
        );
        Self {
            db,
            notifier,
            platform,
        }
    }

    pub(super) fn service(&self) -> &ApplicationService {
        self.platform.applications()
    }

    pub(super) fn company(&self, name: &str) -> (Principal, Company) {
        let owner = principal(Role::Company);
        let company = self
            .platform
            .directory()
            .upsert_company(
                &owner,
                CompanyForm {
                    name: name.to_string(),
                    city: Some("Malmö".to_string()),
                    supervisor: Supervisor {
                        name: Some("Jonas Berg".to_string()),
                        ..Supervisor::default()
                    },
                    ..CompanyForm::default()
                },
            )
            .expect("company registered");
        (owner, company)
    }

    pub(super) fn school(&self, name: &str) -> (Principal, School) {
        let owner = principal(Role::School);
        let school = self
            .platform
            .directory()
            .upsert_school(
                &owner,
                SchoolForm {
                    name: name.to_string(),
                    ..SchoolForm::default()
                },
            )
            .expect("school registered");
        (owner, school)
    }

    pub(super) fn active_posting(&self, owner: &Principal, title: &str) -> JobPosting {
        self.platform
            .postings()
            .create_posting(
                owner,
                PostingForm {
                    title: title.to_string(),
                    category: "IT".to_string(),
                    publish: true,
                    ..PostingForm::default()
                },
            )
            .expect("posting created")
    }

    pub(super) fn student(
        &self,
        name: &str,
        school: Option<&School>,
    ) -> (Principal, StudentProfile) {
        let student = principal(Role::Student);
        let profile = self
            .platform
            .profiles()
            .upsert_profile(
                &student,
                ProfileForm {
                    full_name: name.to_string(),
                    school_id: school.map(|school| school.id),
                    skills: vec!["Rust".to_string()],
                    ..ProfileForm::default()
                },
            )
            .expect("profile saved");
        (student, profile)
    }

    pub(super) fn apply(&self, student: &Principal, posting: &JobPosting) -> Application {
        self.service()
            .apply(
                student,
                ApplyRequest {
                    posting_id: posting.id,
                    cover_letter: Some("Jag vill gärna göra min LIA hos er.".to_string()),
                },
            )
            .expect("application submitted")
    }
}

pub(super) fn principal(role: Role) -> Principal {
    Principal {
        user_id: UserId::new(),
        role,
    }
}

pub(super) fn stray_application(posting_id: PostingId, student_id: UserId) -> Application {
    let now = Utc::now();
    Application {
        id: ApplicationId::new(),
        posting_id,
        student_id,
        cover_letter: None,
        cv_path: None,
        status: ApplicationStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// Accepts nothing; every insert reports a duplicate.
pub(super) struct ConflictApplications;

impl ApplicationRepository for ConflictApplications {
    fn insert_application(&self, _: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update_application(&self, _: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn application(&self, _: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    fn applications_for_student(&self, _: &UserId) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }

    fn applications_for_postings(
        &self,
        _: &[PostingId],
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }

    fn applications_for_students(
        &self,
        _: &[UserId],
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableApplications;

impl ApplicationRepository for UnavailableApplications {
    fn insert_application(&self, _: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_application(&self, _: Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn application(&self, _: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_student(&self, _: &UserId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_postings(
        &self,
        _: &[PostingId],
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications_for_students(
        &self,
        _: &[UserId],
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Sign up and sign in through the auth service, returning the bearer token.
pub(super) fn session_for(platform: &Platform, email: &str, role: Role) -> (Principal, String) {
    let auth = platform.auth();
    let account = auth
        .sign_up(SignUpRequest {
            email: email.to_string(),
            password: "hemligt-losen".to_string(),
            role,
        })
        .expect("sign up");
    let session = auth
        .sign_in(SignInRequest {
            email: email.to_string(),
            password: "hemligt-losen".to_string(),
        })
        .expect("sign in");
    (
        Principal {
            user_id: account.id,
            role,
        },
        session.token,
    )
}

pub(super) fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(super) fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
