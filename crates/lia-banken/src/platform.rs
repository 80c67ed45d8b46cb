//! Shared router state wiring every service to one database backend.

use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;

use crate::applications::{application_router, ApplicationService};
use crate::auth::{auth_router, AuthService};
use crate::config::{AuthConfig, StorageConfig};
use crate::dashboards::{dashboard_router, DashboardService};
use crate::directory::{directory_router, DirectoryService};
use crate::notifications::NotificationPublisher;
use crate::postings::{posting_router, PostingService};
use crate::profiles::{profile_router, ProfileService};
use crate::storage::ObjectStore;
use crate::store::Database;

#[derive(Clone)]
pub struct Platform {
    auth: Arc<AuthService>,
    directory: Arc<DirectoryService>,
    profiles: Arc<ProfileService>,
    postings: Arc<PostingService>,
    applications: Arc<ApplicationService>,
    dashboards: Arc<DashboardService>,
    max_upload_bytes: u64,
}

impl Platform {
    pub fn new<D>(
        db: Arc<D>,
        objects: Arc<dyn ObjectStore>,
        notifier: Arc<dyn NotificationPublisher>,
        auth: AuthConfig,
        storage: &StorageConfig,
    ) -> Self
    where
        D: Database + 'static,
    {
        Self {
            auth: Arc::new(AuthService::new(db.clone(), auth)),
            directory: Arc::new(DirectoryService::new(db.clone())),
            profiles: Arc::new(ProfileService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                objects,
                storage.max_upload_bytes,
            )),
            postings: Arc::new(PostingService::new(db.clone(), db.clone(), db.clone())),
            applications: Arc::new(ApplicationService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                notifier,
            )),
            dashboards: Arc::new(DashboardService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                db,
            )),
            max_upload_bytes: storage.max_upload_bytes,
        }
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn directory(&self) -> &Arc<DirectoryService> {
        &self.directory
    }

    pub fn profiles(&self) -> &Arc<ProfileService> {
        &self.profiles
    }

    pub fn postings(&self) -> &Arc<PostingService> {
        &self.postings
    }

    pub fn applications(&self) -> &Arc<ApplicationService> {
        &self.applications
    }

    pub fn dashboards(&self) -> &Arc<DashboardService> {
        &self.dashboards
    }

    /// Every `/api/v1` route, with state applied.
    pub fn router(self) -> Router {
        Router::new()
            .merge(auth_router())
            .merge(directory_router())
            .merge(profile_router(self.max_upload_bytes))
            .merge(posting_router())
            .merge(application_router())
            .merge(dashboard_router())
            .with_state(self)
    }
}

impl FromRef<Platform> for Arc<AuthService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.auth.clone()
    }
}

impl FromRef<Platform> for Arc<DirectoryService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.directory.clone()
    }
}

impl FromRef<Platform> for Arc<ProfileService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.profiles.clone()
    }
}

impl FromRef<Platform> for Arc<PostingService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.postings.clone()
    }
}

impl FromRef<Platform> for Arc<ApplicationService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.applications.clone()
    }
}

impl FromRef<Platform> for Arc<DashboardService> {
    fn from_ref(platform: &Platform) -> Self {
        platform.dashboards.clone()
    }
}
