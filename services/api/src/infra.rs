use chrono::NaiveDate;
use lia_banken::config::AppConfig;
use lia_banken::error::AppError;
use lia_banken::notifications::NotificationPublisher;
use lia_banken::storage::{FsObjectStore, MemoryObjectStore, ObjectStore};
use lia_banken::store::MemoryDatabase;
use lia_banken::Platform;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory tables, snapshotted to `LIA_DATA_FILE` when one is configured.
pub(crate) fn open_database(data_file: Option<&Path>) -> Result<Arc<MemoryDatabase>, AppError> {
    let db = match data_file {
        Some(path) => {
            info!(path = %path.display(), "opening database snapshot");
            MemoryDatabase::open(path)?
        }
        None => MemoryDatabase::new(),
    };
    Ok(Arc::new(db))
}

pub(crate) fn open_object_store(
    object_dir: Option<&Path>,
) -> Result<Arc<dyn ObjectStore>, AppError> {
    Ok(match object_dir {
        Some(root) => {
            info!(root = %root.display(), "storing uploads on disk");
            Arc::new(FsObjectStore::new(root)?)
        }
        None => Arc::new(MemoryObjectStore::new()),
    })
}

pub(crate) fn build_platform(
    config: &AppConfig,
    notifier: Arc<dyn NotificationPublisher>,
) -> Result<Platform, AppError> {
    let db = open_database(config.storage.data_file.as_deref())?;
    let objects = open_object_store(config.storage.object_dir.as_deref())?;
    Ok(Platform::new(
        db,
        objects,
        notifier,
        config.auth,
        &config.storage,
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
