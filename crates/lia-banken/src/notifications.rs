//! Outbound hooks fired when applications change hands.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::applications::domain::ApplicationStatus;
use crate::ids::{ApplicationId, PostingId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationEvent {
    Submitted {
        application_id: ApplicationId,
        posting_id: PostingId,
        student_id: UserId,
    },
    StatusChanged {
        application_id: ApplicationId,
        student_id: UserId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        changed_by: UserId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, event: ApplicationEvent) -> Result<(), NotificationError>;
}

/// Keeps every event; used by tests and the demo command.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ApplicationEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ApplicationEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationPublisher for RecordingNotifier {
    fn publish(&self, event: ApplicationEvent) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("recorder mutex poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Writes events to the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationPublisher for TracingNotifier {
    fn publish(&self, event: ApplicationEvent) -> Result<(), NotificationError> {
        match &event {
            ApplicationEvent::Submitted {
                application_id,
                posting_id,
                student_id,
            } => info!(%application_id, %posting_id, %student_id, "application submitted"),
            ApplicationEvent::StatusChanged {
                application_id,
                student_id,
                from,
                to,
                changed_by,
            } => info!(
                %application_id,
                %student_id,
                %changed_by,
                from = from.label(),
                to = to.label(),
                "application status changed"
            ),
        }
        Ok(())
    }
}
