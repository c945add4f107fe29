//! Stale-project event channel.
//!
//! Components that learn a project's server-side state may have moved
//! under the cache (a completed cascade, a status move, a rolled-back
//! delete) publish here instead of reaching into other subsystems.
//! Interested parties (a project-list view, a dashboard) subscribe
//! and decide for themselves whether to re-fetch. Lagging subscribers
//! lose old events; they never block the engine.

use tokio::sync::broadcast;

use taskdeck_model::ProjectId;

/// Notification published by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A project's cached state is possibly stale; subscribers may want
    /// to re-fetch any derived views.
    ProjectStale {
        /// Which project.
        project: ProjectId,
    },
}

pub(crate) struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Sending with no subscribers is fine; the event is dropped.
    pub(crate) fn publish(&self, event: SyncEvent) {
        tracing::debug!(?event, "publishing sync event");
        let _ = self.tx.send(event);
    }
}
