//! The synchronization engine.
//!
//! [`SyncEngine`] is the context object the UI layer talks to: it owns
//! the per-project cache, the in-flight registry, the credential, the
//! stale-project event channel, and the error observable. It is built
//! once per application session and cloned (cheaply, via `Arc`) into
//! background tasks. Every mutation path funnels through it instead of
//! touching ad-hoc copies of task lists.
//!
//! Split across files by concern: optimistic mutation in [`mutate`],
//! assignment and the completion cascade in [`assign`], Kanban moves in
//! [`board`], background healing in [`refresh`].

mod assign;
mod board;
mod mutate;
mod refresh;

pub use board::DropTarget;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use taskdeck_model::{ProjectId, TaskRecord, sanitize::sanitize_record};

use crate::cache::{CacheLookup, InFlightRegistry, ProjectCache};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::{EventBus, SyncEvent};
use crate::remote::{Authority, AuthorityError, Credential};

pub(crate) struct Inner<A> {
    pub(crate) authority: A,
    pub(crate) config: SyncConfig,
    pub(crate) cache: ProjectCache,
    pub(crate) in_flight: InFlightRegistry,
    credential: Mutex<Option<Credential>>,
    events: EventBus,
    last_error: watch::Sender<Option<String>>,
}

/// Client-side task synchronization engine.
///
/// All operations must run inside a tokio runtime. Remote calls carry
/// fixed per-operation timeouts from [`SyncConfig`]; there is no
/// automatic retry; the caller decides whether to prompt the user.
pub struct SyncEngine<A> {
    pub(crate) inner: Arc<Inner<A>>,
}

impl<A> Clone for SyncEngine<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Authority + 'static> SyncEngine<A> {
    /// Builds an engine around an authority, with no credential yet.
    #[must_use]
    pub fn new(authority: A, config: SyncConfig) -> Self {
        let cache = ProjectCache::new(config.cache_ttl);
        let events = EventBus::new(config.event_capacity);
        let (last_error, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                authority,
                config,
                cache,
                in_flight: InFlightRegistry::new(),
                credential: Mutex::new(None),
                events,
                last_error,
            }),
        }
    }

    /// Installs (or clears) the bearer credential used for every
    /// remote call.
    pub fn set_credential(&self, credential: Option<Credential>) {
        *self.inner.credential.lock() = credential;
    }

    /// Receiver for stale-project notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Observable holding the last surfaced failure in user-facing
    /// language (`None` until something fails).
    #[must_use]
    pub fn errors(&self) -> watch::Receiver<Option<String>> {
        self.inner.last_error.subscribe()
    }

    /// The resolved configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns the cached tasks for a project, fetching from the
    /// authority when the cache has nothing fresh enough.
    ///
    /// A fresh hit is returned immediately and additionally schedules a
    /// silent background refresh, so the UI sees slightly-stale data at
    /// once while the engine heals it. A stale entry is served only
    /// while a refresh for that project is already in flight; otherwise
    /// it counts as a miss and a foreground fetch runs.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; the failure is also pushed to the error
    /// observable.
    pub async fn load_tasks(&self, project: &ProjectId) -> Result<Vec<TaskRecord>, SyncError> {
        let result = self.load_tasks_inner(project).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn load_tasks_inner(&self, project: &ProjectId) -> Result<Vec<TaskRecord>, SyncError> {
        project.validate()?;
        match self.inner.cache.get(project) {
            CacheLookup::Fresh(tasks) => {
                tracing::debug!(%project, "cache hit, scheduling background refresh");
                self.spawn_refresh(project.clone());
                Ok(tasks)
            }
            CacheLookup::Stale(tasks) if self.inner.in_flight.is_in_flight(project) => {
                tracing::debug!(%project, "serving stale entry while refresh is in flight");
                Ok(tasks)
            }
            CacheLookup::Stale(_) | CacheLookup::Miss => {
                let credential = self.credential()?;
                let tasks = self
                    .guarded(
                        self.inner.config.read_timeout,
                        self.inner.authority.list_tasks(&credential, project),
                    )
                    .await?;
                let tasks: Vec<TaskRecord> = tasks.into_iter().map(Self::admit).collect();
                self.inner.cache.put(project.clone(), tasks.clone());
                Ok(tasks)
            }
        }
    }

    /// Current cache contents for a project, fresh or stale, without
    /// fetching or scheduling anything. This is the synchronous view a
    /// renderer repaints from between syncs.
    #[must_use]
    pub fn peek(&self, project: &ProjectId) -> Option<Vec<TaskRecord>> {
        match self.inner.cache.get(project) {
            CacheLookup::Fresh(tasks) | CacheLookup::Stale(tasks) => Some(tasks),
            CacheLookup::Miss => None,
        }
    }

    /// The current credential, or a Precondition failure. Checked
    /// before every remote call so a signed-out session never wastes a
    /// network round trip.
    pub(crate) fn credential(&self) -> Result<Credential, SyncError> {
        self.inner
            .credential
            .lock()
            .clone()
            .ok_or(SyncError::MissingCredential)
    }

    /// Runs a remote call under its timeout budget, folding both the
    /// timeout and the authority's answer into [`SyncError`].
    pub(crate) async fn guarded<T>(
        &self,
        limit: Duration,
        call: impl Future<Output = Result<T, AuthorityError>> + Send,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(SyncError::Timeout(limit)),
        }
    }

    /// Sanitizes a record before it may enter the cache. Every path
    /// into the cache goes through here.
    pub(crate) fn admit(mut record: TaskRecord) -> TaskRecord {
        sanitize_record(&mut record);
        record
    }

    /// Admits the server-canonical record and swaps it into the cache
    /// (server wins on every field).
    pub(crate) fn reconcile(&self, record: TaskRecord) -> TaskRecord {
        let record = Self::admit(record);
        if self.inner.cache.reconcile(record.clone()) {
            tracing::debug!(task = %record.id, "reconciled cache with canonical record");
        }
        record
    }

    /// Pushes a user-visible failure to the error observable.
    pub(crate) fn report(&self, error: &SyncError) {
        tracing::warn!(%error, class = ?error.class(), "sync operation failed");
        self.inner.last_error.send_replace(Some(error.user_message()));
    }

    pub(crate) fn publish(&self, event: SyncEvent) {
        self.inner.events.publish(event);
    }
}
