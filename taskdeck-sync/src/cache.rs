//! Per-project task cache with a freshness TTL, plus the in-flight
//! registry that deduplicates concurrent background fetches.
//!
//! All reads and writes are synchronous and complete before returning,
//! so readers never observe a partial update. Freshness is measured
//! with [`tokio::time::Instant`], which lets the test suite drive the
//! clock with a paused runtime.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use taskdeck_model::{ProjectId, TaskId, TaskPatch, TaskRecord};

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Entry exists and is younger than the TTL.
    Fresh(Vec<TaskRecord>),
    /// Entry exists but has aged out (or was force-expired). Still
    /// servable while a background refresh is healing it.
    Stale(Vec<TaskRecord>),
    /// No entry for the project.
    Miss,
}

struct ProjectEntry {
    tasks: Vec<TaskRecord>,
    fetched_at: Instant,
    /// Force-staled (e.g. after a creation with server-side effects the
    /// client cannot predict) without discarding the displayable tasks.
    expired: bool,
}

/// Keyed store of task lists per project. A project has at most one
/// live entry.
pub struct ProjectCache {
    ttl: Duration,
    entries: Mutex<HashMap<ProjectId, ProjectEntry>>,
}

impl ProjectCache {
    /// Cache whose entries stay fresh for `ttl` after a put.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up the project's entry and classifies its freshness.
    #[must_use]
    pub fn get(&self, project: &ProjectId) -> CacheLookup {
        let entries = self.entries.lock();
        match entries.get(project) {
            Some(entry) if !entry.expired && entry.fetched_at.elapsed() < self.ttl => {
                CacheLookup::Fresh(entry.tasks.clone())
            }
            Some(entry) => CacheLookup::Stale(entry.tasks.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Replaces the project's entry with a freshly fetched task list.
    pub fn put(&self, project: ProjectId, tasks: Vec<TaskRecord>) {
        let mut entries = self.entries.lock();
        entries.insert(
            project,
            ProjectEntry {
                tasks,
                fetched_at: Instant::now(),
                expired: false,
            },
        );
    }

    /// Drops the project's entry entirely.
    pub fn invalidate(&self, project: &ProjectId) {
        self.entries.lock().remove(project);
    }

    /// Marks the entry stale without discarding its tasks, so readers
    /// keep something to display while the next `get` forces a fetch.
    pub fn expire(&self, project: &ProjectId) {
        if let Some(entry) = self.entries.lock().get_mut(project) {
            entry.expired = true;
        }
    }

    /// Applies a partial update to the matching record and stamps
    /// `updated_at`. No-op if the project or task is absent. Returns
    /// whether a record was patched.
    pub fn patch(
        &self,
        project: &ProjectId,
        task: &TaskId,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(project) else {
            return false;
        };
        let Some(record) = entry.tasks.iter_mut().find(|t| t.id == *task) else {
            return false;
        };
        patch.apply(record);
        record.updated_at = now;
        true
    }

    /// Runs a closure against the matching record, wherever it lives.
    /// Returns whether a record was found (and therefore mutated).
    pub fn with_task_mut(&self, task: &TaskId, f: impl FnOnce(&mut TaskRecord)) -> bool {
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            if let Some(record) = entry.tasks.iter_mut().find(|t| t.id == *task) {
                f(record);
                return true;
            }
        }
        false
    }

    /// The record with the given id and its owning project, if cached.
    #[must_use]
    pub fn find_task(&self, task: &TaskId) -> Option<(ProjectId, TaskRecord)> {
        let entries = self.entries.lock();
        for (project, entry) in entries.iter() {
            if let Some(record) = entry.tasks.iter().find(|t| t.id == *task) {
                return Some((project.clone(), record.clone()));
            }
        }
        None
    }

    /// Replaces the cached record with the server-canonical version,
    /// matched by identity within its owning project's entry. No-op if
    /// the entry or record is absent.
    pub fn reconcile(&self, record: TaskRecord) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&record.project_id) else {
            return false;
        };
        let Some(slot) = entry.tasks.iter_mut().find(|t| t.id == record.id) else {
            return false;
        };
        *slot = record;
        true
    }

    /// Appends a newly created record to the project's entry, if one
    /// exists. Creation never materializes an entry by itself.
    pub fn append(&self, project: &ProjectId, record: TaskRecord) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(project) else {
            return false;
        };
        if entry.tasks.iter().any(|t| t.id == record.id) {
            return false;
        }
        entry.tasks.push(record);
        true
    }

    /// Removes the record from every entry (optimistic delete).
    /// Returns the record and its owning project for a later rollback.
    pub fn remove_task(&self, task: &TaskId) -> Option<(ProjectId, TaskRecord)> {
        let mut entries = self.entries.lock();
        let mut removed = None;
        for (project, entry) in entries.iter_mut() {
            if let Some(pos) = entry.tasks.iter().position(|t| t.id == *task) {
                removed = Some((project.clone(), entry.tasks.remove(pos)));
            }
        }
        removed
    }

    /// Puts a removed record back after a failed remote delete. No-op
    /// if the entry vanished or the record reappeared meanwhile.
    pub fn restore_task(&self, project: &ProjectId, record: TaskRecord) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(project)
            && !entry.tasks.iter().any(|t| t.id == record.id)
        {
            entry.tasks.push(record);
        }
    }
}

/// Tracks which projects have a background fetch in flight, so a second
/// refresh observes the flag and no-ops instead of duplicating network
/// traffic. Losers are dropped, never queued.
#[derive(Default)]
pub struct InFlightRegistry {
    keys: Mutex<HashSet<ProjectId>>,
}

impl InFlightRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the project for a fetch. Returns `false` when one is
    /// already in flight.
    pub fn begin(&self, project: &ProjectId) -> bool {
        self.keys.lock().insert(project.clone())
    }

    /// Releases the project after the fetch completed, either way.
    pub fn finish(&self, project: &ProjectId) {
        self.keys.lock().remove(project);
    }

    /// Whether a fetch is currently in flight for the project.
    #[must_use]
    pub fn is_in_flight(&self, project: &ProjectId) -> bool {
        self.keys.lock().contains(project)
    }
}
