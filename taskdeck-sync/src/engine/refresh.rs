//! Silent background refresh.
//!
//! Re-fetches a project's tasks without disturbing loading indicators,
//! used to heal the cache after mutations with side effects elsewhere.
//! Purely additive: it can only improve freshness, never degrade
//! availability. On failure the last-known-good entry stays in place
//! and nothing is surfaced to the user.

use taskdeck_model::{ProjectId, TaskRecord};

use crate::error::SyncError;
use crate::remote::Authority;

use super::SyncEngine;

impl<A: Authority + 'static> SyncEngine<A> {
    /// Refreshes a project's entry, unless a refresh for it is already
    /// in flight (in which case this call is dropped, not queued).
    pub async fn refresh(&self, project: &ProjectId) {
        if !self.inner.in_flight.begin(project) {
            tracing::debug!(%project, "refresh already in flight, dropping");
            return;
        }
        let result = self.refresh_fetch(project).await;
        self.inner.in_flight.finish(project);
        match result {
            Ok(count) => tracing::debug!(%project, tasks = count, "background refresh complete"),
            // Last-known-good stays valid for display; never surfaced.
            Err(error) => {
                tracing::warn!(%project, %error, "background refresh failed, keeping cached entry");
            }
        }
    }

    async fn refresh_fetch(&self, project: &ProjectId) -> Result<usize, SyncError> {
        let credential = self.credential()?;
        let tasks = self
            .guarded(
                self.inner.config.read_timeout,
                self.inner.authority.list_tasks(&credential, project),
            )
            .await?;
        let tasks: Vec<TaskRecord> = tasks.into_iter().map(Self::admit).collect();
        let count = tasks.len();
        self.inner.cache.put(project.clone(), tasks);
        Ok(count)
    }

    /// Detached variant for callers that must not suspend (cache hits,
    /// delete rollback).
    pub fn spawn_refresh(&self, project: ProjectId) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.refresh(&project).await;
        });
    }
}
