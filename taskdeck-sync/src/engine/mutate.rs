//! Optimistic mutation: update, create, delete.
//!
//! Updates apply to the cache synchronously before the remote call is
//! issued, so every reader observes the new value immediately. What
//! happens on failure depends on the error class: Transient failures
//! keep the optimistic value (the UI should not flicker back when the
//! terminal outcome is unknown), Authoritative rejects are surfaced for
//! the caller to reconcile. Deletion is fire-and-forget: the caller
//! gets success as soon as the local removal applies, and a later
//! disproof re-inserts the record and schedules a healing refresh.

use chrono::Utc;

use taskdeck_model::{ProjectId, TaskDraft, TaskId, TaskPatch, TaskRecord};

use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::remote::{Authority, AuthorityError, Credential};

use super::SyncEngine;

impl<A: Authority + 'static> SyncEngine<A> {
    /// Applies a partial update optimistically, then confirms it with
    /// the authority and reconciles the cache with the canonical record.
    /// A patch that touches nothing is a local no-op, like a
    /// same-column board move: the cached record comes back unchanged
    /// and no remote call is issued.
    ///
    /// # Errors
    ///
    /// Transient failures ([`SyncError::Timeout`], [`SyncError::Network`])
    /// leave the optimistic value in place; Authoritative rejects leave
    /// reconciliation to the caller. Either way the failure lands on the
    /// error observable.
    pub async fn update_task(
        &self,
        task: &TaskId,
        patch: TaskPatch,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.update_task_inner(task, patch).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn update_task_inner(
        &self,
        task: &TaskId,
        patch: TaskPatch,
    ) -> Result<TaskRecord, SyncError> {
        task.validate()?;
        if patch.is_empty()
            && let Some((_, current)) = self.inner.cache.find_task(task)
        {
            return Ok(current);
        }
        let credential = self.credential()?;

        // Visible to all readers strictly before the remote call.
        if let Some((project, _)) = self.inner.cache.find_task(task) {
            self.inner.cache.patch(&project, task, &patch, Utc::now());
        }

        let record = self
            .guarded(
                self.inner.config.update_timeout,
                self.inner.authority.update_task(&credential, task, &patch),
            )
            .await?;
        Ok(self.reconcile(record))
    }

    /// Creates a task under a project. No optimistic record is added, as
    /// no id exists until the authority issues one. On success the
    /// canonical record is appended for immediate display, the entry is
    /// marked stale so the next read re-fetches (creation can have
    /// server-side effects the client cannot predict), and a
    /// [`SyncEvent::ProjectStale`] is published.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; drafts are validated locally first.
    pub async fn add_task(
        &self,
        project: &ProjectId,
        draft: TaskDraft,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.add_task_inner(project, draft).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn add_task_inner(
        &self,
        project: &ProjectId,
        draft: TaskDraft,
    ) -> Result<TaskRecord, SyncError> {
        project.validate()?;
        draft.validate()?;
        let credential = self.credential()?;

        let record = self
            .guarded(
                self.inner.config.create_timeout,
                self.inner
                    .authority
                    .create_task(&credential, project, &draft),
            )
            .await?;
        let record = Self::admit(record);
        self.inner.cache.append(project, record.clone());
        self.inner.cache.expire(project);
        self.publish(SyncEvent::ProjectStale {
            project: project.clone(),
        });
        tracing::debug!(task = %record.id, %project, "task created, entry marked for re-fetch");
        Ok(record)
    }

    /// Removes the task from the cache immediately and issues the
    /// remote delete in the background. Success is reported as soon as
    /// the local removal applies.
    ///
    /// "Already gone" from the authority counts as success (idempotent
    /// delete). Any other remote failure silently restores the record
    /// and schedules a background refresh so the UI self-heals.
    ///
    /// # Errors
    ///
    /// Only Precondition failures (malformed id, missing credential);
    /// nothing is removed in that case.
    pub fn delete_task(&self, task: &TaskId) -> Result<(), SyncError> {
        let result = self.delete_task_inner(task);
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    fn delete_task_inner(&self, task: &TaskId) -> Result<(), SyncError> {
        task.validate()?;
        let credential = self.credential()?;

        let removed = self.inner.cache.remove_task(task);
        let engine = self.clone();
        let task = task.clone();
        tokio::spawn(async move {
            engine.finish_delete(credential, task, removed).await;
        });
        Ok(())
    }

    async fn finish_delete(
        &self,
        credential: Credential,
        task: TaskId,
        removed: Option<(ProjectId, TaskRecord)>,
    ) {
        // No timeout and no retry; the rollback below is the only recovery.
        match self.inner.authority.delete_task(&credential, &task).await {
            Ok(()) => tracing::debug!(%task, "delete confirmed"),
            Err(AuthorityError::NotFound) => {
                tracing::debug!(%task, "already gone, delete treated as success");
            }
            Err(error) => {
                tracing::info!(%task, %error, "remote delete failed, restoring record");
                if let Some((project, record)) = removed {
                    self.inner.cache.restore_task(&project, record);
                    self.publish(SyncEvent::ProjectStale {
                        project: project.clone(),
                    });
                    self.spawn_refresh(project);
                }
            }
        }
    }
}
