//! Assignment, assignee completion (with its status cascade), and
//! resources.
//!
//! The cascade is deliberately two-phase: the task only flips to done
//! off the authority-confirmed assignee list, never off an unconfirmed
//! local write, otherwise a rejected completion could leave a task
//! spuriously done.

use chrono::Utc;

use taskdeck_model::{
    ResourceDraft, TaskId, TaskRecord, TaskStatus, UserId, UserRef,
};

use crate::error::SyncError;
use crate::remote::Authority;

use super::SyncEngine;

impl<A: Authority + 'static> SyncEngine<A> {
    /// Assigns a user to a task, optimistically and then confirmed.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; also pushed to the error observable.
    pub async fn assign_user(
        &self,
        task: &TaskId,
        user: &UserId,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.set_assignment_inner(task, user, true).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    /// Removes a user's assignment, optimistically and then confirmed.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; also pushed to the error observable.
    pub async fn unassign_user(
        &self,
        task: &TaskId,
        user: &UserId,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.set_assignment_inner(task, user, false).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn set_assignment_inner(
        &self,
        task: &TaskId,
        user: &UserId,
        assigned: bool,
    ) -> Result<TaskRecord, SyncError> {
        task.validate()?;
        user.validate()?;
        let credential = self.credential()?;

        let now = Utc::now();
        self.inner.cache.with_task_mut(task, |record| {
            if assigned {
                record.add_assignee(UserRef::bare(user.as_str()), now);
            } else {
                record.remove_assignee(user);
            }
            record.updated_at = now;
        });

        let record = self
            .guarded(
                self.inner.config.update_timeout,
                self.inner
                    .authority
                    .set_assignment(&credential, task, user, assigned),
            )
            .await?;
        Ok(self.reconcile(record))
    }

    /// Marks one assignee's share complete (or not), then cascades:
    /// once the authority confirms and every assignee of the canonical
    /// record is complete, the task itself is moved to done. A task
    /// with zero assignees has nothing to aggregate, so a background
    /// refresh of its project is scheduled instead, since other parties may
    /// have changed the project state.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]. If the confirmation fails, no cascade runs
    /// and the task's status is untouched.
    pub async fn set_assignee_completion(
        &self,
        task: &TaskId,
        user: &UserId,
        completed: bool,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.set_completion_inner(task, user, completed).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn set_completion_inner(
        &self,
        task: &TaskId,
        user: &UserId,
        completed: bool,
    ) -> Result<TaskRecord, SyncError> {
        task.validate()?;
        user.validate()?;
        let credential = self.credential()?;

        let now = Utc::now();
        self.inner.cache.with_task_mut(task, |record| {
            if let Some(assignee) = record.assignee_mut(user) {
                assignee.completed = completed;
                assignee.completed_at = completed.then_some(now);
            }
            record.updated_at = now;
        });

        let record = self
            .guarded(
                self.inner.config.update_timeout,
                self.inner
                    .authority
                    .set_assignee_completion(&credential, task, user, completed),
            )
            .await?;
        let record = self.reconcile(record);

        // Cascade strictly off the confirmed record.
        if record.assignees.is_empty() {
            self.spawn_refresh(record.project_id.clone());
            return Ok(record);
        }
        if completed && record.all_assignees_completed() && record.status != TaskStatus::Done {
            tracing::debug!(%task, "last assignee completed, cascading status to done");
            // Through the board path, so subscribers hear the move.
            if let Some(updated) = self.set_status(task, TaskStatus::Done).await? {
                return Ok(updated);
            }
        }
        Ok(record)
    }

    /// Attaches a resource, optimistically (with a provisional id) and
    /// then confirmed.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; also pushed to the error observable.
    pub async fn add_resource(
        &self,
        task: &TaskId,
        draft: ResourceDraft,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.add_resource_inner(task, draft).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn add_resource_inner(
        &self,
        task: &TaskId,
        draft: ResourceDraft,
    ) -> Result<TaskRecord, SyncError> {
        task.validate()?;
        let credential = self.credential()?;

        let now = Utc::now();
        self.inner.cache.with_task_mut(task, |record| {
            record.resources.push(draft.provisional(now));
            record.updated_at = now;
        });

        let record = self
            .guarded(
                self.inner.config.update_timeout,
                self.inner.authority.add_resource(&credential, task, &draft),
            )
            .await?;
        Ok(self.reconcile(record))
    }

    /// Detaches a resource, optimistically and then confirmed.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`]; also pushed to the error observable.
    pub async fn remove_resource(
        &self,
        task: &TaskId,
        resource_id: &str,
    ) -> Result<TaskRecord, SyncError> {
        let result = self.remove_resource_inner(task, resource_id).await;
        if let Err(error) = &result {
            self.report(error);
        }
        result
    }

    async fn remove_resource_inner(
        &self,
        task: &TaskId,
        resource_id: &str,
    ) -> Result<TaskRecord, SyncError> {
        task.validate()?;
        let credential = self.credential()?;

        let now = Utc::now();
        self.inner.cache.with_task_mut(task, |record| {
            record.resources.retain(|r| r.id != resource_id);
            record.updated_at = now;
        });

        let record = self
            .guarded(
                self.inner.config.update_timeout,
                self.inner
                    .authority
                    .remove_resource(&credential, task, resource_id),
            )
            .await?;
        Ok(self.reconcile(record))
    }
}
