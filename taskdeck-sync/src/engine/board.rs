//! Kanban board moves.
//!
//! Two trigger sources share one path: an explicit menu selection of a
//! target status, and a drag-and-drop gesture whose target must first
//! be resolved. A drop onto a column uses the column directly; a drop
//! onto another task adopts that task's current column; anything else
//! aborts with no mutation. The board itself imposes no sequencing:
//! any column may move to any other, and the authority's permission
//! check has the final say.

use taskdeck_model::{TaskId, TaskPatch, TaskRecord, TaskStatus};

use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::remote::Authority;

use super::SyncEngine;

/// Where a drag gesture ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped onto a column header or empty column area.
    Column(TaskStatus),
    /// Dropped onto another task's card.
    Task(TaskId),
    /// The gesture did not resolve to anything actionable.
    Unresolved,
}

impl<A: Authority + 'static> SyncEngine<A> {
    /// Resolves a drop target to a concrete status, if possible.
    #[must_use]
    pub fn resolve_drop(&self, target: &DropTarget) -> Option<TaskStatus> {
        match target {
            DropTarget::Column(status) => Some(*status),
            DropTarget::Task(other) => self
                .inner
                .cache
                .find_task(other)
                .map(|(_, record)| record.status),
            DropTarget::Unresolved => None,
        }
    }

    /// Handles a drag-and-drop gesture. Returns `Ok(None)` when the
    /// move aborts (unresolvable target) or is a no-op (same column).
    ///
    /// # Errors
    ///
    /// Any [`SyncError`] from the underlying update.
    pub async fn move_task(
        &self,
        task: &TaskId,
        target: DropTarget,
    ) -> Result<Option<TaskRecord>, SyncError> {
        let Some(status) = self.resolve_drop(&target) else {
            tracing::debug!(%task, "drop target did not resolve, aborting move");
            return Ok(None);
        };
        self.set_status(task, status).await
    }

    /// Moves a task to the given column (menu-driven path). Returns
    /// `Ok(None)` when the task is already there.
    ///
    /// # Errors
    ///
    /// Any [`SyncError`] from the underlying update.
    pub async fn set_status(
        &self,
        task: &TaskId,
        target: TaskStatus,
    ) -> Result<Option<TaskRecord>, SyncError> {
        if let Some((_, current)) = self.inner.cache.find_task(task)
            && current.status == target
        {
            return Ok(None);
        }
        let record = self
            .update_task(task, TaskPatch::status_change(target))
            .await?;
        self.publish(SyncEvent::ProjectStale {
            project: record.project_id.clone(),
        });
        Ok(Some(record))
    }
}
