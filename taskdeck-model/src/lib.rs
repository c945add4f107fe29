//! Task record model for Taskdeck.
//!
//! Pure entity layer shared by the synchronization engine and any
//! embedding application: identifiers, the [`task::TaskRecord`] shape as
//! the remote authority serves it, draft validation, partial-update
//! patches, and the display-name sanitizer applied to every record
//! before it enters the cache.

pub mod sanitize;
pub mod task;

pub use task::{
    Assignee, MAX_TASK_TITLE_LENGTH, Priority, ProjectId, Resource, ResourceDraft, ResourceKind,
    Tags, TaskDraft, TaskId, TaskPatch, TaskRecord, TaskStatus, UserId, UserRef, ValidationError,
};
