//! Task entities as exchanged with the remote authority.
//!
//! All record shapes serialize camelCase to match the authority's JSON.
//! Identifiers are opaque strings issued by the authority; the client
//! never fabricates a task or project id (a task without a server-issued
//! id exists only as a pending [`TaskDraft`], never in the cache).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Errors raised by local validation, before any remote call is issued.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// An identifier was empty or whitespace-only.
    #[error("malformed identifier: {0:?}")]
    MalformedId(String),
}

/// Opaque task identifier, stable across cache and remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an authority-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks that the identifier is non-empty, rejecting it locally
    /// before a remote call is wasted on it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedId`] for empty or
    /// whitespace-only identifiers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.0)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the project owning a task list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wraps an authority-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects empty or whitespace-only identifiers locally.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedId`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.0)
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wraps an authority-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects empty or whitespace-only identifiers locally.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedId`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MalformedId(id.to_string()));
    }
    Ok(())
}

/// Kanban column a task sits in. Exactly one at any time.
///
/// The board imposes no sequencing constraint: any column can move to
/// any other, subject only to the remote authority's permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not started.
    Pending,
    /// Actively being worked on.
    Active,
    /// Completed.
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Needs attention first.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Task tags: insertion order is preserved for display and
/// serialization, but equality compares as a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Creates an empty tag list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a tag unless an identical one is already present.
    pub fn insert(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    /// Whether the given tag is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Tags in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Tags {
    fn eq(&self, other: &Self) -> bool {
        let a: std::collections::BTreeSet<&str> = self.0.iter().map(String::as_str).collect();
        let b: std::collections::BTreeSet<&str> = other.0.iter().map(String::as_str).collect();
        a == b
    }
}

impl Eq for Tags {}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        let mut out = Self::new();
        for tag in tags {
            out.insert(tag);
        }
        out
    }
}

impl FromIterator<String> for Tags {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut out = Self::new();
        for tag in iter {
            out.insert(tag);
        }
        out
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Reference to a user as embedded in task records.
///
/// The authority is supposed to deliver `{ "id": ..., "name": ... }`,
/// but some records arrive with a bare identity string in place of the
/// object. Deserialization accepts both shapes and normalizes the bare
/// string to a nameless reference, so a single malformed field never
/// drops an otherwise-valid task from view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRefWire")]
pub struct UserRef {
    /// Opaque user identity.
    pub id: UserId,
    /// Display name, when the authority supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRef {
    /// Reference by id alone, without a display name.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: None,
        }
    }

    /// Reference with a display name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: Some(name.into()),
        }
    }
}

/// Accepts both the object shape and the degenerate bare-string shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserRefWire {
    Full {
        id: UserId,
        #[serde(default)]
        name: Option<String>,
    },
    Bare(String),
}

impl From<UserRefWire> for UserRef {
    fn from(wire: UserRefWire) -> Self {
        match wire {
            UserRefWire::Full { id, name } => Self { id, name },
            UserRefWire::Bare(id) => Self {
                id: UserId::new(id),
                name: None,
            },
        }
    }
}

/// Per-user assignment entry on a task. Unique by user identity
/// within a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    /// Who is assigned.
    pub user: UserRef,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
    /// Whether this assignee has completed their share.
    #[serde(default)]
    pub completed: bool,
    /// When the assignee completed, if they have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignee {
    /// Fresh, not-yet-completed assignment of the given user.
    #[must_use]
    pub const fn new(user: UserRef, assigned_at: DateTime<Utc>) -> Self {
        Self {
            user,
            assigned_at,
            completed: false,
            completed_at: None,
        }
    }
}

/// What kind of attachment a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// External hyperlink.
    Link,
    /// Uploaded file (handled elsewhere; only the URL is carried here).
    File,
}

/// An attachment on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource identifier.
    pub id: String,
    /// Link or file.
    pub kind: ResourceKind,
    /// Where the resource lives.
    pub url: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Who attached it.
    pub added_by: UserId,
    /// When it was attached.
    pub added_at: DateTime<Utc>,
}

/// Fields needed to attach a resource; the authority returns the
/// canonical [`Resource`] with its own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    /// Link or file.
    pub kind: ResourceKind,
    /// Where the resource lives.
    pub url: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Who is attaching it.
    pub added_by: UserId,
}

impl ResourceDraft {
    /// Materializes a provisional resource for optimistic display.
    ///
    /// The id is a locally-minted UUID v7 placeholder; reconciliation
    /// with the authority's canonical record replaces it.
    #[must_use]
    pub fn provisional(&self, now: DateTime<Utc>) -> Resource {
        Resource {
            id: Uuid::now_v7().to_string(),
            kind: self.kind,
            url: self.url.clone(),
            description: self.description.clone(),
            added_by: self.added_by.clone(),
            added_at: now,
        }
    }
}

/// A task as cached client-side and served by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Authority-issued identifier, immutable once issued.
    pub id: TaskId,
    /// Owning project. A record belongs to exactly one project for its
    /// lifetime in the cache.
    pub project_id: ProjectId,
    /// Title, free text.
    pub title: String,
    /// Description, free text.
    #[serde(default)]
    pub description: String,
    /// Kanban column.
    pub status: TaskStatus,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Tags. Set semantics for equality, ordered for display.
    #[serde(default)]
    pub tags: Tags,
    /// Optional deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Assignment entries, unique by user identity.
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    /// Attachments, in addition order.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Last mutation time (local optimistic or server-confirmed).
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// The assignment entry for the given user, if present.
    #[must_use]
    pub fn assignee(&self, user: &UserId) -> Option<&Assignee> {
        self.assignees.iter().find(|a| a.user.id == *user)
    }

    /// Mutable access to the assignment entry for the given user.
    pub fn assignee_mut(&mut self, user: &UserId) -> Option<&mut Assignee> {
        self.assignees.iter_mut().find(|a| a.user.id == *user)
    }

    /// Adds an assignment unless the user already has one.
    ///
    /// Returns `false` (and leaves the record untouched) when the user
    /// is already assigned, keeping entries unique by user identity.
    pub fn add_assignee(&mut self, user: UserRef, assigned_at: DateTime<Utc>) -> bool {
        if self.assignee(&user.id).is_some() {
            return false;
        }
        self.assignees.push(Assignee::new(user, assigned_at));
        true
    }

    /// Removes the assignment for the given user. Returns whether an
    /// entry was removed.
    pub fn remove_assignee(&mut self, user: &UserId) -> bool {
        let before = self.assignees.len();
        self.assignees.retain(|a| a.user.id != *user);
        self.assignees.len() != before
    }

    /// Whether every assignment entry is completed.
    ///
    /// Vacuously true for a task with no assignees; callers that care
    /// about the zero-assignee case must check [`Vec::is_empty`] first.
    #[must_use]
    pub fn all_assignees_completed(&self) -> bool {
        self.assignees.iter().all(|a| a.completed)
    }

    /// The resource with the given id, if present.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Fields for creating a task. No record is materialized client-side
/// from a draft: the cache only ever holds authority-issued records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Title, required.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Tags.
    #[serde(default)]
    pub tags: Tags,
    /// Optional deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// Draft with the given title and defaults elsewhere.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validates the draft locally, before any remote call.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] or
    /// [`ValidationError::TitleTooLong`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        if self.title.chars().count() > MAX_TASK_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong);
        }
        Ok(())
    }
}

/// Partial update to a task. Unset fields are left untouched.
///
/// `deadline` is doubly optional so that clearing a deadline
/// (`Some(None)`, serialized as `null`) is distinguishable from not
/// touching it (`None`, omitted from the wire).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    /// New deadline, or `Some(None)` to clear it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    /// Patch that only moves the task to the given status.
    #[must_use]
    pub fn status_change(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether the patch touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.deadline.is_none()
    }

    /// Merges the patch into a record. Does not touch `updated_at`;
    /// the caller decides what "now" is.
    pub fn apply(&self, record: &mut TaskRecord) {
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            record.description.clone_from(description);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(deadline) = self.deadline {
            record.deadline = deadline;
        }
    }
}
