//! Remote authority abstraction.
//!
//! Defines the [`Authority`] trait the engine calls for every remote
//! operation. The wire transport is someone else's concern; an
//! implementation might speak HTTP to the real service, while
//! [`loopback::LoopbackAuthority`] serves tests and offline demos from
//! an in-process store.
//!
//! Timeouts are imposed by the engine with [`tokio::time::timeout`],
//! never by implementations.

pub mod loopback;

use std::fmt;
use std::future::Future;

use taskdeck_model::{ProjectId, ResourceDraft, TaskDraft, TaskId, TaskPatch, TaskRecord, UserId};

/// Bearer credential attached to every remote call.
///
/// Produced by the (external) authentication subsystem. The engine only
/// checks presence; validity is the authority's call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for implementations to put on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    /// Redacted; bearer tokens must not end up in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Errors an authority implementation can answer with.
///
/// Transport-level trouble collapses into [`AuthorityError::Network`];
/// the other variants are authoritative answers from the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// The entity does not exist (or no longer exists).
    #[error("not found")]
    NotFound,

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The payload failed server-side validation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The call failed below the application layer.
    #[error("network failure: {0}")]
    Network(String),
}

/// Async interface to the remote task authority.
///
/// One method per operation the engine performs. Every method receives
/// the bearer [`Credential`]; the engine guarantees it is present
/// before calling.
pub trait Authority: Send + Sync {
    /// Reads the ordered task list for a project.
    fn list_tasks(
        &self,
        credential: &Credential,
        project: &ProjectId,
    ) -> impl Future<Output = Result<Vec<TaskRecord>, AuthorityError>> + Send;

    /// Creates a task under a project; the authority issues the id and
    /// returns the canonical record.
    fn create_task(
        &self,
        credential: &Credential,
        project: &ProjectId,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;

    /// Applies a partial update and returns the canonical record.
    fn update_task(
        &self,
        credential: &Credential,
        task: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;

    /// Deletes a task. [`AuthorityError::NotFound`] is how "already
    /// gone" comes back; the engine reclassifies it as success.
    fn delete_task(
        &self,
        credential: &Credential,
        task: &TaskId,
    ) -> impl Future<Output = Result<(), AuthorityError>> + Send;

    /// Assigns (`true`) or unassigns (`false`) a user and returns the
    /// canonical record with the updated assignee list.
    fn set_assignment(
        &self,
        credential: &Credential,
        task: &TaskId,
        user: &UserId,
        assigned: bool,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;

    /// Marks a single assignee's share complete or incomplete and
    /// returns the canonical record.
    fn set_assignee_completion(
        &self,
        credential: &Credential,
        task: &TaskId,
        user: &UserId,
        completed: bool,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;

    /// Attaches a resource and returns the canonical record.
    fn add_resource(
        &self,
        credential: &Credential,
        task: &TaskId,
        draft: &ResourceDraft,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;

    /// Detaches a resource and returns the canonical record.
    fn remove_resource(
        &self,
        credential: &Credential,
        task: &TaskId,
        resource_id: &str,
    ) -> impl Future<Output = Result<TaskRecord, AuthorityError>> + Send;
}
