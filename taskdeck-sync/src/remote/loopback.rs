//! Loopback authority for testing.
//!
//! Serves the [`Authority`] contract from an in-process store. Besides
//! the happy path it offers the knobs tests need: per-operation call
//! counters, single-shot fault injection, and an artificial response
//! delay for exercising the engine's timeouts under a paused clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use taskdeck_model::{
    ProjectId, ResourceDraft, TaskDraft, TaskId, TaskPatch, TaskRecord, TaskStatus, UserId,
    UserRef,
};

use super::{Authority, AuthorityError, Credential};

/// Number of calls the authority has served, by operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `list_tasks` calls.
    pub reads: u64,
    /// `create_task` calls.
    pub creates: u64,
    /// Partial updates, assignment and completion changes, resources.
    pub updates: u64,
    /// `delete_task` calls.
    pub deletes: u64,
}

#[derive(Default)]
struct State {
    projects: HashMap<ProjectId, Vec<TaskRecord>>,
    next_task: u64,
    next_resource: u64,
    counts: CallCounts,
    fail_next: Option<AuthorityError>,
    delay: Option<Duration>,
}

/// In-process authority backed by a mutexed store.
///
/// Clones share the same store, so a clone handed to the engine stays
/// inspectable from the test body.
#[derive(Clone, Default)]
pub struct LoopbackAuthority {
    state: Arc<Mutex<State>>,
}

impl LoopbackAuthority {
    /// Empty authority.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds (or replaces) a project's task list.
    pub fn seed_project(&self, project: ProjectId, tasks: Vec<TaskRecord>) {
        self.state.lock().projects.insert(project, tasks);
    }

    /// A copy of the stored record, if any.
    #[must_use]
    pub fn task(&self, project: &ProjectId, task: &TaskId) -> Option<TaskRecord> {
        let state = self.state.lock();
        state
            .projects
            .get(project)?
            .iter()
            .find(|t| t.id == *task)
            .cloned()
    }

    /// Calls served so far.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.state.lock().counts
    }

    /// Makes the next call (only) fail with the given error.
    pub fn fail_next(&self, error: AuthorityError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Delays every response by the given duration (`None` to clear).
    /// With a paused tokio clock this is how tests trip the engine's
    /// per-operation timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Every call suspends at least once, so concurrent callers
    /// interleave the way they would across a real wire.
    async fn pace(&self) {
        let delay = self.state.lock().delay;
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }

    fn take_injected_failure(&self) -> Option<AuthorityError> {
        self.state.lock().fail_next.take()
    }

    fn find_mut<'a>(
        state: &'a mut State,
        task: &TaskId,
    ) -> Result<&'a mut TaskRecord, AuthorityError> {
        state
            .projects
            .values_mut()
            .flatten()
            .find(|t| t.id == *task)
            .ok_or(AuthorityError::NotFound)
    }
}

impl Authority for LoopbackAuthority {
    async fn list_tasks(
        &self,
        _credential: &Credential,
        project: &ProjectId,
    ) -> Result<Vec<TaskRecord>, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.reads += 1;
        Ok(state.projects.get(project).cloned().unwrap_or_default())
    }

    async fn create_task(
        &self,
        _credential: &Credential,
        project: &ProjectId,
        draft: &TaskDraft,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.creates += 1;
        state.next_task += 1;
        let record = TaskRecord {
            id: TaskId::new(format!("t{}", state.next_task)),
            project_id: project.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: TaskStatus::Pending,
            priority: draft.priority,
            tags: draft.tags.clone(),
            deadline: draft.deadline,
            assignees: Vec::new(),
            resources: Vec::new(),
            updated_at: Utc::now(),
        };
        state
            .projects
            .entry(project.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update_task(
        &self,
        _credential: &Credential,
        task: &TaskId,
        patch: &TaskPatch,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.updates += 1;
        let record = Self::find_mut(&mut state, task)?;
        patch.apply(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_task(
        &self,
        _credential: &Credential,
        task: &TaskId,
    ) -> Result<(), AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.deletes += 1;
        for tasks in state.projects.values_mut() {
            if let Some(pos) = tasks.iter().position(|t| t.id == *task) {
                tasks.remove(pos);
                return Ok(());
            }
        }
        Err(AuthorityError::NotFound)
    }

    async fn set_assignment(
        &self,
        _credential: &Credential,
        task: &TaskId,
        user: &UserId,
        assigned: bool,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.updates += 1;
        let record = Self::find_mut(&mut state, task)?;
        if assigned {
            record.add_assignee(UserRef::bare(user.as_str()), Utc::now());
        } else {
            record.remove_assignee(user);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_assignee_completion(
        &self,
        _credential: &Credential,
        task: &TaskId,
        user: &UserId,
        completed: bool,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.updates += 1;
        let record = Self::find_mut(&mut state, task)?;
        let Some(assignee) = record.assignee_mut(user) else {
            return Err(AuthorityError::Rejected(format!(
                "user {user} is not assigned"
            )));
        };
        assignee.completed = completed;
        assignee.completed_at = completed.then(Utc::now);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn add_resource(
        &self,
        _credential: &Credential,
        task: &TaskId,
        draft: &ResourceDraft,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.updates += 1;
        state.next_resource += 1;
        let id = format!("r{}", state.next_resource);
        let record = Self::find_mut(&mut state, task)?;
        let mut resource = draft.provisional(Utc::now());
        resource.id = id;
        record.resources.push(resource);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn remove_resource(
        &self,
        _credential: &Credential,
        task: &TaskId,
        resource_id: &str,
    ) -> Result<TaskRecord, AuthorityError> {
        self.pace().await;
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut state = self.state.lock();
        state.counts.updates += 1;
        let record = Self::find_mut(&mut state, task)?;
        let before = record.resources.len();
        record.resources.retain(|r| r.id != resource_id);
        if record.resources.len() == before {
            return Err(AuthorityError::NotFound);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
