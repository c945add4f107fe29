//! Integration tests for assignment and the assignee-completion
//! cascade: the task only flips to done off a confirmed completion,
//! and a zero-assignee confirmation falls back to a background refresh.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;

use taskdeck_model::{
    Assignee, Priority, ProjectId, ResourceDraft, ResourceKind, Tags, TaskDraft, TaskId,
    TaskPatch, TaskRecord, TaskStatus, UserId, UserRef,
};
use taskdeck_sync::remote::loopback::LoopbackAuthority;
use taskdeck_sync::{
    Authority, AuthorityError, Credential, SyncConfig, SyncEngine, SyncError, SyncEvent,
};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn make_engine(authority: &LoopbackAuthority) -> SyncEngine<LoopbackAuthority> {
    let engine = SyncEngine::new(authority.clone(), SyncConfig::default());
    engine.set_credential(Some(Credential::new("bearer-abc")));
    engine
}

/// Task with the given per-user completion flags.
fn make_record_with_assignees(
    id: &str,
    project: &str,
    status: TaskStatus,
    assignees: &[(&str, bool)],
) -> TaskRecord {
    let now = Utc::now();
    TaskRecord {
        id: TaskId::new(id),
        project_id: ProjectId::new(project),
        title: format!("Task {id}"),
        description: String::new(),
        status,
        priority: Priority::Normal,
        tags: Tags::new(),
        deadline: None,
        assignees: assignees
            .iter()
            .map(|(user, completed)| Assignee {
                user: UserRef::bare(*user),
                assigned_at: now,
                completed: *completed,
                completed_at: completed.then_some(now),
            })
            .collect(),
        resources: Vec::new(),
        updated_at: now,
    }
}

fn project(id: &str) -> ProjectId {
    ProjectId::new(id)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assign_user_is_optimistic_and_confirmed() {
    let authority = LoopbackAuthority::new();
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();
    let created = engine
        .add_task(&project("p1"), TaskDraft::new("T"))
        .await
        .unwrap();

    let record = engine
        .assign_user(&created.id, &UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(record.assignees.len(), 1);
    assert_eq!(record.assignees[0].user.id, UserId::new("u1"));
    assert!(!record.assignees[0].completed);
}

#[tokio::test]
async fn unassign_user_removes_the_entry() {
    let authority = LoopbackAuthority::new();
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();
    let created = engine
        .add_task(&project("p1"), TaskDraft::new("T"))
        .await
        .unwrap();
    engine
        .assign_user(&created.id, &UserId::new("u1"))
        .await
        .unwrap();

    let record = engine
        .unassign_user(&created.id, &UserId::new("u1"))
        .await
        .unwrap();
    assert!(record.assignees.is_empty());
}

// ---------------------------------------------------------------------------
// Completion cascade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completing_the_last_assignee_cascades_to_done() {
    let authority = LoopbackAuthority::new();
    authority.seed_project(
        project("p1"),
        vec![make_record_with_assignees(
            "t1",
            "p1",
            TaskStatus::Active,
            &[("ua", false), ("ub", true)],
        )],
    );
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();

    let record = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), true)
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Done);
    assert!(record.all_assignees_completed());

    // Both sides agree.
    assert_eq!(
        authority
            .task(&project("p1"), &TaskId::new("t1"))
            .unwrap()
            .status,
        TaskStatus::Done
    );
    assert_eq!(
        engine.peek(&project("p1")).unwrap()[0].status,
        TaskStatus::Done
    );
}

#[tokio::test]
async fn completion_with_outstanding_assignees_does_not_cascade() {
    let authority = LoopbackAuthority::new();
    authority.seed_project(
        project("p1"),
        vec![make_record_with_assignees(
            "t1",
            "p1",
            TaskStatus::Active,
            &[("ua", false), ("ub", false)],
        )],
    );
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();

    let record = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), true)
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Active);
}

#[tokio::test]
async fn rejected_completion_never_cascades() {
    let authority = LoopbackAuthority::new();
    authority.seed_project(
        project("p1"),
        vec![make_record_with_assignees(
            "t1",
            "p1",
            TaskStatus::Active,
            &[("ua", false), ("ub", true)],
        )],
    );
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();

    authority.fail_next(AuthorityError::Rejected("completion locked".to_string()));
    let err = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Rejected(_)));

    // Status untouched everywhere: no cascade off an unconfirmed write.
    assert_eq!(
        engine.peek(&project("p1")).unwrap()[0].status,
        TaskStatus::Active
    );
    assert_eq!(
        authority
            .task(&project("p1"), &TaskId::new("t1"))
            .unwrap()
            .status,
        TaskStatus::Active
    );
}

#[tokio::test]
async fn cascade_announces_the_project_as_stale() {
    let authority = LoopbackAuthority::new();
    authority.seed_project(
        project("p1"),
        vec![make_record_with_assignees(
            "t1",
            "p1",
            TaskStatus::Active,
            &[("ua", false)],
        )],
    );
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();
    let mut events = engine.subscribe();

    let record = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), true)
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Done);

    // The cascade goes through the board path, so a project-list view
    // hears about the move like any other.
    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("an event within the window")
        .unwrap();
    assert_eq!(
        event,
        SyncEvent::ProjectStale {
            project: project("p1")
        }
    );
}

#[tokio::test]
async fn uncompleting_an_assignee_never_cascades() {
    let authority = LoopbackAuthority::new();
    authority.seed_project(
        project("p1"),
        vec![make_record_with_assignees(
            "t1",
            "p1",
            TaskStatus::Active,
            &[("ua", true), ("ub", true)],
        )],
    );
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();

    let record = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), false)
        .await
        .unwrap();
    assert_eq!(record.status, TaskStatus::Active);
}

// ---------------------------------------------------------------------------
// Zero-assignee confirmation falls back to a refresh
// ---------------------------------------------------------------------------

/// Authority whose completion confirmation comes back with an empty
/// assignee list (the entry vanished server-side between the gesture
/// and the confirmation).
#[derive(Clone)]
struct VanishingAssigneeAuthority {
    record: TaskRecord,
    reads: Arc<AtomicU64>,
}

impl Authority for VanishingAssigneeAuthority {
    async fn list_tasks(
        &self,
        _credential: &Credential,
        _project: &ProjectId,
    ) -> Result<Vec<TaskRecord>, AuthorityError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.record.clone()])
    }

    async fn create_task(
        &self,
        _credential: &Credential,
        _project: &ProjectId,
        _draft: &TaskDraft,
    ) -> Result<TaskRecord, AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }

    async fn update_task(
        &self,
        _credential: &Credential,
        _task: &TaskId,
        _patch: &TaskPatch,
    ) -> Result<TaskRecord, AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }

    async fn delete_task(
        &self,
        _credential: &Credential,
        _task: &TaskId,
    ) -> Result<(), AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }

    async fn set_assignment(
        &self,
        _credential: &Credential,
        _task: &TaskId,
        _user: &UserId,
        _assigned: bool,
    ) -> Result<TaskRecord, AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }

    async fn set_assignee_completion(
        &self,
        _credential: &Credential,
        _task: &TaskId,
        _user: &UserId,
        _completed: bool,
    ) -> Result<TaskRecord, AuthorityError> {
        let mut record = self.record.clone();
        record.assignees.clear();
        Ok(record)
    }

    async fn add_resource(
        &self,
        _credential: &Credential,
        _task: &TaskId,
        _draft: &ResourceDraft,
    ) -> Result<TaskRecord, AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }

    async fn remove_resource(
        &self,
        _credential: &Credential,
        _task: &TaskId,
        _resource_id: &str,
    ) -> Result<TaskRecord, AuthorityError> {
        Err(AuthorityError::Rejected("unused".to_string()))
    }
}

#[tokio::test]
async fn zero_assignee_confirmation_triggers_a_refresh_not_a_cascade() {
    let record =
        make_record_with_assignees("t1", "p1", TaskStatus::Active, &[("ua", false)]);
    let reads = Arc::new(AtomicU64::new(0));
    let authority = VanishingAssigneeAuthority {
        record,
        reads: Arc::clone(&reads),
    };
    let engine = SyncEngine::new(authority, SyncConfig::default());
    engine.set_credential(Some(Credential::new("bearer-abc")));
    engine.load_tasks(&project("p1")).await.unwrap();
    let reads_after_load = reads.load(Ordering::SeqCst);

    let confirmed = engine
        .set_assignee_completion(&TaskId::new("t1"), &UserId::new("ua"), true)
        .await
        .unwrap();
    assert!(confirmed.assignees.is_empty());
    // Nothing to aggregate, so the status is untouched...
    assert_ne!(confirmed.status, TaskStatus::Done);

    // ...and the project gets re-fetched in the background instead.
    settle().await;
    assert_eq!(reads.load(Ordering::SeqCst), reads_after_load + 1);
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_and_remove_resource_round_trip() {
    let authority = LoopbackAuthority::new();
    let engine = make_engine(&authority);
    engine.load_tasks(&project("p1")).await.unwrap();
    let created = engine
        .add_task(&project("p1"), TaskDraft::new("T"))
        .await
        .unwrap();

    let draft = ResourceDraft {
        kind: ResourceKind::Link,
        url: "https://example.com/notes".to_string(),
        description: Some("background reading".to_string()),
        added_by: UserId::new("u1"),
    };
    let record = engine.add_resource(&created.id, draft).await.unwrap();
    assert_eq!(record.resources.len(), 1);
    // The canonical record carries the authority-issued resource id.
    let resource = record.resource("r1").expect("authority-issued id");
    assert_eq!(resource.url, "https://example.com/notes");

    let record = engine.remove_resource(&created.id, "r1").await.unwrap();
    assert!(record.resource("r1").is_none());
    assert!(record.resources.is_empty());
}
