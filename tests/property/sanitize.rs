//! Property-based tests for display-name sanitization.
//!
//! Uses proptest to verify:
//! 1. Sanitization is idempotent: a second pass changes nothing.
//! 2. No leaked-hash marker survives a pass, whatever the input names.
//! 3. Names without the marker pass through byte-for-byte.
//! 4. Sanitization only ever touches display names, never identities,
//!    statuses, or any other field.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use proptest::prelude::*;

use taskdeck_model::sanitize::{LEAKED_HASH_PREFIX, sanitize_record};
use taskdeck_model::{
    Assignee, Priority, ProjectId, Tags, TaskId, TaskRecord, TaskStatus, UserId, UserRef,
};

// --- Strategies ---

/// Strategy for an arbitrary display name. Weighted so that leaked
/// hashes, clean names, and absent names all show up.
fn arb_display_name() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        2 => "[a-zA-Z0-9 ._-]{1,40}".prop_map(Some),
        2 => "[a-zA-Z0-9./$]{0,40}".prop_map(|tail| Some(format!("$2{tail}"))),
        1 => Just(None),
    ]
}

/// Strategy for an assignee with a random identity and display name.
fn arb_assignee() -> impl Strategy<Value = Assignee> {
    ("[a-z0-9-]{1,24}", arb_display_name()).prop_map(|(id, name)| Assignee {
        user: UserRef {
            id: UserId::new(id),
            name,
        },
        assigned_at: Utc::now(),
        completed: false,
        completed_at: None,
    })
}

/// Strategy for a record with up to eight assignees.
fn arb_record() -> impl Strategy<Value = TaskRecord> {
    prop::collection::vec(arb_assignee(), 0..8).prop_map(|assignees| TaskRecord {
        id: TaskId::new("t1"),
        project_id: ProjectId::new("p1"),
        title: "Task".to_string(),
        description: String::new(),
        status: TaskStatus::Pending,
        priority: Priority::Normal,
        tags: Tags::new(),
        deadline: None,
        assignees,
        resources: Vec::new(),
        updated_at: Utc::now(),
    })
}

// --- Properties ---

proptest! {
    /// Scrubbing an already-scrubbed record changes nothing.
    #[test]
    fn sanitize_is_idempotent(record in arb_record()) {
        let mut once = record;
        sanitize_record(&mut once);
        let mut twice = once.clone();
        sanitize_record(&mut twice);
        prop_assert_eq!(once, twice);
    }

    /// After one pass, no display name starts with the leaked marker.
    #[test]
    fn no_leaked_marker_survives(record in arb_record()) {
        let mut record = record;
        sanitize_record(&mut record);
        for assignee in &record.assignees {
            if let Some(name) = &assignee.user.name {
                prop_assert!(!name.starts_with(LEAKED_HASH_PREFIX));
            }
        }
    }

    /// Clean names are passed through untouched.
    #[test]
    fn clean_names_pass_through(record in arb_record()) {
        let before = record.clone();
        let mut record = record;
        sanitize_record(&mut record);
        for (seen, original) in record.assignees.iter().zip(&before.assignees) {
            if let Some(name) = &original.user.name
                && !name.starts_with(LEAKED_HASH_PREFIX)
            {
                prop_assert_eq!(&seen.user.name, &original.user.name);
            }
        }
    }

    /// Everything except display names is left alone.
    #[test]
    fn only_display_names_change(record in arb_record()) {
        let before = record.clone();
        let mut record = record;
        sanitize_record(&mut record);
        prop_assert_eq!(&record.id, &before.id);
        prop_assert_eq!(record.status, before.status);
        prop_assert_eq!(record.updated_at, before.updated_at);
        prop_assert_eq!(record.assignees.len(), before.assignees.len());
        for (seen, original) in record.assignees.iter().zip(&before.assignees) {
            prop_assert_eq!(&seen.user.id, &original.user.id);
            prop_assert_eq!(seen.completed, original.completed);
            prop_assert_eq!(seen.assigned_at, original.assigned_at);
        }
    }
}
