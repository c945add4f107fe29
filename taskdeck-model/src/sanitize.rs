//! Display-name sanitization for records arriving from the authority.
//!
//! The authority has a known data-quality defect: an assignee's display
//! name can leak an internal credential hash (recognizable by the bcrypt
//! `$2` marker). Every record is scrubbed before it enters the cache:
//! on initial load, on reconciliation after a mutation, and after a
//! background refresh. Scrubbing is idempotent and leaves clean records
//! untouched.

use crate::task::{TaskRecord, UserId};

/// Prefix that marks a leaked credential hash in a display-name field.
pub const LEAKED_HASH_PREFIX: &str = "$2";

/// How many leading characters of the user id go into the placeholder.
const PLACEHOLDER_ID_CHARS: usize = 8;

/// Rewrites any leaked display name to a generic placeholder derived
/// from the user's identity.
pub fn sanitize_record(record: &mut TaskRecord) {
    for assignee in &mut record.assignees {
        if let Some(name) = &assignee.user.name
            && name.starts_with(LEAKED_HASH_PREFIX)
        {
            assignee.user.name = Some(placeholder_name(&assignee.user.id));
        }
    }
}

/// `user-` plus a short prefix of the identity. Never starts with the
/// leaked-hash marker, which is what makes [`sanitize_record`] idempotent.
fn placeholder_name(id: &UserId) -> String {
    let prefix: String = id.as_str().chars().take(PLACEHOLDER_ID_CHARS).collect();
    format!("user-{prefix}")
}
