//! Taskdeck synchronization engine.
//!
//! Keeps a per-project cache of task records usable while a remote
//! authority remains the source of truth under unreliable latency.
//! Kanban mutations apply optimistically and reconcile (or heal via a
//! silent background refresh) once the authority answers.
//!
//! The entry point is [`engine::SyncEngine`], constructed once per
//! application session around an [`remote::Authority`] implementation
//! and handed by reference to everything that needs it; there is no
//! ambient global state. All operations must run inside a tokio
//! runtime; background healing uses spawned tasks.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod remote;

pub use cache::{CacheLookup, InFlightRegistry, ProjectCache};
pub use config::{ConfigError, SyncConfig};
pub use engine::{DropTarget, SyncEngine};
pub use error::{ErrorClass, SyncError};
pub use events::SyncEvent;
pub use remote::{Authority, AuthorityError, Credential};
