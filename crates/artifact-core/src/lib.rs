#![warn(missing_docs)]
//! Artifact Core - Headless Editor Session Coordinator
//!
//! # Overview
//!
//! `artifact-core` manages editing of a small set of named, versioned text artifacts that live in
//! an external persistent store. It owns one working buffer for the selected artifact, gates every
//! write through a validation pipeline, and reconciles debounced autosave, manual save, version
//! restore and remote-reference pulls into a single consistent dirty/clean state.
//!
//! It does not render anything and does not know how the store is reached: hosts plug in a
//! [`Gateway`], a [`Validator`], a [`Clock`], a [`Spawner`] and a [`DiscardConfirmation`].
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Coordinator (commands, poll, events)       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  EditorSession (buffer/baseline, debounce)  │  ← Session State
//! ├─────────────────────────────────────────────┤
//! │  Validator      │  Gateway + Spawner        │  ← Collaborators
//! ├─────────────────────────────────────────────┤
//! │  Model (Artifact, HistoryEntry, PathTree)   │  ← Data
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use artifact_core::{
//!     ArtifactKind, Coordinator, ManualClock, MemoryGateway, QueuedSpawner, Rejection,
//!     SessionState, Validator,
//! };
//!
//! struct AcceptAll;
//!
//! impl Validator for AcceptAll {
//!     fn validate(&self, _kind: ArtifactKind, _text: &str) -> Result<(), Rejection> {
//!         Ok(())
//!     }
//! }
//!
//! let gateway = Arc::new(MemoryGateway::new());
//! gateway.seed("site/app.js", ArtifactKind::JavaScript, "a=1").unwrap();
//!
//! let clock = Arc::new(ManualClock::new());
//! let spawner = Arc::new(QueuedSpawner::new());
//! let mut coordinator = Coordinator::new(gateway, Arc::new(AcceptAll))
//!     .with_clock(clock.clone())
//!     .with_spawner(spawner.clone());
//!
//! // Listing the store auto-selects the first artifact.
//! coordinator.refresh();
//! spawner.run_all();
//! coordinator.poll();
//!
//! coordinator.edit("a=2").unwrap();
//! assert_eq!(coordinator.session().unwrap().state(), SessionState::Dirty);
//! ```
//!
//! # Module Description
//!
//! - [`model`] - Artifact, history and kind types
//! - [`tree`] - Flat path list to folder/file tree
//! - [`gateway`] - Persistence gateway contract and its errors
//! - [`table`] - Reference in-memory artifact table shared by store backends
//! - [`memory`] - Thread-safe in-memory gateway
//! - [`validation`] - Validation verdicts and the validator contract
//! - [`debounce`] - Owned, cancellable autosave deadline
//! - [`clock`] - Time source abstraction
//! - [`dispatch`] - Where gateway calls run
//! - [`confirm`] - Discard confirmation capability
//! - [`session`] - Per-artifact editor session state
//! - [`events`] - Session event notifications
//! - [`coordinator`] - The session coordinator state machine

pub mod clock;
pub mod config;
pub mod confirm;
pub mod coordinator;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod gateway;
pub mod memory;
pub mod model;
pub mod session;
pub mod table;
pub mod tree;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use confirm::{DiscardConfirmation, PendingChanges, RefuseDiscard};
pub use coordinator::{Coordinator, SaveRequest, SelectOutcome};
pub use debounce::DebounceTimer;
pub use dispatch::{Job, QueuedSpawner, Spawner, ThreadSpawner};
pub use error::CoordinatorError;
pub use events::{SessionEvent, SessionEventCallback};
pub use gateway::{Gateway, GatewayError, RemoteFetchError};
pub use memory::MemoryGateway;
pub use model::{Artifact, ArtifactId, ArtifactKind, HistoryEntry, UNKNOWN_EDITOR, unix_millis};
pub use session::{EditorSession, SaveFailure, SaveOrigin, SessionState};
pub use table::ArtifactTable;
pub use tree::{FileNode, FolderNode, PathTree, build_tree};
pub use validation::{Rejection, Validator};
