//! # livekml-core
//!
//! Pure synchronization logic for LiveKML (no I/O, instant tests).
//!
//! A remote KML viewer polls for updates. Between two polls the application
//! mutates an in-process tree of [`Node`]s; on each poll this crate works
//! out the smallest ordered set of Create/Change/Delete operations that
//! brings the viewer up to date, capped so every update stays small.
//!
//! ## Pieces
//!
//! - [`state`] - the per-node six-state machine
//! - [`node`] - the owned tree: embedded children and addressed dependents
//! - [`walker`] - lazy pre-order discovery of pending nodes
//! - [`batch`] - suppression, ordering and the op cap
//! - [`coordinator`] - numbered cycles over a root Container
//! - [`outbox`] - batches kept until the viewer acknowledges them
//!
//! Rendering is delegated through the [`Renderer`] trait; the transport
//! decides what to do with the fragments.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod coordinator;
pub mod node;
pub mod outbox;
pub mod render;
pub mod state;
pub mod walker;

pub use batch::{BatchBuilder, BatchEntry, OpCounts, OperationBatch};
pub use coordinator::{CoordinatorConfig, CycleStats, SyncCoordinator, DEFAULT_OP_LIMIT};
pub use node::{Discard, Node, NodePath, NodeVariant, Slot};
pub use outbox::Outbox;
pub use render::Renderer;
pub use state::{Action, SyncState, Verb};
pub use walker::{Role, Visit, Walker};
