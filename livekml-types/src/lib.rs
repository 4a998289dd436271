//! # livekml-types
//!
//! Shared vocabulary for the LiveKML synchronization crates:
//! - [`NodeId`], [`CycleId`] - Identity and ordering types
//! - [`OpKind`] - The three update operations a remote viewer understands
//! - [`SyncError`] - Error types
//! - [`is_valid_name`] - The element name rule shared by the tree and its serializer

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod name;
mod op;

pub use error::SyncError;
pub use ids::{CycleId, NodeId};
pub use name::is_valid_name;
pub use op::OpKind;
