//! Error types for LiveKML.

use crate::NodeId;
use thiserror::Error;

/// Errors raised by the synchronization engine.
///
/// All of these are structural precondition violations on the caller's
/// tree. Delivery failures are never reported here; they are handled by
/// redelivering an already produced batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A Leaf node was used where a Container is required
    #[error("node {id} is not a container")]
    NotAContainer {
        /// The offending node.
        id: NodeId,
    },

    /// The same id appears more than once in one tree
    #[error("duplicate node id in tree: {id}")]
    DuplicateId {
        /// The repeated id.
        id: NodeId,
    },

    /// The addressed node is not part of the tree
    #[error("node not found: {id}")]
    NodeNotFound {
        /// The missing id.
        id: NodeId,
    },

    /// A tag or field name cannot be written as an element name
    #[error("node {id} uses invalid element name {name:?}")]
    InvalidName {
        /// The offending node.
        id: NodeId,
        /// The rejected name.
        name: String,
    },
}
