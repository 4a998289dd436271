//! Identity and ordering types for LiveKML.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for one node of a synchronized scene.
///
/// UUID v4 format. Rendered as the KML `id` / `targetId` attribute, so the
/// remote viewer addresses the node by this value for its whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(uuid::Uuid);

impl NodeId {
    /// Create a new random NodeId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one derived from an external key).
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A monotonically increasing number identifying one synchronization cycle.
///
/// Assigned by the coordinator to every non-empty batch. The transport
/// echoes it back to the viewer (as a KML cookie) so deliveries can be
/// acknowledged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct CycleId(u64);

impl CycleId {
    /// Create a new CycleId with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this CycleId.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The CycleId before any cycle has produced output.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Increment by one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CycleId({})", self.0)
    }
}
