//! Pre-order discovery of nodes with pending work.
//!
//! The walker is read-only and lazy: it keeps an explicit stack, yields one
//! [`Visit`] at a time and can be abandoned as soon as the caller has seen
//! enough. A new walker is built for every cycle.
//!
//! Order is a node, then its children, then its dependents. A Create for a
//! dependent therefore always comes after the Create of the Container it
//! attaches to.

use livekml_types::NodeId;

use crate::node::{Node, NodePath, Slot};
use crate::state::SyncState;

/// How a visited node relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The subtree root the cycle runs against.
    Root,
    /// Embedded in its parent's content.
    Child,
    /// Independently addressed under its parent.
    Dependent,
}

/// A node with pending work, as seen by the walker.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    /// The node itself.
    pub node: &'a Node,
    /// The owning node, `None` for the root.
    pub parent: Option<&'a Node>,
    /// Child, dependent or root.
    pub role: Role,
    /// Distance from the root.
    pub depth: usize,
    /// Slots leading from the root to this node.
    pub path: NodePath,
}

impl Visit<'_> {
    /// The parent's id, if any.
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent.map(Node::id)
    }
}

struct Frame<'a> {
    node: &'a Node,
    parent: Option<&'a Node>,
    role: Role,
    path: NodePath,
}

/// Iterator over the pending nodes of one subtree.
pub struct Walker<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Walker<'a> {
    /// Start a walk at `root`.
    pub fn new(root: &'a Node) -> Self {
        Self {
            stack: vec![Frame {
                node: root,
                parent: None,
                role: Role::Root,
                path: NodePath::root(),
            }],
        }
    }
}

impl<'a> Iterator for Walker<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let node = frame.node;

            // Nothing beneath an unpublished node can exist remotely.
            if frame.role != Role::Root && node.state() == SyncState::Idle {
                continue;
            }

            for (i, dependent) in node.dependents().iter().enumerate().rev() {
                self.stack.push(Frame {
                    node: dependent,
                    parent: Some(node),
                    role: Role::Dependent,
                    path: frame.path.join(Slot::Dependent(i)),
                });
            }
            for (i, child) in node.children().iter().enumerate().rev() {
                self.stack.push(Frame {
                    node: child,
                    parent: Some(node),
                    role: Role::Child,
                    path: frame.path.join(Slot::Child(i)),
                });
            }

            if node.state().is_pending() {
                return Some(Visit {
                    node,
                    parent: frame.parent,
                    role: frame.role,
                    depth: frame.path.len(),
                    path: frame.path,
                });
            }
        }
        None
    }
}
