//! Bounded batch selection.
//!
//! The [`BatchBuilder`] turns the walker's pending nodes into an ordered,
//! capped list of entries and advances the state of every node it includes.
//! Rules, in precedence order:
//!
//! 1. Once a Delete is selected, nothing beneath that node is selected: the
//!    viewer removes the whole subtree with the one operation.
//! 2. Creating emits Create, Changing emits Change, both delete states emit
//!    Delete.
//! 3. Children are never emitted on their own; they travel inside their
//!    owner's render. The root is never created by a cycle (the initial
//!    document establishes it).
//! 4. Entries are taken in walker order until the op limit is reached.
//!    Everything after that keeps its state for the next cycle.
//! 5. Every included node is marked synchronized before `build` returns.

use std::num::NonZeroUsize;

use livekml_types::{CycleId, NodeId, OpKind};
use serde::Serialize;

use crate::node::{Node, NodePath};
use crate::render::Renderer;
use crate::state::Action;
use crate::walker::{Role, Walker};

/// One operation of a batch, already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry<F> {
    /// Create, Change or Delete.
    pub kind: OpKind,
    /// The node the operation is about.
    pub id: NodeId,
    /// The Container a Create attaches to; `None` for Change and Delete.
    pub parent: Option<NodeId>,
    /// The renderer's output for this entry.
    pub fragment: F,
}

/// Per-kind entry counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    /// Number of Create entries.
    pub creates: usize,
    /// Number of Change entries.
    pub changes: usize,
    /// Number of Delete entries.
    pub deletes: usize,
}

impl OpCounts {
    /// Sum of all kinds.
    pub fn total(&self) -> usize {
        self.creates + self.changes + self.deletes
    }
}

/// The ordered output of one synchronization cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBatch<F> {
    cycle: CycleId,
    entries: Vec<BatchEntry<F>>,
}

impl<F> OperationBatch<F> {
    /// Wrap entries produced by cycle `cycle`.
    pub fn new(cycle: CycleId, entries: Vec<BatchEntry<F>>) -> Self {
        Self { cycle, entries }
    }

    /// The cycle that produced this batch.
    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    /// Entries in emission order.
    pub fn entries(&self) -> &[BatchEntry<F>] {
        &self.entries
    }

    /// Consume the batch, returning its entries.
    pub fn into_entries(self) -> Vec<BatchEntry<F>> {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the batch has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, BatchEntry<F>> {
        self.entries.iter()
    }

    /// Entries of one kind, in emission order.
    pub fn of_kind(&self, kind: OpKind) -> impl Iterator<Item = &BatchEntry<F>> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Count entries per kind.
    pub fn counts(&self) -> OpCounts {
        self.entries
            .iter()
            .fold(OpCounts::default(), |mut counts, entry| {
                match entry.kind {
                    OpKind::Create => counts.creates += 1,
                    OpKind::Change => counts.changes += 1,
                    OpKind::Delete => counts.deletes += 1,
                }
                counts
            })
    }
}

impl<'a, F> IntoIterator for &'a OperationBatch<F> {
    type Item = &'a BatchEntry<F>;
    type IntoIter = std::slice::Iter<'a, BatchEntry<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Selects, orders and caps the entries of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchBuilder {
    op_limit: Option<NonZeroUsize>,
}

impl BatchBuilder {
    /// Create a builder. `None` disables the cap.
    pub fn new(op_limit: Option<NonZeroUsize>) -> Self {
        Self { op_limit }
    }

    /// A builder without a cap.
    pub fn unbounded() -> Self {
        Self { op_limit: None }
    }

    /// The configured cap.
    pub fn op_limit(&self) -> Option<NonZeroUsize> {
        self.op_limit
    }

    fn is_full(&self, len: usize) -> bool {
        self.op_limit.is_some_and(|limit| len >= limit.get())
    }

    /// Select and render the entries of one cycle, then advance the state
    /// of every included node.
    pub fn build<R: Renderer>(
        &self,
        root: &mut Node,
        renderer: &R,
    ) -> Vec<BatchEntry<R::Fragment>> {
        let mut entries = Vec::new();
        let mut selected: Vec<NodePath> = Vec::new();
        let mut deleted_subtree: Option<NodePath> = None;

        for visit in Walker::new(root) {
            // Pre-order: once a visit falls outside the deleted subtree, no
            // later one can fall inside it.
            if let Some(deleted) = &deleted_subtree {
                if visit.path.starts_with(deleted) {
                    continue;
                }
                deleted_subtree = None;
            }

            let Some(kind) = visit.node.state().pending_op() else {
                continue;
            };
            if visit.role == Role::Child || (visit.role == Role::Root && kind == OpKind::Create) {
                continue;
            }
            if self.is_full(entries.len()) {
                tracing::trace!(limit = ?self.op_limit, "op limit reached, deferring remainder");
                break;
            }

            let (fragment, parent) = match (kind, visit.parent) {
                (OpKind::Create, Some(parent)) => {
                    (renderer.render_create(visit.node, parent), Some(parent.id()))
                }
                (OpKind::Create, None) => continue,
                (OpKind::Change, _) => (renderer.render_change(visit.node), None),
                (OpKind::Delete, _) => {
                    deleted_subtree = Some(visit.path.clone());
                    (renderer.render_delete(visit.node), None)
                }
            };

            tracing::trace!(%kind, id = %visit.node.id(), depth = visit.depth, "selected");
            entries.push(BatchEntry {
                kind,
                id: visit.node.id(),
                parent,
                fragment,
            });
            selected.push(visit.path);
        }

        // Reverse pre-order: detaching a node never shifts the path of one
        // selected before it.
        for path in selected.iter().rev() {
            let action = match root.node_at_mut(path) {
                Some(node) => node.synchronized(),
                None => continue,
            };
            if action == Some(Action::Detach) && !path.is_root() {
                root.detach_at(path);
            }
        }

        entries
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(crate::DEFAULT_OP_LIMIT))
    }
}
