//! The synchronized object tree.
//!
//! A [`Node`] owns its state machine and two ordered lists of sub-nodes:
//!
//! - **children** are embedded in the owner's published content. They have
//!   no remote lifecycle of their own and are never addressed by a batch
//!   entry; they travel whenever the owner is (re-)rendered.
//! - **dependents** are independently addressable. Each one gets its own
//!   Create/Change/Delete entries, targeting the owning Container.
//!
//! Ownership is strictly tree-shaped: every node lives in exactly one
//! parent list (or is the root), so cascades are plain recursion and no
//! back-references are needed.

use std::collections::HashSet;

use livekml_types::{is_valid_name, NodeId, SyncError};

use crate::state::{Action, SyncState, Verb};

/// The closed set of node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeVariant {
    /// May own dependents; the attachment point a Create targets.
    Container,
    /// A publishable node that may embed children but owns no dependents.
    Leaf,
}

/// One step from a node to one of its sub-nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Index into `children`.
    Child(usize),
    /// Index into `dependents`.
    Dependent(usize),
}

/// Location of a node relative to a root, as a sequence of slots.
///
/// The empty path addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<Slot>);

impl NodePath {
    /// The path of the root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend this path by one slot.
    pub fn join(&self, slot: Slot) -> Self {
        let mut slots = self.0.clone();
        slots.push(slot);
        Self(slots)
    }

    /// The slots from the root downwards.
    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    /// Check if `prefix` addresses this node or one of its ancestors.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of slots (the depth of the addressed node).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Same as [`NodePath::is_root`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn split_last(&self) -> Option<(&[Slot], Slot)> {
        self.0.split_last().map(|(last, rest)| (rest, *last))
    }
}

/// Outcome of [`Node::discard_dependent`].
#[derive(Debug)]
pub enum Discard {
    /// Never delivered: removed immediately, nothing will be emitted.
    Detached(Node),
    /// Delivered: a Delete is pending and the node stays attached until it
    /// has been placed into a batch.
    PendingDelete,
    /// No dependent with that id.
    NotFound,
}

/// One object participating in synchronization.
///
/// Nodes are deliberately not `Clone`: a copy would duplicate the id.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    variant: NodeVariant,
    tag: String,
    fields: Vec<(String, String)>,
    state: SyncState,
    children: Vec<Node>,
    dependents: Vec<Node>,
}

impl Node {
    fn new(variant: NodeVariant, tag: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            variant,
            tag: tag.into(),
            fields: Vec::new(),
            state: SyncState::Idle,
            children: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Create an IDLE Container rendered with the given element tag
    /// (e.g. `Document`, `Folder`).
    pub fn container(tag: impl Into<String>) -> Self {
        Self::new(NodeVariant::Container, tag)
    }

    /// Create an IDLE Leaf rendered with the given element tag
    /// (e.g. `Placemark`, `Point`, `Style`).
    pub fn leaf(tag: impl Into<String>) -> Self {
        Self::new(NodeVariant::Leaf, tag)
    }

    /// Replace the generated id, e.g. with one derived from an external key.
    ///
    /// Uniqueness within a tree is then the caller's responsibility; see
    /// [`Node::validate`].
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Builder form of [`Node::set_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Builder form of [`Node::add_child`].
    pub fn with_child(mut self, child: Node) -> Self {
        self.add_child(child);
        self
    }

    /// The node's stable id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Container or Leaf.
    pub fn variant(&self) -> NodeVariant {
        self.variant
    }

    /// Check if this node may own dependents.
    pub fn is_container(&self) -> bool {
        self.variant == NodeVariant::Container
    }

    /// The element tag used when rendering.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Current synchronization state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up a field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field. Marks the node changed only when the value differs.
    ///
    /// Returns whether the value changed.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) if *existing == value => return false,
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
        self.field_changed();
        true
    }

    /// Remove a field. Returns the old value if there was one.
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        let index = self.fields.iter().position(|(k, _)| k == name)?;
        let (_, value) = self.fields.remove(index);
        self.field_changed();
        Some(value)
    }

    /// Embedded children, in order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Children that belong in the owner's rendered content.
    ///
    /// Children that were deactivated or never activated are left out.
    pub fn embedded_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| c.state.is_active())
    }

    /// Independently addressed dependents, in order.
    pub fn dependents(&self) -> &[Node] {
        &self.dependents
    }

    /// Dependents that are displayed (or about to be), for full renders.
    pub fn active_dependents(&self) -> impl Iterator<Item = &Node> {
        self.dependents.iter().filter(|d| d.state.is_active())
    }

    /// Look up a direct child.
    pub fn child(&self, id: NodeId) -> Option<&Node> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Look up a direct child mutably.
    pub fn child_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    /// Look up a direct dependent.
    pub fn dependent(&self, id: NodeId) -> Option<&Node> {
        self.dependents.iter().find(|d| d.id == id)
    }

    /// Look up a direct dependent mutably.
    pub fn dependent_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.dependents.iter_mut().find(|d| d.id == id)
    }

    /// Embed a child. The owner's content changed, so the owner is marked
    /// changed; the child follows the owner's activation.
    pub fn add_child(&mut self, mut child: Node) {
        if self.state.is_active() {
            child.activate(true, false);
        }
        self.children.push(child);
        self.field_changed();
    }

    /// Remove an embedded child. It has no remote standing of its own, so
    /// it is detached immediately and returned IDLE; the owner is marked
    /// changed so its next render omits it.
    pub fn remove_child(&mut self, id: NodeId) -> Option<Node> {
        let index = self.children.iter().position(|c| c.id == id)?;
        let mut child = self.children.remove(index);
        child.force_idle();
        self.field_changed();
        Some(child)
    }

    /// Attach an independently addressed dependent. Only Containers may own
    /// dependents. The dependent keeps its own state; activate it to
    /// publish it.
    pub fn add_dependent(&mut self, dependent: Node) -> Result<(), SyncError> {
        if !self.is_container() {
            return Err(SyncError::NotAContainer { id: self.id });
        }
        self.dependents.push(dependent);
        Ok(())
    }

    /// Discard a dependent.
    ///
    /// A dependent that never reached the viewer is removed at once with no
    /// operation emitted. One that did is deactivated and stays attached
    /// until its Delete has been batched.
    pub fn discard_dependent(&mut self, id: NodeId) -> Discard {
        let Some(index) = self.dependents.iter().position(|d| d.id == id) else {
            return Discard::NotFound;
        };
        match self.dependents[index].state {
            SyncState::Idle | SyncState::Creating => {
                let mut node = self.dependents.remove(index);
                node.force_idle();
                Discard::Detached(node)
            }
            _ => {
                self.dependents[index].activate(false, false);
                Discard::PendingDelete
            }
        }
    }

    /// Request (or withdraw) publication of this node.
    ///
    /// Activation always carries the embedded children along. Deactivation
    /// forces them IDLE, since they vanish together with the owner. With
    /// `cascade`, the verb is also applied recursively to every dependent.
    pub fn activate(&mut self, value: bool, cascade: bool) {
        if value {
            self.apply(Verb::Activate);
            for child in &mut self.children {
                child.activate(true, cascade);
            }
        } else {
            self.apply(Verb::Deactivate);
            for child in &mut self.children {
                child.force_idle();
            }
        }
        if cascade {
            for dependent in &mut self.dependents {
                dependent.activate(value, true);
            }
        }
    }

    /// Flag that published content of this node changed.
    pub fn field_changed(&mut self) {
        self.apply(Verb::FieldChanged);
    }

    /// Reset this node and every descendant to IDLE without emitting
    /// anything.
    pub fn force_idle(&mut self) {
        self.apply(Verb::ForceIdle);
        for child in &mut self.children {
            child.force_idle();
        }
        for dependent in &mut self.dependents {
            dependent.force_idle();
        }
    }

    /// Record that this node's pending operation was placed into a batch.
    ///
    /// After a Create or Change the embedded children were delivered too,
    /// so they settle with it; deactivated children are dropped since the
    /// delivered render no longer contains them.
    pub(crate) fn synchronized(&mut self) -> Option<Action> {
        let action = self.apply(Verb::Synchronized);
        if action.is_none() {
            self.settle_children();
        }
        action
    }

    fn settle_children(&mut self) {
        self.children.retain(|c| !c.state.is_deleting());
        for child in &mut self.children {
            if child.state.is_pending() {
                child.apply(Verb::Synchronized);
            }
            child.settle_children();
        }
    }

    fn apply(&mut self, verb: Verb) -> Option<Action> {
        let (state, action) = self.state.on_verb(verb);
        self.state = state;
        action
    }

    /// Find a node anywhere in this subtree (including self).
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter()
            .chain(self.dependents.iter())
            .find_map(|n| n.find(id))
    }

    /// Find a node anywhere in this subtree mutably.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .chain(self.dependents.iter_mut())
            .find_map(|n| n.find_mut(id))
    }

    /// Resolve a path relative to this node.
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        path.slots()
            .iter()
            .try_fold(self, |node, slot| node.slot(*slot))
    }

    /// Resolve a path relative to this node mutably.
    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = self;
        for slot in path.slots() {
            node = match *slot {
                Slot::Child(i) => node.children.get_mut(i)?,
                Slot::Dependent(i) => node.dependents.get_mut(i)?,
            };
        }
        Some(node)
    }

    fn slot(&self, slot: Slot) -> Option<&Node> {
        match slot {
            Slot::Child(i) => self.children.get(i),
            Slot::Dependent(i) => self.dependents.get(i),
        }
    }

    /// Remove the node at `path` from its parent's list.
    ///
    /// The root itself cannot be detached.
    pub(crate) fn detach_at(&mut self, path: &NodePath) -> Option<Node> {
        let (parent_slots, last) = path.split_last()?;
        let parent_path = NodePath(parent_slots.to_vec());
        let parent = self.node_at_mut(&parent_path)?;
        match last {
            Slot::Child(i) if i < parent.children.len() => Some(parent.children.remove(i)),
            Slot::Dependent(i) if i < parent.dependents.len() => {
                Some(parent.dependents.remove(i))
            }
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .chain(self.dependents.iter())
            .map(Node::subtree_size)
            .sum::<usize>()
    }

    /// Check the structural preconditions of a synchronization cycle:
    /// ids are unique and only Containers own dependents.
    pub fn validate(&self) -> Result<(), SyncError> {
        let mut seen = HashSet::new();
        self.validate_into(&mut seen)
    }

    fn validate_into(&self, seen: &mut HashSet<NodeId>) -> Result<(), SyncError> {
        if !seen.insert(self.id) {
            return Err(SyncError::DuplicateId { id: self.id });
        }
        if !self.dependents.is_empty() && !self.is_container() {
            return Err(SyncError::NotAContainer { id: self.id });
        }
        for node in self.children.iter().chain(self.dependents.iter()) {
            node.validate_into(seen)?;
        }
        Ok(())
    }

    /// Check that the tag and every field name of this subtree can be
    /// rendered as element names.
    pub fn check_names(&self) -> Result<(), SyncError> {
        let names = std::iter::once(self.tag.as_str())
            .chain(self.fields.iter().map(|(k, _)| k.as_str()));
        for name in names {
            if !is_valid_name(name) {
                return Err(SyncError::InvalidName {
                    id: self.id,
                    name: name.to_string(),
                });
            }
        }
        for node in self.children.iter().chain(self.dependents.iter()) {
            node.check_names()?;
        }
        Ok(())
    }
}
