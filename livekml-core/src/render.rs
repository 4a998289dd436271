//! The contract with the serialization layer.

use crate::node::Node;

/// Turns one node into a wire fragment for one batch entry.
///
/// The engine calls exactly one of these per entry, matching the entry's
/// [`OpKind`](livekml_types::OpKind), and never looks at the output.
pub trait Renderer {
    /// The rendered form of one entry.
    type Fragment;

    /// Full content of a new node (with its embedded children), attached
    /// under `parent`.
    fn render_create(&self, node: &Node, parent: &Node) -> Self::Fragment;

    /// Current content of an already delivered node.
    fn render_change(&self, node: &Node) -> Self::Fragment;

    /// Removal of a delivered node, by id.
    fn render_delete(&self, node: &Node) -> Self::Fragment;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    type Fragment = R::Fragment;

    fn render_create(&self, node: &Node, parent: &Node) -> Self::Fragment {
        (**self).render_create(node, parent)
    }

    fn render_change(&self, node: &Node) -> Self::Fragment {
        (**self).render_change(node)
    }

    fn render_delete(&self, node: &Node) -> Self::Fragment {
        (**self).render_delete(node)
    }
}
