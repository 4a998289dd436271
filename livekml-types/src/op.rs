//! Update operation kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The operation a batch entry asks the remote viewer to perform.
///
/// These map one-to-one onto the `<Create>`, `<Change>` and `<Delete>`
/// sections of a KML `<Update>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// Add a node (with its embedded children) under a parent Container.
    Create,
    /// Replace the fields of an already delivered node.
    Change,
    /// Remove a node and everything beneath it.
    Delete,
}

impl OpKind {
    /// All kinds.
    pub const ALL: [OpKind; 3] = [OpKind::Create, OpKind::Change, OpKind::Delete];

    /// The KML element name for this operation's section.
    pub fn section_tag(&self) -> &'static str {
        match self {
            OpKind::Create => "Create",
            OpKind::Change => "Change",
            OpKind::Delete => "Delete",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_in_document_order() {
        let tags: Vec<_> = OpKind::ALL.iter().map(|k| k.section_tag()).collect();
        assert_eq!(tags, ["Create", "Change", "Delete"]);
    }

    #[test]
    fn display_matches_section_tag() {
        assert_eq!(OpKind::Delete.to_string(), "Delete");
    }
}
