//! Node tags and payloads.
//!
//! Every node carries a [`SyntaxKind`] tag plus a content payload: composites
//! hold a property map, tokens hold verbatim source text and a position.
//! Navigation links (parent, children, siblings) are stored in `NodeData`,
//! not here.

use indexmap::IndexMap;

use super::pos::SourcePos;
use super::NodeId;

/// An opaque syntax tag.
///
/// The tree does not interpret tags; the parser that builds a tree assigns
/// them (typically from an `enum` of node kinds cast to `u16`) and queries
/// like [`filter`](crate::SyntaxTree::filter) and
/// [`find`](crate::SyntaxTree::find) take predicates over them. Two nodes
/// are "the same kind" exactly when their tags compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxKind(pub u16);

/// A named, semantic binding from a composite node to one or more of its
/// own children.
///
/// Properties give call sites non-positional access to meaningful children
/// ("the condition of this if-statement") independent of where those
/// children sit in the sibling chain. A binding is either a `Single` child
/// or an ordered `Sequence`; appending twice under the same name promotes a
/// `Single` to a `Sequence` (see
/// [`append_child_as`](crate::SyntaxTree::append_child_as)).
///
/// Every `NodeId` held here is a current child of the owning composite;
/// removal and replacement keep the bindings in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    /// A binding to exactly one child.
    Single(NodeId),
    /// An ordered binding to any number of children.
    Sequence(Vec<NodeId>),
}

impl PropertyValue {
    /// Returns the bound child of a `Single` binding, `None` for sequences.
    #[must_use]
    pub fn as_single(&self) -> Option<NodeId> {
        match self {
            Self::Single(node) => Some(*node),
            Self::Sequence(_) => None,
        }
    }

    /// Returns the bound children of a `Sequence` binding, `None` for
    /// single-value bindings.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[NodeId]> {
        match self {
            Self::Single(_) => None,
            Self::Sequence(nodes) => Some(nodes),
        }
    }

    /// Returns `true` if this binding references `id`.
    #[must_use]
    pub fn references(&self, id: NodeId) -> bool {
        match self {
            Self::Single(node) => *node == id,
            Self::Sequence(nodes) => nodes.contains(&id),
        }
    }
}

/// The property map of a composite node. Insertion-ordered so scans, merges,
/// and iteration are deterministic.
pub(crate) type PropertyMap = IndexMap<String, PropertyValue>;

/// The content payload of a node.
///
/// Composites own children (linked through `NodeData`) and a property map;
/// tokens are terminal and own a slice of the original source text.
#[derive(Debug, Clone)]
pub(crate) enum NodeContent {
    /// An interior node: a named slot map over its children.
    Composite {
        /// Semantic bindings into this node's own child list.
        properties: PropertyMap,
    },
    /// A leaf token: a verbatim source substring and where it came from.
    Token {
        /// The exact source text, reproduced by serialization.
        text: String,
        /// Position of the text in the original input.
        pos: SourcePos,
    },
}
