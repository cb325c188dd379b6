//! Error types for tree mutation and traversal.
//!
//! Every operation that could violate a structural invariant validates its
//! preconditions up front and reports a [`TreeError`] instead of mutating:
//! an `Err` return always means the tree is exactly as it was before the
//! call. These are contract violations detected synchronously, not
//! recoverable runtime conditions — nothing in this crate performs I/O, so
//! there is no transient/permanent distinction and no retry story.

use thiserror::Error;

use crate::tree::NodeId;

/// A structural precondition violation.
///
/// Each variant names the node(s) involved so the caller can report which
/// part of its transform went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The referenced node is not currently linked under the given parent.
    ///
    /// Reported by `remove_child`, `replace_child`, `insert_before`,
    /// `insert_after`, and `set_property` when their anchor/child argument
    /// belongs to a different parent (or to none).
    #[error("node {node} is not a child of node {parent}")]
    NotAChild {
        /// The composite the operation was addressed to.
        parent: NodeId,
        /// The node that was expected to be one of its children.
        node: NodeId,
    },

    /// A node passed to an insertion operation already has a parent.
    ///
    /// Detach it first; a node can only be linked into one place at a time.
    #[error("node {node} is already attached to a parent")]
    AlreadyAttached {
        /// The node that is still linked elsewhere.
        node: NodeId,
    },

    /// Token traversal reached a composite with no children.
    ///
    /// `first_token`/`last_token` descend the head/tail chain expecting to
    /// end at a token; a childless composite on that path means the tree is
    /// malformed (every well-formed composite bottoms out in tokens).
    #[error("node {node} is a childless composite where a token was expected")]
    EmptySubtree {
        /// The childless composite the descent stopped at.
        node: NodeId,
    },

    /// Inserting the node would make it its own ancestor.
    ///
    /// Reported when a node is inserted into itself or into one of its own
    /// descendants, and by `merge_node` when the source contains the target.
    #[error("inserting node {node} under node {parent} would create a cycle")]
    SelfReference {
        /// The insertion target.
        parent: NodeId,
        /// The node whose subtree already contains the target.
        node: NodeId,
    },

    /// A child-list operation was addressed to a token.
    ///
    /// Tokens are terminal; only composites own children.
    #[error("node {node} is a token and cannot hold children")]
    NotComposite {
        /// The token the operation was addressed to.
        node: NodeId,
    },
}
