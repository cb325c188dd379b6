//! # regraft
//!
//! A mutable concrete syntax tree for source-to-source refactoring tools.
//!
//! `regraft` keeps every token of the original source — keywords,
//! punctuation, whitespace, comments — as leaves of the tree, so an
//! untouched tree serializes back to the exact input text, and an edited
//! tree changes only the bytes the edit touched. Structural edits (insert,
//! remove, replace, merge) happen in place through a small, fully checked
//! API.
//!
//! ## Features
//!
//! - **Lossless by construction**: serialization is the concatenation of
//!   token texts in document order, nothing more.
//! - **Arena storage**: all nodes live in one `Vec` owned by the tree;
//!   [`NodeId`] handles are `Copy` and `Option<NodeId>` has the same size
//!   as `NodeId`.
//! - **Checked mutation**: every mutating operation validates its
//!   preconditions first and returns [`TreeError`] without touching the
//!   tree when they do not hold.
//! - **Named properties**: a composite can label children by role
//!   (`"condition"`, `"body"`, ...) and the bindings track removals and
//!   replacements automatically.
//!
//! ## Quick Start
//!
//! ```
//! use regraft::{SourcePos, SyntaxKind, SyntaxTree};
//!
//! const CALL: SyntaxKind = SyntaxKind(1);
//! const TOKEN: SyntaxKind = SyntaxKind(2);
//!
//! let mut tree = SyntaxTree::new();
//! let call = tree.create_composite(CALL);
//! let name = tree.create_token(TOKEN, "print", SourcePos::new(1, 1, 0));
//! let open = tree.create_token(TOKEN, "(", SourcePos::new(1, 6, 5));
//! let arg = tree.create_token(TOKEN, "x", SourcePos::new(1, 7, 6));
//! let close = tree.create_token(TOKEN, ")", SourcePos::new(1, 8, 7));
//! tree.append_children(call, [name, open, arg, close]).unwrap();
//!
//! // byte-exact reconstruction of the source
//! assert_eq!(tree.text(call), "print(x)");
//!
//! // in-place edit: swap the argument
//! let y = tree.create_token(TOKEN, "y", SourcePos::new(1, 7, 6));
//! tree.replace_child(call, arg, y).unwrap();
//! assert_eq!(tree.text(call), "print(y)");
//! ```
//!
//! ## Design
//!
//! The tree is language-agnostic: node tags are opaque [`SyntaxKind`]
//! numbers assigned by the embedding parser, and queries like
//! [`SyntaxTree::find`] take predicates over them rather than a fixed
//! vocabulary. One `SyntaxTree` is single-writer by construction — all
//! mutation goes through `&mut SyntaxTree` — and independent trees can be
//! processed on independent threads.
//!
//! Detached nodes stay in the arena until the tree is dropped, so a
//! refactoring pass can unhook a subtree, hold its [`NodeId`], and graft it
//! somewhere else later.

pub mod error;
pub mod tree;

pub use error::TreeError;
pub use tree::{
    Ancestors, Children, Descendants, NodeData, NodeId, PropertyValue, SourcePos, SyntaxKind,
    SyntaxTree, Tokens,
};
