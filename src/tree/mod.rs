//! Arena-based mutable syntax tree.
//!
//! This module implements the core tree representation using arena allocation
//! with typed indices. All nodes live in a contiguous `Vec<NodeData>` owned by
//! the [`SyntaxTree`], and are referenced by [`NodeId`] — a newtype over
//! `NonZeroU32`.
//!
//! This design provides O(1) node access, cache-friendly layout, no reference
//! counting overhead, and safe bulk deallocation (drop the `SyntaxTree` and
//! everything is freed).
//!
//! # Architecture
//!
//! Navigation links (parent, first\_child, last\_child, next\_sibling,
//! prev\_sibling) are arena indices rather than owning references, so the
//! parent/child back-and-forth never forms an ownership cycle. The arena
//! hosts a forest: any node without a parent is the root of its own subtree,
//! and a detached node can be re-attached anywhere in the same tree.
//!
//! # Consistency
//!
//! A composite keeps four views of its children in step: the doubly-linked
//! sibling chain, the parent back-references, the first/last child cache
//! (with `child_count`), and the name-indexed property map. Every public
//! mutation validates its preconditions before touching a single link, so an
//! `Err` return means the tree is exactly as it was — there is no observable
//! partially-mutated state.

mod node;
mod pos;

pub use node::{PropertyValue, SyntaxKind};
pub use pos::SourcePos;

use node::{NodeContent, PropertyMap};

use crate::error::TreeError;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroU32;

/// A typed index into the tree's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
/// Ids are only meaningful for the [`SyntaxTree`] that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Converts this `NodeId` to a raw `u32`.
    ///
    /// The returned value is always non-zero (valid `NodeId`s start at 1).
    /// Use 0 to represent "no node" in external tables.
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Creates a `NodeId` from a raw `u32`, if non-zero.
    ///
    /// Returns `None` if `raw` is 0.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.get())
    }
}

/// Storage for a single node in the tree arena.
///
/// Each node stores its tag, its content payload (composite property map or
/// token text), and the links to parent, children, and siblings used for
/// tree navigation. Access individual nodes via [`SyntaxTree::node`].
#[derive(Debug, Clone)]
pub struct NodeData {
    /// The node's syntax tag.
    kind: SyntaxKind,
    /// Composite property map or token payload.
    content: NodeContent,
    /// Parent node, if attached.
    parent: Option<NodeId>,
    /// First child node.
    first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    last_child: Option<NodeId>,
    /// Next sibling.
    next_sibling: Option<NodeId>,
    /// Previous sibling.
    prev_sibling: Option<NodeId>,
    /// Number of nodes on the chain from `first_child` to `last_child`.
    child_count: usize,
}

impl NodeData {
    fn new(kind: SyntaxKind, content: NodeContent) -> Self {
        Self {
            kind,
            content,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            child_count: 0,
        }
    }

    /// The node's syntax tag.
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// The parent node, or `None` if this node is detached or a root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The first child, or `None` if this node has no children.
    #[must_use]
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    /// The last child, or `None` if this node has no children.
    #[must_use]
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    /// The next sibling in document order.
    #[must_use]
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// The previous sibling in document order.
    #[must_use]
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    /// The number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    /// Returns `true` if this node is a composite (may own children).
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self.content, NodeContent::Composite { .. })
    }

    /// Returns `true` if this node is a leaf token.
    #[must_use]
    pub fn is_token(&self) -> bool {
        matches!(self.content, NodeContent::Token { .. })
    }

    /// The verbatim source text of a token node; `None` for composites.
    #[must_use]
    pub fn token_text(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Token { text, .. } => Some(text),
            NodeContent::Composite { .. } => None,
        }
    }

    /// The source position of a token node; `None` for composites.
    #[must_use]
    pub fn token_pos(&self) -> Option<SourcePos> {
        match &self.content {
            NodeContent::Token { pos, .. } => Some(*pos),
            NodeContent::Composite { .. } => None,
        }
    }

    fn properties(&self) -> Option<&PropertyMap> {
        match &self.content {
            NodeContent::Composite { properties } => Some(properties),
            NodeContent::Token { .. } => None,
        }
    }

    fn properties_mut(&mut self) -> Option<&mut PropertyMap> {
        match &mut self.content {
            NodeContent::Composite { properties } => Some(properties),
            NodeContent::Token { .. } => None,
        }
    }
}

/// A mutable concrete syntax tree.
///
/// The `SyntaxTree` owns all nodes in an arena and provides methods for
/// navigation, structural queries, and in-place mutation. All read
/// operations go through `&SyntaxTree`; all mutation goes through
/// `&mut SyntaxTree`, so Rust's borrow rules enforce the tree's
/// single-writer contract at compile time.
///
/// Serializing a subtree concatenates its token texts in document order:
/// for a tree built token-for-token from source and never mutated, the
/// result is byte-identical to that source.
///
/// # Examples
///
/// ```
/// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
///
/// const LIST: SyntaxKind = SyntaxKind(1);
/// const WORD: SyntaxKind = SyntaxKind(2);
///
/// let mut tree = SyntaxTree::new();
/// let list = tree.create_composite(LIST);
/// let hello = tree.create_token(WORD, "hello ", SourcePos::new(1, 1, 0));
/// let world = tree.create_token(WORD, "world", SourcePos::new(1, 8, 7));
/// tree.append_child(list, hello).unwrap();
/// tree.append_child(list, world).unwrap();
///
/// assert_eq!(tree.text(list), "hello world");
/// ```
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    /// Creates a new empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Creates a new empty tree with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.saturating_add(1));
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(
            SyntaxKind(0),
            NodeContent::Composite {
                properties: PropertyMap::new(),
            },
        ));
        Self { nodes }
    }

    // --- Node creation ---

    /// Allocates a new composite node in the arena and returns its id.
    ///
    /// The node starts detached, with no children and no properties.
    pub fn create_composite(&mut self, kind: SyntaxKind) -> NodeId {
        self.push_node(NodeData::new(
            kind,
            NodeContent::Composite {
                properties: PropertyMap::new(),
            },
        ))
    }

    /// Allocates a new token node carrying `text` and `pos`.
    ///
    /// Tokens are terminal: they have no children and serialize to exactly
    /// `text`.
    pub fn create_token(
        &mut self,
        kind: SyntaxKind,
        text: impl Into<String>,
        pos: SourcePos,
    ) -> NodeId {
        self.push_node(NodeData::new(
            kind,
            NodeContent::Token {
                text: text.into(),
                pos,
            },
        ))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(data);
        NodeId::from_index(index)
    }

    // --- Node access ---

    /// Returns a reference to the [`NodeData`] for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the syntax tag of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.node(id).kind()
    }

    /// Returns `true` if the node is a composite.
    #[must_use]
    pub fn is_composite(&self, id: NodeId) -> bool {
        self.node(id).is_composite()
    }

    /// Returns `true` if the node is a leaf token.
    #[must_use]
    pub fn is_token(&self, id: NodeId) -> bool {
        self.node(id).is_token()
    }

    /// Returns the verbatim text of a token node; `None` for composites.
    #[must_use]
    pub fn token_text(&self, id: NodeId) -> Option<&str> {
        self.node(id).token_text()
    }

    /// Returns the total number of nodes ever created in this tree,
    /// attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // subtract placeholder at index 0
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent()
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child()
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child()
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling()
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling()
    }

    /// Returns the number of direct children of a node.
    ///
    /// Always 0 for tokens. Equal to the length of the sibling chain walked
    /// from [`first_child`](Self::first_child).
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).child_count()
    }

    /// Returns an iterator over the direct children of a node, in document
    /// order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to the
    /// root of its subtree).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node in pre-order
    /// (depth-first, document order). The start node itself is not yielded.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns an iterator over the tokens of a subtree in document order.
    ///
    /// A token yields itself. Concatenating the texts of the yielded tokens
    /// equals [`text`](Self::text) of the same node.
    pub fn tokens(&self, id: NodeId) -> Tokens<'_> {
        let start = if self.node(id).is_token() {
            Some(id)
        } else {
            None
        };
        Tokens {
            tree: self,
            start,
            inner: self.descendants(id),
        }
    }

    // --- Queries ---

    /// Returns the direct children of `parent` whose tag satisfies `pred`,
    /// in document order.
    ///
    /// Non-recursive: grandchildren are not considered. Returns an empty
    /// vector when `parent` is a token.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// const BLOCK: SyntaxKind = SyntaxKind(1);
    /// const IDENT: SyntaxKind = SyntaxKind(2);
    /// const COMMA: SyntaxKind = SyntaxKind(3);
    ///
    /// let mut tree = SyntaxTree::new();
    /// let block = tree.create_composite(BLOCK);
    /// let a = tree.create_token(IDENT, "a", SourcePos::default());
    /// let sep = tree.create_token(COMMA, ",", SourcePos::default());
    /// let b = tree.create_token(IDENT, "b", SourcePos::default());
    /// tree.append_children(block, [a, sep, b]).unwrap();
    ///
    /// assert_eq!(tree.filter(block, |kind| kind == IDENT), vec![a, b]);
    /// ```
    pub fn filter<P>(&self, parent: NodeId, mut pred: P) -> Vec<NodeId>
    where
        P: FnMut(SyntaxKind) -> bool,
    {
        self.children(parent)
            .filter(|&child| pred(self.kind(child)))
            .collect()
    }

    /// Searches the subtree rooted at `root` for nodes whose tag satisfies
    /// `pred`, in pre-order (document order). `root` itself is tested first.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// const BLOCK: SyntaxKind = SyntaxKind(1);
    /// const IDENT: SyntaxKind = SyntaxKind(2);
    ///
    /// let mut tree = SyntaxTree::new();
    /// let root = tree.create_composite(BLOCK);
    /// let a = tree.create_token(IDENT, "a", SourcePos::default());
    /// let inner = tree.create_composite(BLOCK);
    /// let c = tree.create_token(IDENT, "c", SourcePos::default());
    /// let d = tree.create_token(IDENT, "d", SourcePos::default());
    /// tree.append_children(root, [a, inner]).unwrap();
    /// tree.append_children(inner, [c, d]).unwrap();
    ///
    /// assert_eq!(tree.find(root, |kind| kind == IDENT), vec![a, c, d]);
    /// ```
    pub fn find<P>(&self, root: NodeId, mut pred: P) -> Vec<NodeId>
    where
        P: FnMut(SyntaxKind) -> bool,
    {
        let mut matches = Vec::new();
        if pred(self.kind(root)) {
            matches.push(root);
        }
        for id in self.descendants(root) {
            if pred(self.kind(id)) {
                matches.push(id);
            }
        }
        matches
    }

    /// Returns the leftmost token of the subtree rooted at `id`: the first
    /// token in document order.
    ///
    /// Descends through `first_child` while the current node is a composite.
    /// A token is its own first token.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptySubtree`] if the descent reaches a
    /// composite with no children (a malformed tree; well-formed composites
    /// bottom out in tokens).
    pub fn first_token(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut current = id;
        loop {
            if self.node(current).is_token() {
                return Ok(current);
            }
            match self.node(current).first_child {
                Some(child) => current = child,
                None => return Err(TreeError::EmptySubtree { node: current }),
            }
        }
    }

    /// Returns the rightmost token of the subtree rooted at `id`: the last
    /// token in document order.
    ///
    /// Symmetric to [`first_token`](Self::first_token), descending through
    /// `last_child`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::EmptySubtree`] if the descent reaches a
    /// composite with no children.
    pub fn last_token(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let mut current = id;
        loop {
            if self.node(current).is_token() {
                return Ok(current);
            }
            match self.node(current).last_child {
                Some(child) => current = child,
                None => return Err(TreeError::EmptySubtree { node: current }),
            }
        }
    }

    /// Returns the source position of a node: a token's own position, or
    /// the position of a composite's first token.
    ///
    /// A composite that currently has no children reports its parent's
    /// position — "where this node would appear". Returns `None` for a
    /// childless detached composite, or when the leftmost descent dead-ends
    /// in a malformed (token-free) subtree.
    #[must_use]
    pub fn source_pos(&self, id: NodeId) -> Option<SourcePos> {
        let data = self.node(id);
        if let Some(pos) = data.token_pos() {
            return Some(pos);
        }
        if data.child_count == 0 {
            return self.parent(id).and_then(|parent| self.source_pos(parent));
        }
        let token = self.first_token(id).ok()?;
        self.node(token).token_pos()
    }

    /// Reconstructs the source text of the subtree rooted at `id` by
    /// concatenating its token texts in document order.
    ///
    /// No formatting is synthesized: for a tree built token-for-token from
    /// an input and not mutated since, the result equals that input exactly.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// const CALL: SyntaxKind = SyntaxKind(1);
    /// const TOKEN: SyntaxKind = SyntaxKind(2);
    ///
    /// let mut tree = SyntaxTree::new();
    /// let call = tree.create_composite(CALL);
    /// let name = tree.create_token(TOKEN, "print", SourcePos::new(1, 1, 0));
    /// let open = tree.create_token(TOKEN, "(", SourcePos::new(1, 6, 5));
    /// let arg = tree.create_token(TOKEN, "x", SourcePos::new(1, 7, 6));
    /// let close = tree.create_token(TOKEN, ")", SourcePos::new(1, 8, 7));
    /// tree.append_children(call, [name, open, arg, close]).unwrap();
    ///
    /// assert_eq!(tree.text(call), "print(x)");
    /// ```
    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match self.node(id).token_text() {
            Some(text) => buf.push_str(text),
            None => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    // --- Properties ---

    /// Returns the property binding named `name` on `parent`, if any.
    ///
    /// Tokens have no properties and always return `None`.
    #[must_use]
    pub fn property(&self, parent: NodeId, name: &str) -> Option<&PropertyValue> {
        self.node(parent).properties()?.get(name)
    }

    /// Returns an iterator over the property bindings of `parent` in
    /// insertion order. Empty for tokens.
    pub fn properties(
        &self,
        parent: NodeId,
    ) -> impl Iterator<Item = (&str, &PropertyValue)> + '_ {
        self.node(parent)
            .properties()
            .into_iter()
            .flat_map(|map| map.iter().map(|(name, value)| (name.as_str(), value)))
    }

    /// Binds an existing child of `parent` under `name` as a single-value
    /// property, overwriting any previous binding of that name.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if `parent` is a token, or
    /// [`TreeError::NotAChild`] if `child` is not currently a child of
    /// `parent` (bindings may only reference current children).
    pub fn set_property(
        &mut self,
        parent: NodeId,
        name: &str,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        self.ensure_child_of(parent, child)?;
        if let Some(map) = self.node_mut(parent).properties_mut() {
            map.insert(name.to_string(), PropertyValue::Single(child));
        }
        Ok(())
    }

    // --- Mutation ---

    /// Appends `child` as the new last child of `parent`. O(1) via the
    /// tail cache.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if `parent` is a token,
    /// [`TreeError::AlreadyAttached`] if `child` already has a parent
    /// (detach it first), or [`TreeError::SelfReference`] if `child` is
    /// `parent` itself or one of its ancestors. On error the tree is
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// let mut tree = SyntaxTree::new();
    /// let list = tree.create_composite(SyntaxKind(1));
    /// let item = tree.create_token(SyntaxKind(2), "item", SourcePos::default());
    /// tree.append_child(list, item).unwrap();
    ///
    /// assert_eq!(tree.first_child(list), Some(item));
    /// assert_eq!(tree.parent(item), Some(list));
    /// ```
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure_attachable(parent, child)?;
        self.push_back(parent, child);
        Ok(())
    }

    /// Appends `child` as the last child of `parent` and binds it under the
    /// property `name` in the same step.
    ///
    /// Binding rules: a vacant name is bound as a `Single` value; a name
    /// holding a `Single` value is promoted to a `Sequence` of the previous
    /// child and this one; a name holding a `Sequence` has this child pushed
    /// onto its end. Repeated appends under one name therefore accumulate an
    /// ordered sequence.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append_child`](Self::append_child); the binding
    /// is only written when the structural append succeeds.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{PropertyValue, SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// let mut tree = SyntaxTree::new();
    /// let call = tree.create_composite(SyntaxKind(1));
    /// let a = tree.create_token(SyntaxKind(2), "a", SourcePos::default());
    /// let b = tree.create_token(SyntaxKind(2), "b", SourcePos::default());
    /// tree.append_child_as(call, a, "args").unwrap();
    /// tree.append_child_as(call, b, "args").unwrap();
    ///
    /// assert_eq!(
    ///     tree.property(call, "args"),
    ///     Some(&PropertyValue::Sequence(vec![a, b]))
    /// );
    /// ```
    pub fn append_child_as(
        &mut self,
        parent: NodeId,
        child: NodeId,
        name: &str,
    ) -> Result<(), TreeError> {
        self.ensure_attachable(parent, child)?;
        self.push_back(parent, child);
        self.bind_appended(parent, name, child);
        Ok(())
    }

    /// Appends every node of `children` to `parent`, in the given order,
    /// without property bindings.
    ///
    /// The whole batch is validated before any node is attached: on error,
    /// nothing was appended.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append_child`](Self::append_child) for each
    /// node; a node appearing twice in the batch reports
    /// [`TreeError::AlreadyAttached`].
    pub fn append_children<I>(&mut self, parent: NodeId, children: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let children: Vec<NodeId> = children.into_iter().collect();
        let mut seen = HashSet::new();
        for &child in &children {
            self.ensure_attachable(parent, child)?;
            if !seen.insert(child) {
                return Err(TreeError::AlreadyAttached { node: child });
            }
        }
        for child in children {
            self.push_back(parent, child);
        }
        Ok(())
    }

    /// Inserts `child` as the new first child of `parent`.
    ///
    /// An empty parent degenerates to an append; otherwise the node is
    /// spliced in before the current head.
    ///
    /// # Errors
    ///
    /// Same conditions as [`append_child`](Self::append_child).
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure_attachable(parent, child)?;
        match self.node(parent).first_child {
            Some(first) => self.link_before(parent, first, child),
            None => self.push_back(parent, child),
        }
        Ok(())
    }

    /// Splices `child` into `parent`'s child list immediately before
    /// `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotAChild`] if `anchor` is not currently a child
    /// of `parent`, plus the conditions of
    /// [`append_child`](Self::append_child) for `child`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        anchor: NodeId,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        self.ensure_child_of(parent, anchor)?;
        self.ensure_attachable(parent, child)?;
        self.link_before(parent, anchor, child);
        Ok(())
    }

    /// Splices `child` into `parent`'s child list immediately after
    /// `anchor`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`insert_before`](Self::insert_before).
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        anchor: NodeId,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        self.ensure_child_of(parent, anchor)?;
        self.ensure_attachable(parent, child)?;
        self.link_after(parent, anchor, child);
        Ok(())
    }

    /// Removes `child` from `parent`'s child list.
    ///
    /// The sibling chain is healed, the head/tail cache and child count are
    /// updated, the child's `parent`/`prev`/`next` links are cleared, and
    /// every property binding on `parent` that references `child` is
    /// scrubbed: a `Single` binding is dropped, sequence entries are removed
    /// in place (an emptied sequence stays bound). The detached node remains
    /// in the arena and may be re-attached anywhere in this tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if `parent` is a token, or
    /// [`TreeError::NotAChild`] if `child` is not currently linked under
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        self.ensure_child_of(parent, child)?;
        self.detach(child);
        self.scrub_bindings(parent, child);
        Ok(())
    }

    /// Removes and returns the first child of `parent`, or `Ok(None)` if
    /// `parent` has no children.
    ///
    /// Equivalent to [`remove_child`](Self::remove_child) of the current
    /// head, including the property scrub.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if `parent` is a token.
    pub fn remove_first(&mut self, parent: NodeId) -> Result<Option<NodeId>, TreeError> {
        self.ensure_composite(parent)?;
        let Some(first) = self.node(parent).first_child else {
            return Ok(None);
        };
        self.detach(first);
        self.scrub_bindings(parent, first);
        Ok(Some(first))
    }

    /// Replaces `old` with `new` in `parent`'s child list, preserving the
    /// position.
    ///
    /// `new` takes over `old`'s place in the sibling chain (head/tail cache
    /// adjusted, child count unchanged) and every property binding that
    /// referenced `old` is substituted to reference `new` instead. `old`'s
    /// link fields are cleared; it remains in the arena, detached.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if `parent` is a token,
    /// [`TreeError::NotAChild`] if `old` is not a child of `parent`,
    /// [`TreeError::AlreadyAttached`] if `new` already has a parent, or
    /// [`TreeError::SelfReference`] if `new` is `parent` or an ancestor of
    /// it. On error the tree is unchanged.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        self.ensure_child_of(parent, old)?;
        self.ensure_attachable(parent, new)?;

        self.rebind(parent, old, new);

        let prev = self.node(old).prev_sibling;
        let next = self.node(old).next_sibling;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(new).prev_sibling = prev;
        self.node_mut(new).next_sibling = next;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(new),
            None => self.node_mut(parent).first_child = Some(new),
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = Some(new),
            None => self.node_mut(parent).last_child = Some(new),
        }
        self.node_mut(old).parent = None;
        self.node_mut(old).prev_sibling = None;
        self.node_mut(old).next_sibling = None;
        Ok(())
    }

    /// Moves every child of `source` (in order) onto the end of `target`'s
    /// child list, then moves `source`'s property bindings into `target`,
    /// with `source`'s bindings winning name collisions.
    ///
    /// Afterwards `source` is an empty composite with no properties; the
    /// moved bindings keep referencing the moved children, which are now
    /// children of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] if either node is a token, or
    /// [`TreeError::SelfReference`] if `source` is `target` itself or an
    /// ancestor of it (its children cannot be moved beneath it). On error
    /// the tree is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use regraft::{SourcePos, SyntaxKind, SyntaxTree};
    ///
    /// let mut tree = SyntaxTree::new();
    /// let x = tree.create_composite(SyntaxKind(1));
    /// let y = tree.create_composite(SyntaxKind(1));
    /// let p = tree.create_token(SyntaxKind(2), "p", SourcePos::default());
    /// let q = tree.create_token(SyntaxKind(2), "q", SourcePos::default());
    /// tree.append_child(x, p).unwrap();
    /// tree.append_child(y, q).unwrap();
    ///
    /// tree.merge_node(x, y).unwrap();
    /// assert_eq!(tree.children(x).collect::<Vec<_>>(), vec![p, q]);
    /// assert_eq!(tree.child_count(y), 0);
    /// ```
    pub fn merge_node(&mut self, target: NodeId, source: NodeId) -> Result<(), TreeError> {
        self.ensure_composite(target)?;
        self.ensure_composite(source)?;
        if self.ancestors(target).any(|ancestor| ancestor == source) {
            return Err(TreeError::SelfReference {
                parent: target,
                node: source,
            });
        }
        while let Some(child) = self.node(source).first_child {
            self.detach(child);
            self.push_back(target, child);
        }
        let moved = match self.node_mut(source).properties_mut() {
            Some(map) => std::mem::take(map),
            None => PropertyMap::new(),
        };
        if let Some(map) = self.node_mut(target).properties_mut() {
            for (name, value) in moved {
                map.insert(name, value);
            }
        }
        Ok(())
    }

    // --- Validation ---

    fn ensure_composite(&self, id: NodeId) -> Result<(), TreeError> {
        if self.node(id).is_composite() {
            Ok(())
        } else {
            Err(TreeError::NotComposite { node: id })
        }
    }

    fn ensure_child_of(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.node(child).parent == Some(parent) {
            Ok(())
        } else {
            Err(TreeError::NotAChild {
                parent,
                node: child,
            })
        }
    }

    /// Checks that `node` may be linked under `parent`: the parent is a
    /// composite, the node is detached, and the link would not make `node`
    /// an ancestor of itself.
    fn ensure_attachable(&self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.ensure_composite(parent)?;
        if self.node(node).parent.is_some() {
            return Err(TreeError::AlreadyAttached { node });
        }
        if self.ancestors(parent).any(|ancestor| ancestor == node) {
            return Err(TreeError::SelfReference { parent, node });
        }
        Ok(())
    }

    // --- Link surgery ---
    //
    // The raw splices below assume their preconditions were validated and
    // cannot fail; each one leaves every invariant intact on its own.

    /// Raw tail append.
    fn push_back(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
        self.node_mut(parent).child_count += 1;
    }

    /// Raw splice of `child` before `anchor`, adjusting the head cache when
    /// `anchor` was the first child.
    fn link_before(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);

        if let Some(prev) = self.node(anchor).prev_sibling {
            self.node_mut(prev).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }

        self.node_mut(child).next_sibling = Some(anchor);
        self.node_mut(anchor).prev_sibling = Some(child);
        self.node_mut(parent).child_count += 1;
    }

    /// Raw splice of `child` after `anchor`, adjusting the tail cache when
    /// `anchor` was the last child.
    fn link_after(&mut self, parent: NodeId, anchor: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);

        if let Some(next) = self.node(anchor).next_sibling {
            self.node_mut(next).prev_sibling = Some(child);
            self.node_mut(child).next_sibling = Some(next);
        } else {
            self.node_mut(parent).last_child = Some(child);
        }

        self.node_mut(child).prev_sibling = Some(anchor);
        self.node_mut(anchor).next_sibling = Some(child);
        self.node_mut(parent).child_count += 1;
    }

    /// Raw unsplice: heals the sibling chain, fixes the parent's head/tail
    /// cache and child count, and clears the node's link fields. Does not
    /// touch property bindings.
    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        self.node_mut(id).parent = None;
        self.node_mut(id).prev_sibling = None;
        self.node_mut(id).next_sibling = None;
        self.node_mut(parent).child_count -= 1;
    }

    // --- Property bookkeeping ---

    /// Records a freshly appended child under `name`: vacant names bind
    /// `Single`, occupied single-value names promote to a `Sequence`,
    /// sequences grow at the end.
    fn bind_appended(&mut self, parent: NodeId, name: &str, child: NodeId) {
        let Some(map) = self.node_mut(parent).properties_mut() else {
            return;
        };
        if let Some(PropertyValue::Sequence(nodes)) = map.get_mut(name) {
            nodes.push(child);
            return;
        }
        let next = match map.get(name) {
            Some(PropertyValue::Single(prev)) => PropertyValue::Sequence(vec![*prev, child]),
            _ => PropertyValue::Single(child),
        };
        map.insert(name.to_string(), next);
    }

    /// Scrubs every binding on `parent` that references `child`: single
    /// bindings are dropped, sequence entries removed in place.
    fn scrub_bindings(&mut self, parent: NodeId, child: NodeId) {
        let Some(map) = self.node_mut(parent).properties_mut() else {
            return;
        };
        let mut dropped = Vec::new();
        for (name, value) in map.iter_mut() {
            match value {
                PropertyValue::Single(node) if *node == child => dropped.push(name.clone()),
                PropertyValue::Sequence(nodes) => nodes.retain(|&node| node != child),
                PropertyValue::Single(_) => {}
            }
        }
        for name in &dropped {
            map.shift_remove(name);
        }
    }

    /// Substitutes `new` for `old` in every binding on `parent`, preserving
    /// binding names and sequence positions.
    fn rebind(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let Some(map) = self.node_mut(parent).properties_mut() else {
            return;
        };
        for value in map.values_mut() {
            match value {
                PropertyValue::Single(node) if *node == old => *node = new,
                PropertyValue::Sequence(nodes) => {
                    for node in nodes.iter_mut() {
                        if *node == old {
                            *node = new;
                        }
                    }
                }
                PropertyValue::Single(_) => {}
            }
        }
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

/// Pre-order iterator over all descendants of a node.
pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Try to go deeper first
        if let Some(child) = self.tree.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Try next sibling
        if let Some(sibling) = self.tree.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.tree.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.tree.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.tree.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}

/// Document-order iterator over the tokens of a subtree.
pub struct Tokens<'a> {
    tree: &'a SyntaxTree,
    start: Option<NodeId>,
    inner: Descendants<'a>,
}

impl Iterator for Tokens<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.start.take() {
            return Some(start);
        }
        loop {
            let id = self.inner.next()?;
            if self.tree.node(id).is_token() {
                return Some(id);
            }
        }
    }
}
