//! Arena-based construct tree.
//!
//! The [`App`] owns every construct in a generational arena. Children are
//! owned through their parent's ordered child list; the parent link stored in
//! each node is a plain arena index used for address computation only.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::address::Address;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::name::validate_local_name;
use crate::domain::value::Data;

/// Kind of construct, selecting how it is laid out during synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    App,
    Stack,
    Workflow,
    Job,
    Scope,
    Node,
}

/// Where a construct's assembled entries end up in its parent's mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Nested under the construct's local name.
    Keyed,
    /// Entries hoisted directly into the parent's mapping.
    Inline,
}

/// How top-level data keys are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    Verbatim,
    /// camelCase keys become kebab-case, at the top level and at the top
    /// level of each mapping inside the listed sequence keys.
    Kebab { sequences: &'static [&'static str] },
}

/// Synthesis rules for one construct kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub placement: Placement,
    /// Key under which all children are grouped, `None` to merge them directly.
    pub children_key: Option<&'static str>,
    pub key_style: KeyStyle,
}

impl ConstructKind {
    pub fn layout(self) -> Layout {
        match self {
            ConstructKind::App | ConstructKind::Stack => Layout {
                placement: Placement::Inline,
                children_key: None,
                key_style: KeyStyle::Verbatim,
            },
            ConstructKind::Workflow => Layout {
                placement: Placement::Keyed,
                children_key: Some("jobs"),
                key_style: KeyStyle::Kebab { sequences: &[] },
            },
            ConstructKind::Job => Layout {
                placement: Placement::Keyed,
                children_key: None,
                key_style: KeyStyle::Kebab {
                    sequences: &["steps"],
                },
            },
            ConstructKind::Scope | ConstructKind::Node => Layout {
                placement: Placement::Keyed,
                children_key: None,
                key_style: KeyStyle::Verbatim,
            },
        }
    }

    /// Whether a construct of this kind may be created below `parent`.
    pub fn accepts_parent(self, parent: ConstructKind) -> bool {
        match self {
            ConstructKind::App => false,
            ConstructKind::Job => parent == ConstructKind::Workflow,
            ConstructKind::Stack
            | ConstructKind::Workflow
            | ConstructKind::Scope
            | ConstructKind::Node => matches!(
                parent,
                ConstructKind::App | ConstructKind::Stack | ConstructKind::Scope
            ),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConstructKind::App => "app",
            ConstructKind::Stack => "stack",
            ConstructKind::Workflow => "workflow",
            ConstructKind::Job => "job",
            ConstructKind::Scope => "scope",
            ConstructKind::Node => "node",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AppId(u64);

static NEXT_APP_ID: AtomicU64 = AtomicU64::new(1);

impl AppId {
    fn next() -> Self {
        Self(NEXT_APP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to any construct of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    app: AppId,
    index: Index,
}

impl NodeId {
    pub(crate) fn index(self) -> Index {
        self.index
    }
}

/// Handle to a construct that may own children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(NodeId);

impl From<ScopeId> for NodeId {
    fn from(scope: ScopeId) -> Self {
        scope.0
    }
}

/// Tree node in the construct arena.
#[derive(Debug)]
pub struct Node {
    name: String,
    kind: ConstructKind,
    data: Data,
    parent: Option<Index>,
    children: Vec<Index>,
    child_names: HashSet<String>,
}

impl Node {
    /// Local name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConstructKind {
        self.kind
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child_names.contains(name)
    }

    pub(crate) fn child_indices(&self) -> &[Index] {
        &self.children
    }
}

/// Root scope owning the whole construct tree.
#[derive(Debug)]
pub struct App {
    id: AppId,
    arena: Arena<Node>,
    root: Index,
    finalized: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(Node {
            name: String::new(),
            kind: ConstructKind::App,
            data: Data::new(),
            parent: None,
            children: Vec::new(),
            child_names: HashSet::new(),
        });
        Self {
            id: AppId::next(),
            arena,
            root,
            finalized: false,
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(self.handle(self.root))
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Add a grouping construct whose entries are hoisted into its parent.
    pub fn add_stack(&mut self, parent: ScopeId, name: &str) -> DomainResult<ScopeId> {
        self.insert_node(parent, name, ConstructKind::Stack, Data::new())
            .map(ScopeId)
    }

    /// Add a workflow; its children are grouped under `jobs`.
    pub fn add_workflow(
        &mut self,
        parent: ScopeId,
        name: &str,
        data: Data,
    ) -> DomainResult<ScopeId> {
        self.insert_node(parent, name, ConstructKind::Workflow, data)
            .map(ScopeId)
    }

    /// Add a job to a workflow.
    pub fn add_job(&mut self, workflow: ScopeId, name: &str, data: Data) -> DomainResult<NodeId> {
        self.insert_node(workflow, name, ConstructKind::Job, data)
    }

    /// Add a generic scope nested under its local name.
    pub fn add_scope(&mut self, parent: ScopeId, name: &str, data: Data) -> DomainResult<ScopeId> {
        self.insert_node(parent, name, ConstructKind::Scope, data)
            .map(ScopeId)
    }

    /// Add a generic leaf nested under its local name.
    pub fn add_node(&mut self, parent: ScopeId, name: &str, data: Data) -> DomainResult<NodeId> {
        self.insert_node(parent, name, ConstructKind::Node, data)
    }

    #[instrument(level = "trace", skip(self, data))]
    fn insert_node(
        &mut self,
        parent: ScopeId,
        name: &str,
        kind: ConstructKind,
        data: Data,
    ) -> DomainResult<NodeId> {
        if self.finalized {
            return Err(DomainError::Finalized);
        }
        let parent_idx = self.resolve(parent.into())?;
        let parent_node = &self.arena[parent_idx];

        if !kind.accepts_parent(parent_node.kind) {
            return Err(DomainError::InvalidParent {
                parent: self.address_of(parent_idx),
                parent_kind: parent_node.kind,
                child: kind,
            });
        }
        validate_local_name(name)?;
        if parent_node.child_names.contains(name) {
            return Err(DomainError::DuplicateName {
                scope: self.address_of(parent_idx),
                name: name.to_string(),
            });
        }

        let node_idx = self.arena.insert(Node {
            name: name.to_string(),
            kind,
            data,
            parent: Some(parent_idx),
            children: Vec::new(),
            child_names: HashSet::new(),
        });
        let parent_node = &mut self.arena[parent_idx];
        parent_node.children.push(node_idx);
        parent_node.child_names.insert(name.to_string());

        debug!("added {} '{}' under {}", kind, name, self.address_of(parent_idx));
        Ok(self.handle(node_idx))
    }

    fn handle(&self, index: Index) -> NodeId {
        NodeId {
            app: self.id,
            index,
        }
    }

    fn resolve(&self, id: NodeId) -> DomainResult<Index> {
        if id.app != self.id || !self.arena.contains(id.index) {
            return Err(DomainError::UnknownNode);
        }
        Ok(id.index)
    }

    pub fn get(&self, id: impl Into<NodeId>) -> Option<&Node> {
        let id = id.into();
        self.resolve(id).ok().and_then(|idx| self.arena.get(idx))
    }

    pub(crate) fn node_at(&self, idx: Index) -> Option<&Node> {
        self.arena.get(idx)
    }

    /// Parent handle; `None` for the root or a foreign handle.
    pub fn parent(&self, id: impl Into<NodeId>) -> Option<ScopeId> {
        let idx = self.resolve(id.into()).ok()?;
        self.arena[idx].parent.map(|p| ScopeId(self.handle(p)))
    }

    /// Children of a scope in insertion order.
    pub fn children(&self, scope: ScopeId) -> Vec<NodeId> {
        self.resolve(scope.into())
            .map(|idx| {
                self.arena[idx]
                    .children
                    .iter()
                    .map(|&child| self.handle(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fully-qualified address of a construct.
    pub fn address(&self, id: impl Into<NodeId>) -> DomainResult<Address> {
        let idx = self.resolve(id.into())?;
        Ok(self.address_of(idx))
    }

    pub(crate) fn address_of(&self, idx: Index) -> Address {
        let mut names = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let Some(node) = self.arena.get(i) else { break };
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.into_iter().rev().collect()
    }

    /// Number of constructs, including the root.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Depth-first pre-order traversal in insertion order.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Depth-first post-order traversal in insertion order.
    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.arena.get(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Addresses of all leaf constructs in traversal order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_nodes(&self) -> Vec<Address> {
        self.iter()
            .filter(|(_, node)| node.is_leaf() && node.parent.is_some())
            .map(|(id, _)| self.address_of(id.index))
            .collect()
    }
}

pub struct TreeIterator<'a> {
    app: &'a App,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(app: &'a App) -> Self {
        Self {
            app,
            stack: vec![app.root],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.app.arena.get(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((self.app.handle(current_idx), node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    app: &'a App,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(app: &'a App) -> Self {
        Self {
            app,
            stack: vec![(app.root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.app.arena.get(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((self.app.handle(current_idx), node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preorder_and_postorder_follow_insertion_order() {
        let mut app = App::new();
        let root = app.root();
        let a = app.add_scope(root, "a", Data::new()).unwrap();
        app.add_node(a, "a1", Data::new()).unwrap();
        app.add_node(root, "b", Data::new()).unwrap();

        let pre: Vec<&str> = app.iter().map(|(_, n)| n.name()).collect();
        assert_eq!(pre, vec!["", "a", "a1", "b"]);

        let post: Vec<&str> = app.iter_postorder().map(|(_, n)| n.name()).collect();
        assert_eq!(post, vec!["a1", "a", "b", ""]);
    }

    #[test]
    fn depth_counts_root() {
        let mut app = App::new();
        assert_eq!(app.depth(), 1);
        let root = app.root();
        let a = app.add_scope(root, "a", Data::new()).unwrap();
        app.add_node(a, "leaf", Data::new()).unwrap();
        assert_eq!(app.depth(), 3);
    }

    #[test]
    fn handles_from_another_app_are_rejected() {
        let mut first = App::new();
        let second = App::new();
        let err = first.add_node(second.root(), "x", Data::new()).unwrap_err();
        assert_eq!(err, DomainError::UnknownNode);
        assert!(first.get(second.root()).is_none());
    }
}
