//! Component tree capability and an in-memory arena implementation.
//!
//! Search expressions are resolved against a [`ComponentTree`]. The trait is
//! the only thing the resolver knows about the host's component model: path
//! lookup, client ids, the separator character, and parent/child navigation
//! for keyword resolvers.
//!
//! [`ComponentArena`] is a flat, index-based tree that follows the classic
//! naming-container rules:
//!
//! - a path with a leading separator is searched from the root;
//! - otherwise the search starts at the closest naming container enclosing
//!   the anchor (the anchor itself if it is one);
//! - every further path segment must name a component inside the naming
//!   container matched by the previous segment.

use serde::{Deserialize, Serialize};

/// Handle to a node in a [`ComponentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node is, as far as search expressions care.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// The view root. Has no id of its own.
    Root,
    /// An ordinary component.
    #[default]
    Component,
    /// A form; also a naming container.
    Form,
    /// A plain naming container.
    Naming,
    /// A composite component; also a naming container.
    Composite,
}

impl ComponentKind {
    /// Whether ids of descendants are namespaced by this node.
    pub fn is_naming_container(self) -> bool {
        matches!(
            self,
            ComponentKind::Form | ComponentKind::Naming | ComponentKind::Composite
        )
    }
}

/// The lookup capability search expressions are resolved against.
pub trait ComponentTree {
    /// Naming container separator character.
    fn separator(&self) -> char;

    /// The view root.
    fn root(&self) -> ComponentId;

    /// Parent of `id`, `None` for the root.
    fn parent(&self, id: ComponentId) -> Option<ComponentId>;

    /// Children of `id` in document order.
    fn children(&self, id: ComponentId) -> &[ComponentId];

    /// Kind of `id`.
    fn kind(&self, id: ComponentId) -> ComponentKind;

    /// Fully qualified client id of `id`.
    fn client_id(&self, id: ComponentId) -> String;

    /// Find a component by a relative or absolute (leading separator) path.
    fn find_by_path(&self, anchor: ComponentId, path: &str) -> Option<ComponentId>;
}

/// Declarative description of a subtree, used to build an arena from
/// JSON or TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Component id, unique among siblings within a naming container.
    pub id: String,

    /// Component kind.
    #[serde(default)]
    pub kind: ComponentKind,

    /// Child components.
    #[serde(default)]
    pub children: Vec<ComponentSpec>,
}

#[derive(Debug, Clone)]
struct Node {
    id: String,
    kind: ComponentKind,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
}

/// Index-based in-memory component tree.
#[derive(Debug, Clone)]
pub struct ComponentArena {
    nodes: Vec<Node>,
    separator: char,
}

impl ComponentArena {
    /// Create an arena holding only the view root.
    pub fn new(separator: char) -> Self {
        Self {
            nodes: vec![Node {
                id: String::new(),
                kind: ComponentKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            separator,
        }
    }

    /// Build an arena whose root has the given children.
    pub fn from_specs(separator: char, specs: &[ComponentSpec]) -> Self {
        let mut arena = Self::new(separator);
        let root = arena.root();
        for spec in specs {
            arena.add_spec(root, spec);
        }
        arena
    }

    fn add_spec(&mut self, parent: ComponentId, spec: &ComponentSpec) {
        let id = self.add(parent, &spec.id, spec.kind);
        for child in &spec.children {
            self.add_spec(id, child);
        }
    }

    /// Append a child under `parent` and return its handle.
    pub fn add(&mut self, parent: ComponentId, id: &str, kind: ComponentKind) -> ComponentId {
        let handle = ComponentId(self.nodes.len());
        self.nodes.push(Node {
            id: id.to_string(),
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(handle);
        handle
    }

    /// The local (unqualified) id of a node.
    pub fn local_id(&self, id: ComponentId) -> &str {
        &self.nodes[id.0].id
    }

    /// Find a node by its fully qualified client id.
    pub fn find_by_client_id(&self, client_id: &str) -> Option<ComponentId> {
        let path = format!("{}{}", self.separator, client_id);
        self.find_by_path(self.root(), &path)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Closest naming container at or above `id`, falling back to the root.
    fn search_base(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        loop {
            let node = &self.nodes[current.0];
            if node.kind.is_naming_container() {
                return current;
            }
            match node.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Depth-first search below `base` that does not descend into nested
    /// naming containers (but does match their ids).
    fn find_within(&self, base: ComponentId, id: &str) -> Option<ComponentId> {
        for &child in &self.nodes[base.0].children {
            let node = &self.nodes[child.0];
            if node.id == id {
                return Some(child);
            }
            if !node.kind.is_naming_container() {
                if let Some(found) = self.find_within(child, id) {
                    return Some(found);
                }
            }
        }
        None
    }
}

impl ComponentTree for ComponentArena {
    fn separator(&self) -> char {
        self.separator
    }

    fn root(&self) -> ComponentId {
        ComponentId(0)
    }

    fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn kind(&self, id: ComponentId) -> ComponentKind {
        self.nodes[id.0].kind
    }

    fn client_id(&self, id: ComponentId) -> String {
        let mut parts = vec![self.nodes[id.0].id.as_str()];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            let node = &self.nodes[parent.0];
            if node.kind.is_naming_container() {
                parts.push(node.id.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        parts.join(&self.separator.to_string())
    }

    fn find_by_path(&self, anchor: ComponentId, path: &str) -> Option<ComponentId> {
        if path.is_empty() {
            return None;
        }

        let (base, path) = match path.strip_prefix(self.separator) {
            Some(rest) => (self.root(), rest),
            None => (self.search_base(anchor), path),
        };

        let mut segments = path.split(self.separator);
        let first = segments.next()?;
        let mut result = if self.nodes[base.0].id == first && base != self.root() {
            base
        } else {
            self.find_within(base, first)?
        };

        for segment in segments {
            if !self.nodes[result.0].kind.is_naming_container() {
                return None;
            }
            result = self.find_within(result, segment)?;
        }

        Some(result)
    }
}
