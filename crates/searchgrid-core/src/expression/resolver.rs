//! Keyword resolvers and the registry that dispatches segments to them.
//!
//! Every `@keyword` is served by a [`SearchResolver`]. Segments without the
//! keyword prefix go to the id resolver, which performs a plain path lookup.
//! New keywords are added by registering another resolver.

use std::collections::BTreeMap;

use super::{ExpressionError, KEYWORD_PREFIX};
use crate::tree::{ComponentId, ComponentKind, ComponentTree};

/// Resolves one expression segment relative to an anchor component.
pub trait SearchResolver: Send + Sync {
    /// Resolve `expression` starting from `anchor`.
    ///
    /// `source` is the component the whole expression was written on; it
    /// equals `anchor` for the first hop of a chain.
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        anchor: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError>;

    /// Whether this keyword may appear as a link in a chained expression.
    fn nestable(&self) -> bool {
        true
    }

    /// Whether the expression only means something to the client.
    fn client_only(&self) -> bool {
        false
    }

    /// Whether the expression is handed to the client unchanged.
    fn pass_through(&self) -> bool {
        self.client_only()
    }
}

/// Plain id or path lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdResolver;

impl SearchResolver for IdResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        _source: ComponentId,
        anchor: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Ok(tree.find_by_path(anchor, expression))
    }
}

/// `@this`: the anchor itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThisResolver;

impl SearchResolver for ThisResolver {
    fn resolve(
        &self,
        _tree: &dyn ComponentTree,
        _source: ComponentId,
        anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Ok(Some(anchor))
    }
}

/// `@parent`
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentResolver;

impl SearchResolver for ParentResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        _source: ComponentId,
        anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Ok(tree.parent(anchor))
    }
}

/// Resolves to the closest ancestor (the anchor excluded) matching a kind
/// predicate. Serves `@form`, `@namingcontainer` and `@composite`.
#[derive(Debug, Clone, Copy)]
pub struct AncestorResolver {
    matches: fn(ComponentKind) -> bool,
}

impl AncestorResolver {
    /// `@form`
    pub fn form() -> Self {
        Self {
            matches: |k| k == ComponentKind::Form,
        }
    }

    /// `@namingcontainer`
    pub fn naming_container() -> Self {
        Self {
            matches: ComponentKind::is_naming_container,
        }
    }

    /// `@composite`
    pub fn composite() -> Self {
        Self {
            matches: |k| k == ComponentKind::Composite,
        }
    }
}

impl SearchResolver for AncestorResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        _source: ComponentId,
        anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        let mut current = tree.parent(anchor);
        while let Some(id) = current {
            if (self.matches)(tree.kind(id)) {
                return Ok(Some(id));
            }
            current = tree.parent(id);
        }
        Ok(None)
    }
}

/// `@child(n)`: the n-th child (zero based) of the anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildResolver;

impl SearchResolver for ChildResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        anchor: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        let index = keyword_argument(expression)
            .and_then(|arg| arg.trim().parse::<usize>().ok())
            .ok_or_else(|| ExpressionError::Malformed {
                expression: expression.to_string(),
                origin: tree.client_id(source),
                reason: "@child needs a numeric index, e.g. @child(0)".to_string(),
            })?;
        Ok(tree.children(anchor).get(index).copied())
    }
}

/// `@previous` and `@next`: a sibling of the anchor.
#[derive(Debug, Clone, Copy)]
pub struct SiblingResolver {
    offset: isize,
}

impl SiblingResolver {
    /// `@previous`
    pub fn previous() -> Self {
        Self { offset: -1 }
    }

    /// `@next`
    pub fn next() -> Self {
        Self { offset: 1 }
    }
}

impl SearchResolver for SiblingResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        _source: ComponentId,
        anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        let Some(parent) = tree.parent(anchor) else {
            return Ok(None);
        };
        let siblings = tree.children(parent);
        let sibling = siblings
            .iter()
            .position(|&c| c == anchor)
            .and_then(|pos| pos.checked_add_signed(self.offset))
            .and_then(|pos| siblings.get(pos).copied());
        Ok(sibling)
    }
}

/// `@all`: the whole view. Handed to the client as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllResolver;

impl SearchResolver for AllResolver {
    fn resolve(
        &self,
        tree: &dyn ComponentTree,
        _source: ComponentId,
        _anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Ok(Some(tree.root()))
    }

    fn nestable(&self) -> bool {
        false
    }

    fn pass_through(&self) -> bool {
        true
    }
}

/// `@none`: explicitly nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneResolver;

impl SearchResolver for NoneResolver {
    fn resolve(
        &self,
        _tree: &dyn ComponentTree,
        _source: ComponentId,
        _anchor: ComponentId,
        _expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Ok(None)
    }

    fn nestable(&self) -> bool {
        false
    }

    fn pass_through(&self) -> bool {
        true
    }
}

/// Client-side references (`@widgetVar(name)`, `@(selector)`) that have no
/// server-side counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientSideResolver;

impl SearchResolver for ClientSideResolver {
    fn resolve(
        &self,
        _tree: &dyn ComponentTree,
        _source: ComponentId,
        _anchor: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        Err(ExpressionError::Unsupported {
            expression: expression.to_string(),
        })
    }

    fn nestable(&self) -> bool {
        false
    }

    fn client_only(&self) -> bool {
        true
    }
}

/// Text between the first `(` and the last `)` of a keyword segment.
pub(crate) fn keyword_argument(expression: &str) -> Option<&str> {
    let open = expression.find('(')?;
    let close = expression.rfind(')')?;
    (close > open).then(|| &expression[open + 1..close])
}

/// Keyword-to-resolver dispatch table.
///
/// A registered keyword matches a segment when the segment equals it or
/// continues it with an argument list, e.g. `@child` matches `@child(2)`.
/// Keywords ending in `(` match by prefix. When several keywords match, the
/// longest wins.
pub struct ResolverRegistry {
    resolvers: BTreeMap<String, Box<dyn SearchResolver>>,
    id_resolver: IdResolver,
}

impl ResolverRegistry {
    /// Create a registry that only knows plain id lookups.
    pub fn new() -> Self {
        Self {
            resolvers: BTreeMap::new(),
            id_resolver: IdResolver,
        }
    }

    /// Create a registry with all built-in keywords.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("@this", Box::new(ThisResolver));
        registry.register("@parent", Box::new(ParentResolver));
        registry.register("@form", Box::new(AncestorResolver::form()));
        registry.register(
            "@namingcontainer",
            Box::new(AncestorResolver::naming_container()),
        );
        registry.register("@composite", Box::new(AncestorResolver::composite()));
        registry.register("@child", Box::new(ChildResolver));
        registry.register("@previous", Box::new(SiblingResolver::previous()));
        registry.register("@next", Box::new(SiblingResolver::next()));
        registry.register("@all", Box::new(AllResolver));
        registry.register("@none", Box::new(NoneResolver));
        registry.register("@widgetVar", Box::new(ClientSideResolver));
        registry.register("@(", Box::new(ClientSideResolver));
        registry
    }

    /// Register (or replace) the resolver for a keyword.
    pub fn register(&mut self, keyword: impl Into<String>, resolver: Box<dyn SearchResolver>) {
        self.resolvers.insert(keyword.into(), resolver);
    }

    /// Find the resolver for a single, trimmed segment.
    ///
    /// Returns `None` only for an unregistered `@keyword`.
    pub fn find(&self, segment: &str) -> Option<&dyn SearchResolver> {
        if !segment.starts_with(KEYWORD_PREFIX) {
            return Some(&self.id_resolver);
        }

        self.resolvers
            .iter()
            .filter(|(keyword, _)| keyword_matches(keyword, segment))
            .max_by_key(|(keyword, _)| keyword.len())
            .map(|(_, resolver)| resolver.as_ref())
    }

    /// All registered keywords, sorted.
    pub fn keywords(&self) -> Vec<&str> {
        self.resolvers.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn keyword_matches(keyword: &str, segment: &str) -> bool {
    match segment.strip_prefix(keyword) {
        Some("") => true,
        Some(rest) => keyword.ends_with('(') || rest.starts_with('('),
        None => false,
    }
}
