//! Search expression resolution.
//!
//! A search expression names one or more components relative to a source
//! component:
//!
//! - plain ids and paths: `name`, `panel:save`, `:form:name` (absolute);
//! - keywords: `@this`, `@parent`, `@form`, `@child(2)`, `@all`, `@none`, ...;
//! - chains of both, joined by the separator: `@parent:@parent`,
//!   `@form:panel`, `:form:@child(0)`.
//!
//! A list of expressions separated by commas or whitespace is split with
//! [`split_expressions`] and resolved item by item.
//!
//! Grammar checks are only performed in [`ProjectStage::Development`]. In
//! production, malformed expressions go straight to resolution and usually
//! end in [`ExpressionError::ComponentNotFound`].

mod resolver;
mod split;

pub use resolver::{
    AllResolver, AncestorResolver, ChildResolver, ClientSideResolver, IdResolver, NoneResolver,
    ParentResolver, ResolverRegistry, SearchResolver, SiblingResolver, ThisResolver,
};
pub use split::{split_expressions, split_segments};

use searchgrid_config::{ExpressionsConfig, ProjectStage};
use tracing::debug;

use crate::tree::{ComponentId, ComponentTree};

/// Marker that starts a keyword.
pub const KEYWORD_PREFIX: char = '@';

/// The keyword meaning "no target".
pub const NONE_KEYWORD: &str = "@none";

/// Errors from search expression resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("malformed search expression \"{expression}\" from \"{origin}\": {reason}")]
    Malformed {
        expression: String,
        origin: String,
        reason: String,
    },

    #[error(
        "cannot find component for \"{segment}\" from \"{anchor}\" in expression \"{expression}\" referenced from \"{origin}\""
    )]
    ComponentNotFound {
        segment: String,
        anchor: String,
        expression: String,
        origin: String,
    },

    #[error("client side expression cannot be resolved on the server: {expression}")]
    Unsupported { expression: String },

    #[error("no resolver registered for \"{keyword}\" in expression \"{expression}\"")]
    UnknownKeyword { keyword: String, expression: String },
}

/// Resolves search expressions against a [`ComponentTree`].
///
/// Holds no per-call state; one instance can serve every request.
pub struct ExpressionResolver {
    registry: ResolverRegistry,
    stage: ProjectStage,
}

impl ExpressionResolver {
    /// Create a resolver with the built-in keywords.
    pub fn new(stage: ProjectStage) -> Self {
        Self::with_registry(ResolverRegistry::with_builtins(), stage)
    }

    /// Create a resolver with a custom keyword registry.
    pub fn with_registry(registry: ResolverRegistry, stage: ProjectStage) -> Self {
        Self { registry, stage }
    }

    /// Create a resolver from the `[expressions]` config section.
    pub fn from_config(config: &ExpressionsConfig) -> Self {
        Self::new(config.stage)
    }

    /// The project stage this resolver validates for.
    pub fn stage(&self) -> ProjectStage {
        self.stage
    }

    /// The keyword registry.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Resolve a list of expressions to components.
    ///
    /// Expressions resolving to nothing (`@none`) are dropped; order is kept.
    pub fn resolve_components(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expressions: &str,
    ) -> Result<Vec<ComponentId>, ExpressionError> {
        let mut components = Vec::new();
        for expression in split_expressions(expressions) {
            if let Some(component) = self.resolve_component(tree, source, &expression)? {
                components.push(component);
            }
        }
        Ok(components)
    }

    /// Resolve a list of expressions to client tokens joined by single spaces.
    ///
    /// Never returns an empty string: nothing resolved means [`NONE_KEYWORD`].
    pub fn resolve_components_for_client(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expressions: &str,
    ) -> Result<String, ExpressionError> {
        let mut tokens = Vec::new();
        for expression in split_expressions(expressions) {
            if let Some(token) = self.resolve_component_for_client(tree, source, &expression)? {
                tokens.push(token);
            }
        }

        if tokens.is_empty() {
            return Ok(NONE_KEYWORD.to_string());
        }
        Ok(tokens.join(" "))
    }

    /// Resolve one expression to a client token.
    ///
    /// Pass-through expressions come back verbatim, everything else as the
    /// resolved component's client id. Blank input yields `None`.
    pub fn resolve_component_for_client(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expression: &str,
    ) -> Result<Option<String>, ExpressionError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(None);
        }

        self.validate(tree, source, expression)?;

        if self.is_pass_through(tree, expression) {
            return Ok(Some(expression.to_string()));
        }

        let component = self.resolve_internal(tree, source, expression)?;
        Ok(component.map(|c| tree.client_id(c)))
    }

    /// Resolve one expression to a component.
    ///
    /// Returns `None` for blank input and for `@none`. Client-only
    /// expressions fail with [`ExpressionError::Unsupported`].
    pub fn resolve_component(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(None);
        }

        self.validate(tree, source, expression)?;

        if expression == NONE_KEYWORD {
            return Ok(None);
        }

        if self.is_client_only(tree, expression) {
            return Err(ExpressionError::Unsupported {
                expression: expression.to_string(),
            });
        }

        self.resolve_internal(tree, source, expression)
    }

    /// Resolver for a whole expression, if it is a single segment.
    fn single_segment_resolver(
        &self,
        tree: &dyn ComponentTree,
        expression: &str,
    ) -> Option<&dyn SearchResolver> {
        let segments = split_segments(expression, tree.separator());
        match segments.as_slice() {
            [segment] => self.registry.find(segment.trim()),
            _ => None,
        }
    }

    fn is_pass_through(&self, tree: &dyn ComponentTree, expression: &str) -> bool {
        self.single_segment_resolver(tree, expression)
            .is_some_and(|r| r.pass_through())
    }

    fn is_client_only(&self, tree: &dyn ComponentTree, expression: &str) -> bool {
        self.single_segment_resolver(tree, expression)
            .is_some_and(|r| r.client_only())
    }

    fn validate(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expression: &str,
    ) -> Result<(), ExpressionError> {
        if self.stage != ProjectStage::Development {
            return Ok(());
        }

        let separator = tree.separator();
        let malformed = |reason: String| ExpressionError::Malformed {
            expression: expression.to_string(),
            origin: tree.client_id(source),
            reason,
        };

        // Keywords are always relative to the nearest component.
        if expression
            .strip_prefix(separator)
            .is_some_and(|rest| rest.starts_with(KEYWORD_PREFIX))
        {
            return Err(malformed(
                "an expression must not start with the separator followed by a keyword"
                    .to_string(),
            ));
        }

        let segments = split_segments(expression, separator);
        if segments.len() > 1 {
            for segment in segments {
                let segment = segment.trim();
                if let Some(resolver) = self.registry.find(segment) {
                    if !resolver.nestable() {
                        return Err(malformed(format!(
                            "subexpression \"{segment}\" can not be nested"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn resolve_internal(
        &self,
        tree: &dyn ComponentTree,
        source: ComponentId,
        expression: &str,
    ) -> Result<Option<ComponentId>, ExpressionError> {
        let separator = tree.separator();
        let not_found = |segment: &str, anchor: ComponentId| ExpressionError::ComponentNotFound {
            segment: segment.to_string(),
            anchor: tree.client_id(anchor),
            expression: expression.to_string(),
            origin: tree.client_id(source),
        };

        if !expression.contains(KEYWORD_PREFIX) {
            return tree
                .find_by_path(source, expression)
                .map(Some)
                .ok_or_else(|| not_found(expression, source));
        }

        if !expression.contains(separator) {
            let resolver = self.find_resolver(expression, expression)?;
            return resolver
                .resolve(tree, source, source, expression)?
                .map(Some)
                .ok_or_else(|| not_found(expression, source));
        }

        let (absolute, chain) = match expression.strip_prefix(separator) {
            Some(rest) => (true, rest),
            None => (false, expression),
        };

        let mut anchor = source;
        for (position, segment) in split_segments(chain, separator).into_iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            // Only the first hop of an absolute expression is searched from the root.
            let segment = if position == 0 && absolute && !segment.contains(KEYWORD_PREFIX) {
                format!("{separator}{segment}")
            } else {
                segment.to_string()
            };

            let resolver = self.find_resolver(&segment, expression)?;
            let next = resolver
                .resolve(tree, source, anchor, &segment)?
                .ok_or_else(|| not_found(&segment, anchor))?;
            debug!(
                segment = %segment,
                from = %tree.client_id(anchor),
                to = %tree.client_id(next),
                "Resolved search expression hop"
            );
            anchor = next;
        }

        Ok(Some(anchor))
    }

    fn find_resolver(
        &self,
        segment: &str,
        expression: &str,
    ) -> Result<&dyn SearchResolver, ExpressionError> {
        self.registry
            .find(segment)
            .ok_or_else(|| ExpressionError::UnknownKeyword {
                keyword: segment.to_string(),
                expression: expression.to_string(),
            })
    }
}

impl Default for ExpressionResolver {
    fn default() -> Self {
        Self::new(ProjectStage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ComponentArena, ComponentKind};
    use pretty_assertions::assert_eq;

    struct Fixture {
        arena: ComponentArena,
        form: ComponentId,
        name: ComponentId,
        panel: ComponentId,
        save: ComponentId,
    }

    /// root > form(form) > [name, panel(naming) > [save]]
    fn fixture() -> Fixture {
        let mut arena = ComponentArena::new(':');
        let root = arena.root();
        let form = arena.add(root, "form", ComponentKind::Form);
        let name = arena.add(form, "name", ComponentKind::Component);
        let panel = arena.add(form, "panel", ComponentKind::Naming);
        let save = arena.add(panel, "save", ComponentKind::Component);
        Fixture {
            arena,
            form,
            name,
            panel,
            save,
        }
    }

    #[test]
    fn test_plain_id_is_direct_lookup() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        for expr in ["panel", "save", ":form:name", ":form:panel:save"] {
            let direct = f.arena.find_by_path(f.save, expr);
            assert!(direct.is_some(), "{expr} should be visible from save");
            assert_eq!(
                resolver.resolve_component(&f.arena, f.save, expr).unwrap(),
                direct
            );
        }
        assert_eq!(
            resolver.resolve_component(&f.arena, f.name, "panel:save").unwrap(),
            Some(f.save)
        );
        // "name" lives outside the panel, so a relative lookup misses it.
        assert!(matches!(
            resolver.resolve_component(&f.arena, f.save, "name"),
            Err(ExpressionError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn test_single_keywords() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        assert_eq!(
            resolver.resolve_component(&f.arena, f.save, "@this").unwrap(),
            Some(f.save)
        );
        assert_eq!(
            resolver.resolve_component(&f.arena, f.save, "@parent").unwrap(),
            Some(f.panel)
        );
        assert_eq!(
            resolver.resolve_component(&f.arena, f.save, "@form").unwrap(),
            Some(f.form)
        );
        assert_eq!(
            resolver.resolve_component(&f.arena, f.save, "@none").unwrap(),
            None
        );
        assert_eq!(
            resolver.resolve_component(&f.arena, f.save, "@all").unwrap(),
            Some(f.arena.root())
        );
    }

    #[test]
    fn test_chained_parent() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        let chained = resolver
            .resolve_component(&f.arena, f.save, "@parent:@parent")
            .unwrap();
        let once = resolver
            .resolve_component(&f.arena, f.save, "@parent")
            .unwrap()
            .unwrap();
        let twice = resolver
            .resolve_component(&f.arena, once, "@parent")
            .unwrap();
        assert_eq!(chained, twice);
        assert_eq!(chained, Some(f.form));
    }

    #[test]
    fn test_absolute_first_hop() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        // Relative: "name" is not visible from inside the panel.
        let err = resolver
            .resolve_component(&f.arena, f.save, "name:@parent")
            .unwrap_err();
        assert!(matches!(err, ExpressionError::ComponentNotFound { .. }));
        // Absolute: searched from the root.
        assert_eq!(
            resolver
                .resolve_component(&f.arena, f.save, ":form:@child(1)")
                .unwrap(),
            Some(f.panel)
        );
    }

    #[test]
    fn test_not_found_message_is_diagnosable() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        let err = resolver
            .resolve_component(&f.arena, f.save, "@parent:missing")
            .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::ComponentNotFound {
                segment: "missing".to_string(),
                anchor: "form:panel".to_string(),
                expression: "@parent:missing".to_string(),
                origin: "form:panel:save".to_string(),
            }
        );
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("form:panel:save"));
    }

    #[test]
    fn test_client_only_is_unsupported() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        let err = resolver
            .resolve_component(&f.arena, f.save, "@widgetVar(dlg)")
            .unwrap_err();
        assert_eq!(
            err,
            ExpressionError::Unsupported {
                expression: "@widgetVar(dlg)".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_keyword() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        let err = resolver
            .resolve_component(&f.arena, f.save, "@bogus")
            .unwrap_err();
        assert!(matches!(err, ExpressionError::UnknownKeyword { .. }));
    }

    #[test]
    fn test_validation_only_in_development() {
        let f = fixture();
        let dev = ExpressionResolver::new(ProjectStage::Development);
        let prod = ExpressionResolver::new(ProjectStage::Production);

        let err = dev
            .resolve_component(&f.arena, f.save, ":@parent")
            .unwrap_err();
        assert!(matches!(err, ExpressionError::Malformed { .. }));
        // Production skips the check; the leading separator is stripped.
        assert_eq!(
            prod.resolve_component(&f.arena, f.save, ":@parent").unwrap(),
            Some(f.panel)
        );

        let err = dev
            .resolve_component(&f.arena, f.save, "@parent:@all")
            .unwrap_err();
        assert!(err.to_string().contains("@all"));
        assert_eq!(
            prod.resolve_component(&f.arena, f.save, "@parent:@all")
                .unwrap(),
            Some(f.arena.root())
        );
    }

    #[test]
    fn test_for_client() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        assert_eq!(
            resolver
                .resolve_component_for_client(&f.arena, f.save, "  ")
                .unwrap(),
            None
        );
        assert_eq!(
            resolver
                .resolve_component_for_client(&f.arena, f.save, "@widgetVar(dlg)")
                .unwrap(),
            Some("@widgetVar(dlg)".to_string())
        );
        assert_eq!(
            resolver
                .resolve_component_for_client(&f.arena, f.save, "@parent")
                .unwrap(),
            Some("form:panel".to_string())
        );
        assert_eq!(
            resolver
                .resolve_components_for_client(&f.arena, f.save, "@this, @form @all")
                .unwrap(),
            "form:panel:save form @all"
        );
        assert_eq!(
            resolver
                .resolve_components_for_client(&f.arena, f.save, " ")
                .unwrap(),
            NONE_KEYWORD
        );
    }

    #[test]
    fn test_resolve_components_drops_none() {
        let f = fixture();
        let resolver = ExpressionResolver::default();
        let found = resolver
            .resolve_components(&f.arena, f.save, "@this @none,@parent")
            .unwrap();
        assert_eq!(found, vec![f.save, f.panel]);
        assert!(
            resolver
                .resolve_components(&f.arena, f.save, "")
                .unwrap()
                .is_empty()
        );
    }
}
