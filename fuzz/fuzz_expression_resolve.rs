//! Fuzz target for expression splitting and resolution.
//!
//! Run with: cargo +nightly fuzz run fuzz_expression_resolve
//!
//! Splits arbitrary input and resolves every piece against a small fixed
//! tree in both project stages. Errors are fine; panics are not.

#![no_main]

use libfuzzer_sys::fuzz_target;
use searchgrid_config::ProjectStage;
use searchgrid_core::{
    ComponentArena, ComponentKind, ComponentTree, ExpressionResolver, split_expressions,
};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut tree = ComponentArena::new(':');
    let root = tree.root();
    let form = tree.add(root, "form", ComponentKind::Form);
    let panel = tree.add(form, "panel", ComponentKind::Naming);
    let source = tree.add(panel, "save", ComponentKind::Component);
    tree.add(form, "name", ComponentKind::Component);

    // Splitting is idempotent on its own output.
    for piece in split_expressions(input) {
        assert_eq!(split_expressions(&piece), vec![piece.clone()]);
    }

    for stage in [ProjectStage::Development, ProjectStage::Production] {
        let resolver = ExpressionResolver::new(stage);
        let _ = resolver.resolve_components(&tree, source, input);
        if let Ok(tokens) = resolver.resolve_components_for_client(&tree, source, input) {
            assert!(!tokens.is_empty());
        }
    }
});
