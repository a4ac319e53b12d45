//! Sample component trees and table rows.

use searchgrid_core::{ComponentArena, ComponentId, ComponentKind, ComponentTree};
use serde_json::{Value, json};

/// Handles into [`sample_view`].
#[derive(Debug, Clone, Copy)]
pub struct SampleView {
    pub form: ComponentId,
    pub name: ComponentId,
    pub panel: ComponentId,
    pub save: ComponentId,
    pub group: ComponentId,
    pub cancel: ComponentId,
    pub other_form: ComponentId,
    pub other_name: ComponentId,
}

/// A small view:
///
/// ```text
/// root
/// ├── form (form)
/// │   ├── name
/// │   ├── panel (naming)
/// │   │   └── save
/// │   └── group
/// │       └── cancel
/// └── other (form)
///     └── name
/// ```
pub fn sample_view(separator: char) -> (ComponentArena, SampleView) {
    let mut arena = ComponentArena::new(separator);
    let root = arena.root();
    let form = arena.add(root, "form", ComponentKind::Form);
    let name = arena.add(form, "name", ComponentKind::Component);
    let panel = arena.add(form, "panel", ComponentKind::Naming);
    let save = arena.add(panel, "save", ComponentKind::Component);
    let group = arena.add(form, "group", ComponentKind::Component);
    let cancel = arena.add(group, "cancel", ComponentKind::Component);
    let other_form = arena.add(root, "other", ComponentKind::Form);
    let other_name = arena.add(other_form, "name", ComponentKind::Component);

    let view = SampleView {
        form,
        name,
        panel,
        save,
        group,
        cancel,
        other_form,
        other_name,
    };
    (arena, view)
}

/// Rows with a single `status` field.
pub fn status_rows(statuses: &[&str]) -> Vec<Value> {
    statuses
        .iter()
        .map(|status| json!({ "status": status }))
        .collect()
}

/// A handful of cars with brand, color and year.
pub fn car_rows() -> Vec<Value> {
    vec![
        json!({"brand": "Volvo", "color": "Black", "year": 2005}),
        json!({"brand": "Audi", "color": "White", "year": 2012}),
        json!({"brand": "Volkswagen", "color": "Blue", "year": 1998}),
        json!({"brand": "BMW", "color": "Black", "year": 2019}),
        json!({"brand": "Fiat", "color": null, "year": 2012}),
    ]
}
