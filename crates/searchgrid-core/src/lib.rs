#![deny(unsafe_code)]

//! Search expression resolution and data table filtering.
//!
//! Two independent engines share this crate:
//!
//! - [`expression`] turns PrimeFaces-style search expressions such as
//!   `@form:panel @parent` into component handles or client id tokens,
//!   resolved against any [`ComponentTree`];
//! - [`filter`] applies per-column and global filter requests to a
//!   [`DataTable`] and records the matched rows.
//!
//! [`diagnostics`] captures warnings either engine emits so hosts can
//! surface them.

/// Warning capture as a `tracing` layer.
pub mod diagnostics;
/// Search expression splitting and resolution.
pub mod expression;
/// Data table column and global filtering.
pub mod filter;
/// Field access on table rows.
pub mod rows;
/// Component tree capability and the in-memory arena.
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticReader};
pub use expression::{
    ExpressionError, ExpressionResolver, ResolverRegistry, SearchResolver, split_expressions,
};
pub use filter::{
    CallbackParams, DataTable, FilterColumn, FilterConstraint, FilterError, FilterFeature,
    FilterOutcome, FilterRequest, FilteredValueHolder, TableRenderer,
};
pub use rows::FieldLookup;
pub use tree::{ComponentArena, ComponentId, ComponentKind, ComponentSpec, ComponentTree};
