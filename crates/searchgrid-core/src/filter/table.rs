//! Data table state touched by filtering.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use searchgrid_config::{ColumnConfig, FilteringConfig, TableConfig};
use tracing::warn;

use super::{FilterConstraint, FilterError, resolve_field};

/// Filter binding of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnBinding {
    /// A single column, e.g. `#{car.model}`.
    Single(String),
    /// A dynamic column group; the active column index picks the binding.
    Dynamic(Vec<String>),
}

/// A filterable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterColumn {
    id: String,
    binding: ColumnBinding,
    constraint: FilterConstraint,
}

impl FilterColumn {
    /// A single column filtered through `filter_by`.
    pub fn new(id: impl Into<String>, filter_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            binding: ColumnBinding::Single(filter_by.into()),
            constraint: FilterConstraint::default(),
        }
    }

    /// A dynamic column group, one binding per column index.
    pub fn dynamic(id: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            id: id.into(),
            binding: ColumnBinding::Dynamic(fields),
            constraint: FilterConstraint::default(),
        }
    }

    /// Set the match mode.
    pub fn with_constraint(mut self, constraint: FilterConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Build a column from its `[[tables.columns]]` entry.
    pub fn from_config(config: &ColumnConfig) -> Result<Self, FilterError> {
        let constraint = config.match_mode.parse()?;
        let column = match &config.filter_by {
            Some(filter_by) => Self::new(&config.id, filter_by),
            None => Self::dynamic(&config.id, config.fields.clone()),
        };
        Ok(column.with_constraint(constraint))
    }

    /// Column id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filter binding.
    pub fn binding(&self) -> &ColumnBinding {
        &self.binding
    }

    /// Match mode.
    pub fn constraint(&self) -> FilterConstraint {
        self.constraint
    }

    /// Field path of this column for the given dynamic column index.
    ///
    /// `col_index` is ignored for single columns and required for dynamic
    /// groups.
    pub fn field_path(&self, col_index: Option<usize>) -> Option<String> {
        match (&self.binding, col_index) {
            (ColumnBinding::Single(binding), _) => Some(resolve_field(binding)),
            (ColumnBinding::Dynamic(fields), Some(index)) => {
                fields.get(index).map(|binding| resolve_field(binding))
            }
            (ColumnBinding::Dynamic(_), None) => None,
        }
    }
}

/// External write target for the filtered rows.
pub trait FilteredValueSink<R> {
    /// Current filtered rows.
    fn get(&self) -> Option<Vec<R>>;

    /// Replace the filtered rows; `None` clears them.
    fn set(&mut self, value: Option<Vec<R>>);
}

/// Shared in-memory [`FilteredValueSink`].
///
/// Clones share the same slot, so a host keeps one clone and hands the other
/// to the table.
#[derive(Debug)]
pub struct FilteredValueHolder<R> {
    slot: Arc<Mutex<Option<Vec<R>>>>,
}

impl<R> FilteredValueHolder<R> {
    /// Create an empty holder.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<R: Clone> FilteredValueHolder<R> {
    /// Snapshot of the stored rows.
    pub fn value(&self) -> Option<Vec<R>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<R> Clone for FilteredValueHolder<R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> Default for FilteredValueHolder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> FilteredValueSink<R> for FilteredValueHolder<R> {
    fn get(&self) -> Option<Vec<R>> {
        self.value()
    }

    fn set(&mut self, value: Option<Vec<R>>) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| {
            warn!("Filtered value holder was poisoned, overwriting stored rows");
            poisoned.into_inner()
        });
        *slot = value;
    }
}

/// Draws the table body.
pub trait TableRenderer<R> {
    /// Render the rows of `table`; only the filtered rows when
    /// `matched_only` is set.
    fn encode_rows(&mut self, table: &DataTable<R>, matched_only: bool)
    -> Result<(), FilterError>;
}

/// A data table: rows, filterable columns and the per-instance state a
/// filter pass mutates.
pub struct DataTable<R> {
    client_id: String,
    separator: char,
    global_filter_param: String,
    rows: Vec<R>,
    columns: Vec<FilterColumn>,
    lazy: bool,
    paginator: bool,
    first: usize,
    row_index: Option<usize>,
    filters: HashMap<String, String>,
    filtered_value_sink: Option<Box<dyn FilteredValueSink<R>>>,
    filtered_value: Option<Vec<R>>,
    fallback_warned: bool,
}

impl<R> DataTable<R> {
    /// Create an eager, unpaginated table without columns.
    pub fn new(client_id: impl Into<String>, separator: char, rows: Vec<R>) -> Self {
        Self {
            client_id: client_id.into(),
            separator,
            global_filter_param: FilteringConfig::default().global_filter_param,
            rows,
            columns: Vec::new(),
            lazy: false,
            paginator: false,
            first: 0,
            row_index: None,
            filters: HashMap::new(),
            filtered_value_sink: None,
            filtered_value: None,
            fallback_warned: false,
        }
    }

    /// Build a table from its `[[tables]]` entry.
    pub fn from_config(
        config: &TableConfig,
        filtering: &FilteringConfig,
        separator: char,
        rows: Vec<R>,
    ) -> Result<Self, FilterError> {
        let columns = config
            .columns
            .iter()
            .map(FilterColumn::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(&config.client_id, separator, rows)
            .with_columns(columns)
            .with_lazy(config.lazy)
            .with_paginator(config.paginator)
            .with_global_filter_param(&filtering.global_filter_param))
    }

    /// Add a filterable column.
    pub fn with_column(mut self, column: FilterColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add filterable columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = FilterColumn>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Mark the rows as externally paged.
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Enable the paginator.
    pub fn with_paginator(mut self, paginator: bool) -> Self {
        self.paginator = paginator;
        self
    }

    /// Override the global filter parameter suffix.
    pub fn with_global_filter_param(mut self, suffix: impl Into<String>) -> Self {
        self.global_filter_param = suffix.into();
        self
    }

    /// Bind the filtered value to an external sink.
    pub fn with_filtered_value_sink(mut self, sink: Box<dyn FilteredValueSink<R>>) -> Self {
        self.filtered_value_sink = Some(sink);
        self
    }

    /// Client id of the table.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Naming container separator.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// All rows, unfiltered.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Replace the row data.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
    }

    /// Number of rows, unfiltered.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Filterable columns.
    pub fn columns(&self) -> &[FilterColumn] {
        &self.columns
    }

    /// Whether rows are paged in externally.
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Whether the paginator is enabled.
    pub fn is_paginator(&self) -> bool {
        self.paginator
    }

    /// Index of the first row on the current page.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Move the pagination offset.
    pub fn set_first(&mut self, first: usize) {
        self.first = first;
    }

    /// Currently selected row, if any.
    pub fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    /// Select a row, or clear the selection with `None`.
    pub fn set_row_index(&mut self, row_index: Option<usize>) {
        self.row_index = row_index;
    }

    /// Data of the selected row.
    pub fn row_data(&self) -> Option<&R> {
        self.row_index.and_then(|i| self.rows.get(i))
    }

    /// Filters applied by the last filter request, keyed by field path.
    pub fn filters(&self) -> &HashMap<String, String> {
        &self.filters
    }

    /// Replace the applied filters.
    pub fn set_filters(&mut self, filters: HashMap<String, String>) {
        self.filters = filters;
    }

    /// Whether the filtered value is bound to an external sink.
    pub fn has_filtered_value_sink(&self) -> bool {
        self.filtered_value_sink.is_some()
    }

    /// Request parameter marking a filter request.
    pub fn filtering_param(&self) -> String {
        format!("{}_filtering", self.client_id)
    }

    /// Request parameter carrying the global filter.
    pub fn global_filter_param(&self) -> String {
        format!(
            "{}{}{}",
            self.client_id, self.separator, self.global_filter_param
        )
    }

    /// Request parameter name of every filterable column, in column order.
    ///
    /// Dynamic groups contribute one `..._colIndex_<N>_filter` entry per
    /// column index.
    pub fn filter_map(&self) -> Vec<(String, &FilterColumn)> {
        let mut map = Vec::new();
        for column in &self.columns {
            match column.binding() {
                ColumnBinding::Single(_) => map.push((
                    format!("{}{}{}_filter", self.client_id, self.separator, column.id()),
                    column,
                )),
                ColumnBinding::Dynamic(fields) => {
                    for index in 0..fields.len() {
                        map.push((
                            format!(
                                "{}{}{}_colIndex_{index}_filter",
                                self.client_id,
                                self.separator,
                                column.id()
                            ),
                            column,
                        ));
                    }
                }
            }
        }
        map
    }

    /// Store the filtered rows in the bound sink, or in the table itself
    /// when nothing is bound.
    pub fn update_filtered_value(&mut self, value: Option<Vec<R>>) {
        if let Some(sink) = self.filtered_value_sink.as_mut() {
            sink.set(value);
            return;
        }

        if value.is_some() && !self.fallback_warned {
            warn!(
                table = %self.client_id,
                "Filtering without a filtered value binding; keeping filtered rows in table state is deprecated"
            );
            self.fallback_warned = true;
        }
        self.filtered_value = value;
    }
}

impl<R: Clone> DataTable<R> {
    /// Rows of the last filter pass, from the sink or the table itself.
    pub fn filtered_value(&self) -> Option<Vec<R>> {
        match &self.filtered_value_sink {
            Some(sink) => sink.get(),
            None => self.filtered_value.clone(),
        }
    }
}

impl<R> fmt::Debug for DataTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTable")
            .field("client_id", &self.client_id)
            .field("rows", &self.rows.len())
            .field("columns", &self.columns)
            .field("lazy", &self.lazy)
            .field("paginator", &self.paginator)
            .field("first", &self.first)
            .field("row_index", &self.row_index)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
