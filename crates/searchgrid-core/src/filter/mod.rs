//! Data table filtering.
//!
//! A filter request carries one value per filterable column plus an optional
//! global filter. [`FilterFeature::decode`] rebuilds the applied filters from
//! the request and, for tables whose rows are all in memory, runs the
//! matching pass and stores the matched rows as the table's filtered value.
//!
//! A row matches when every non-blank column filter accepts its cell value
//! and, if a global filter is present, at least one filterable cell contains
//! the global value. All comparisons are case-insensitive.

mod constraint;
mod table;

pub use constraint::FilterConstraint;
pub use table::{
    ColumnBinding, DataTable, FilterColumn, FilteredValueHolder, FilteredValueSink, TableRenderer,
};

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::rows::FieldLookup;

/// Key under which the global filter is recorded in the applied filters.
pub const GLOBAL_FILTER_KEY: &str = "globalFilter";

/// Callback parameter reporting the number of matched rows.
pub const TOTAL_RECORDS: &str = "totalRecords";

/// Errors from filtering.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("cannot read column index from filter parameter \"{parameter}\"")]
    ColumnIndex { parameter: String },

    #[error("unknown match mode: {0}")]
    MatchMode(String),

    #[error("render failed: {0}")]
    Render(String),
}

/// Submitted request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    params: HashMap<String, String>,
}

impl FilterRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Raw value of a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }

    /// Whether the parameter was submitted at all.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Value of a parameter unless it is missing or blank.
    fn non_blank(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !is_blank(v))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterRequest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Out-of-band values handed back to the requesting client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    params: BTreeMap<String, Value>,
}

impl CallbackParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    /// Read a parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// All parameters as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.params.clone().into_iter().collect())
    }
}

/// What a decode did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Number of matched rows; `None` for lazy tables, which are filtered
    /// by their data source.
    pub matched: Option<usize>,
}

/// Resolve a filter binding to the field path read from each row.
///
/// `#{car.model}` and `car.model` both become `model`.
pub fn resolve_field(binding: &str) -> String {
    let path = binding
        .trim()
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(binding.trim());
    match path.find('.') {
        Some(dot) => path[dot + 1..].to_string(),
        None => path.to_string(),
    }
}

/// Column index encoded in a dynamic column's filter parameter,
/// `..._colIndex_<N>_filter`.
pub fn parse_col_index(parameter: &str) -> Result<usize, FilterError> {
    parameter
        .split_once("_colIndex_")
        .and_then(|(_, rest)| rest.split("_filter").next())
        .and_then(|index| index.parse().ok())
        .ok_or_else(|| FilterError::ColumnIndex {
            parameter: parameter.to_string(),
        })
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A filter-map entry with its field path resolved.
struct ActiveFilter {
    parameter: String,
    constraint: FilterConstraint,
    field: String,
}

/// Filtering behaviour of a data table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterFeature;

impl FilterFeature {
    /// Whether `request` is a filter request for `table`.
    pub fn is_filter_request<R>(&self, table: &DataTable<R>, request: &FilterRequest) -> bool {
        request.contains(&table.filtering_param())
    }

    /// Whether [`decode`](Self::decode) should run for this request.
    pub fn should_decode<R>(&self, table: &DataTable<R>, request: &FilterRequest) -> bool {
        self.is_filter_request(table, request)
    }

    /// Whether [`encode`](Self::encode) should run for this request.
    pub fn should_encode<R>(&self, table: &DataTable<R>, request: &FilterRequest) -> bool {
        self.is_filter_request(table, request)
    }

    /// Apply a filter request to `table`.
    ///
    /// Clears the previous filtered value, resets paging, records the applied
    /// filters and, unless the table is lazy, stores the matched rows. When
    /// the table is paginated and `callback` is given, the match count is
    /// reported under [`TOTAL_RECORDS`]. The row cursor is left unselected.
    pub fn decode<R: FieldLookup + Clone>(
        &self,
        table: &mut DataTable<R>,
        request: &FilterRequest,
        callback: Option<&mut CallbackParams>,
    ) -> Result<FilterOutcome, FilterError> {
        table.update_filtered_value(None);
        table.set_first(0);

        let global_param = table.global_filter_param();
        let global_filter = request.non_blank(&global_param).map(str::to_lowercase);

        let active = active_filters(table)?;
        let mut filters = HashMap::new();
        for filter in &active {
            if let Some(value) = request.non_blank(&filter.parameter) {
                filters.insert(filter.field.clone(), value.to_string());
            }
        }
        if let Some(value) = request.non_blank(&global_param) {
            filters.insert(GLOBAL_FILTER_KEY.to_string(), value.to_string());
        }
        table.set_filters(filters);

        if table.is_lazy() {
            debug!(table = %table.client_id(), "Lazy table, leaving row filtering to the data source");
            return Ok(FilterOutcome { matched: None });
        }

        let matched: Vec<R> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|&(index, row)| {
                row_matches(index, row, &active, request, global_filter.as_deref())
            })
            .map(|(_, row)| row.clone())
            .collect();
        let count = matched.len();

        if table.is_paginator() {
            if let Some(callback) = callback {
                callback.add(TOTAL_RECORDS, count);
            }
        }

        debug!(
            table = %table.client_id(),
            rows = table.row_count(),
            matched = count,
            "Filtered table rows"
        );

        table.update_filtered_value(Some(matched));
        table.set_row_index(None);

        Ok(FilterOutcome {
            matched: Some(count),
        })
    }

    /// Render the filtered rows after a filter request.
    pub fn encode<R>(
        &self,
        table: &DataTable<R>,
        renderer: &mut dyn TableRenderer<R>,
    ) -> Result<(), FilterError> {
        renderer.encode_rows(table, true)
    }
}

fn active_filters<R>(table: &DataTable<R>) -> Result<Vec<ActiveFilter>, FilterError> {
    let mut active = Vec::new();
    for (parameter, column) in table.filter_map() {
        let col_index = match column.binding() {
            ColumnBinding::Single(_) => None,
            ColumnBinding::Dynamic(_) => Some(parse_col_index(&parameter)?),
        };
        let field = column
            .field_path(col_index)
            .ok_or_else(|| FilterError::ColumnIndex {
                parameter: parameter.clone(),
            })?;
        active.push(ActiveFilter {
            parameter,
            constraint: column.constraint(),
            field,
        });
    }
    Ok(active)
}

/// Match one row against the column filters and the global filter.
///
/// A failing column stops the column loop; a blank column filter is vacuous
/// and never turns an earlier failure back into a match.
fn row_matches<R: FieldLookup>(
    index: usize,
    row: &R,
    active: &[ActiveFilter],
    request: &FilterRequest,
    global_filter: Option<&str>,
) -> bool {
    let mut local_match = true;
    let mut global_match = false;

    for filter in active {
        let value = row.field(&filter.field).map(|v| v.to_lowercase());

        if let (Some(global), false) = (global_filter, global_match) {
            global_match = value.as_deref().is_some_and(|v| v.contains(global));
        }

        let column_filter = match request.non_blank(&filter.parameter) {
            Some(raw) => raw.to_lowercase(),
            None => continue,
        };

        let accepted = value
            .as_deref()
            .is_some_and(|v| filter.constraint.applies(v, &column_filter));
        if !accepted {
            local_match = false;
            break;
        }
    }

    let matches = local_match && (global_filter.is_none() || global_match);
    if matches {
        tracing::trace!(row = index, "Row matched filters");
    }
    matches
}
