//! Column match modes.

use std::fmt;
use std::str::FromStr;

use super::FilterError;

/// How a column's cell value is compared with the submitted filter value.
///
/// Both sides are lowercased by the caller before [`applies`](Self::applies)
/// sees them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterConstraint {
    /// Cell starts with the filter.
    #[default]
    StartsWith,
    /// Cell ends with the filter.
    EndsWith,
    /// Cell contains the filter.
    Contains,
    /// Cell equals the filter.
    Exact,
    /// Cell is numerically less than the filter.
    LessThan,
    /// Cell is numerically less than or equal to the filter.
    LessThanEquals,
    /// Cell is numerically greater than the filter.
    GreaterThan,
    /// Cell is numerically greater than or equal to the filter.
    GreaterThanEquals,
}

impl FilterConstraint {
    /// Whether `value` passes the constraint for `filter`.
    ///
    /// Numeric modes fail when either side is not a number.
    pub fn applies(self, value: &str, filter: &str) -> bool {
        match self {
            FilterConstraint::StartsWith => value.starts_with(filter),
            FilterConstraint::EndsWith => value.ends_with(filter),
            FilterConstraint::Contains => value.contains(filter),
            FilterConstraint::Exact => value == filter,
            FilterConstraint::LessThan => compare(value, filter, |a, b| a < b),
            FilterConstraint::LessThanEquals => compare(value, filter, |a, b| a <= b),
            FilterConstraint::GreaterThan => compare(value, filter, |a, b| a > b),
            FilterConstraint::GreaterThanEquals => compare(value, filter, |a, b| a >= b),
        }
    }

    /// The match mode name used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterConstraint::StartsWith => "startsWith",
            FilterConstraint::EndsWith => "endsWith",
            FilterConstraint::Contains => "contains",
            FilterConstraint::Exact => "exact",
            FilterConstraint::LessThan => "lt",
            FilterConstraint::LessThanEquals => "lte",
            FilterConstraint::GreaterThan => "gt",
            FilterConstraint::GreaterThanEquals => "gte",
        }
    }
}

fn compare(value: &str, filter: &str, op: fn(f64, f64) -> bool) -> bool {
    match (value.trim().parse::<f64>(), filter.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => op(a, b),
        _ => false,
    }
}

impl FromStr for FilterConstraint {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "startsWith" => Ok(FilterConstraint::StartsWith),
            "endsWith" => Ok(FilterConstraint::EndsWith),
            "contains" => Ok(FilterConstraint::Contains),
            "exact" => Ok(FilterConstraint::Exact),
            "lt" => Ok(FilterConstraint::LessThan),
            "lte" => Ok(FilterConstraint::LessThanEquals),
            "gt" => Ok(FilterConstraint::GreaterThan),
            "gte" => Ok(FilterConstraint::GreaterThanEquals),
            other => Err(FilterError::MatchMode(other.to_string())),
        }
    }
}

impl fmt::Display for FilterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
