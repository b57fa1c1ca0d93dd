//! Query string codec.
//!
//! Filters encode as `&field=operator[:value]` pairs (values percent-encoded
//! like `encodeURIComponent`), sorts as `&sortBy=<field>&sortOrder=<dir>`.
//! Decoding is tolerant: malformed fragments are skipped, never fatal.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::operators::{
    CONTAINS, DOES_NOT_CONTAIN, DOES_NOT_EQUAL, ENDS_WITH, EQUALS, GREATER_THAN, IS_ANY_OF,
    IS_EMPTY, IS_NOT_EMPTY, LEGACY_ALIASES, LESS_THAN, STARTS_WITH,
};
use crate::constants::query::{
    KEY_VALUE_SEPARATOR, LOGIC_AND, LOGIC_KEY, LOGIC_OR, OPERATOR_SEPARATOR, PAIR_SEPARATOR,
    SORT_ASC, SORT_BY_KEY, SORT_DESC, SORT_ORDER_KEY,
};
use crate::types::{ColumnKey, QueryText};

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value as a URI component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Percent-decode a URI component; invalid UTF-8 is replaced, not rejected.
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Filter operator vocabulary.
///
/// `Unknown` keeps tags this build does not recognize so they survive a
/// decode/encode cycle; such criteria evaluate to `true`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    /// `contains`
    Contains,
    /// `doesNotContain`
    DoesNotContain,
    /// `equals`
    Equals,
    /// `doesNotEqual`
    DoesNotEqual,
    /// `startsWith`
    StartsWith,
    /// `endsWith`
    EndsWith,
    /// `gt`
    GreaterThan,
    /// `lt`
    LessThan,
    /// `isEmpty`
    IsEmpty,
    /// `isNotEmpty`
    IsNotEmpty,
    /// `isAnyOf`
    IsAnyOf,
    /// Any other tag, kept verbatim.
    Unknown(String),
}

impl FilterOperator {
    /// Every recognized operator, in menu order.
    pub const KNOWN: [Self; 11] = [
        Self::Contains,
        Self::DoesNotContain,
        Self::Equals,
        Self::DoesNotEqual,
        Self::StartsWith,
        Self::EndsWith,
        Self::GreaterThan,
        Self::LessThan,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::IsAnyOf,
    ];

    /// Resolve a wire tag, accepting canonical spellings and legacy aliases.
    pub fn parse(tag: &str) -> Self {
        let canonical = LEGACY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == tag)
            .map_or(tag, |(_, canonical)| *canonical);
        match canonical {
            CONTAINS => Self::Contains,
            DOES_NOT_CONTAIN => Self::DoesNotContain,
            EQUALS => Self::Equals,
            DOES_NOT_EQUAL => Self::DoesNotEqual,
            STARTS_WITH => Self::StartsWith,
            ENDS_WITH => Self::EndsWith,
            GREATER_THAN => Self::GreaterThan,
            LESS_THAN => Self::LessThan,
            IS_EMPTY => Self::IsEmpty,
            IS_NOT_EMPTY => Self::IsNotEmpty,
            IS_ANY_OF => Self::IsAnyOf,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Canonical wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains => CONTAINS,
            Self::DoesNotContain => DOES_NOT_CONTAIN,
            Self::Equals => EQUALS,
            Self::DoesNotEqual => DOES_NOT_EQUAL,
            Self::StartsWith => STARTS_WITH,
            Self::EndsWith => ENDS_WITH,
            Self::GreaterThan => GREATER_THAN,
            Self::LessThan => LESS_THAN,
            Self::IsEmpty => IS_EMPTY,
            Self::IsNotEmpty => IS_NOT_EMPTY,
            Self::IsAnyOf => IS_ANY_OF,
            Self::Unknown(tag) => tag,
        }
    }

    /// Whether the operator reads the criterion's value.
    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    /// Whether the operator compares numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FilterOperator {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FilterOperator> for String {
    fn from(value: FilterOperator) -> Self {
        value.as_str().to_string()
    }
}

/// One filter condition on one column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    /// Column key the criterion reads.
    pub field: ColumnKey,
    /// Operator to apply.
    pub operator: FilterOperator,
    /// Raw (decoded) filter value; empty for value-less operators.
    pub value: String,
}

impl FilterCriterion {
    /// Build a criterion.
    pub fn new(
        field: impl Into<ColumnKey>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// How criteria combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterLogic {
    /// Every criterion must hold.
    #[default]
    And,
    /// At least one criterion must hold.
    Or,
}

impl FilterLogic {
    /// Parse a wire value; anything other than `OR` (any case) is `And`.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case(LOGIC_OR) {
            Self::Or
        } else {
            Self::And
        }
    }

    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => LOGIC_AND,
            Self::Or => LOGIC_OR,
        }
    }
}

/// Filter criteria plus their combination mode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Criteria in the order the caller added them.
    pub criteria: Vec<FilterCriterion>,
    /// Combination mode.
    pub logic: FilterLogic,
}

impl FilterSet {
    /// Criteria combined with `AND`.
    pub fn all(criteria: Vec<FilterCriterion>) -> Self {
        Self {
            criteria,
            logic: FilterLogic::And,
        }
    }

    /// Criteria combined with `OR`.
    pub fn any(criteria: Vec<FilterCriterion>) -> Self {
        Self {
            criteria,
            logic: FilterLogic::Or,
        }
    }

    /// Returns `true` when there are no criteria.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Encode into the canonical filter query block.
    pub fn encode(&self) -> QueryText {
        encode_filters(self)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Parse a wire value; only `desc` (any case) is descending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case(SORT_DESC) {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => SORT_ASC,
            Self::Desc => SORT_DESC,
        }
    }
}

/// Requested ordering. Only takes effect when both parts are present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column to order by.
    pub field: Option<ColumnKey>,
    /// Ordering direction.
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    /// No ordering.
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Order by `field` in `direction`.
    pub fn by(field: impl Into<ColumnKey>, direction: SortDirection) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some(direction),
        }
    }

    /// The effective `(field, direction)` pair, if both are set.
    pub fn active(&self) -> Option<(&str, SortDirection)> {
        match (&self.field, self.direction) {
            (Some(field), Some(direction)) if !field.is_empty() => {
                Some((field.as_str(), direction))
            }
            _ => None,
        }
    }

    /// Encode into the canonical sort query block.
    pub fn encode(&self) -> QueryText {
        encode_sort(self)
    }
}

/// Filters and sort decoded together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridQuery {
    /// Filter criteria.
    pub filters: FilterSet,
    /// Requested ordering.
    pub sort: SortSpec,
}

impl GridQuery {
    /// Encode as `filter block` followed by `sort block`.
    pub fn encode(&self) -> QueryText {
        let mut out = encode_filters(&self.filters);
        out.push_str(&encode_sort(&self.sort));
        out
    }
}

/// Encode filters as `&field=op[:value]...`, or `""` when there are none.
///
/// `logic=OR` is appended only for `OR`; `AND` is the default and is implied.
pub fn encode_filters(filters: &FilterSet) -> QueryText {
    if filters.criteria.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for criterion in &filters.criteria {
        out.push(PAIR_SEPARATOR);
        out.push_str(&criterion.field);
        out.push(KEY_VALUE_SEPARATOR);
        out.push_str(criterion.operator.as_str());
        if !criterion.value.is_empty() {
            out.push(OPERATOR_SEPARATOR);
            out.push_str(&encode_component(&criterion.value));
        }
    }
    if filters.logic == FilterLogic::Or {
        out.push(PAIR_SEPARATOR);
        out.push_str(LOGIC_KEY);
        out.push(KEY_VALUE_SEPARATOR);
        out.push_str(LOGIC_OR);
    }
    out
}

/// Encode a sort as `&sortBy=<field>&sortOrder=<dir>`, or `""` when unsorted.
pub fn encode_sort(sort: &SortSpec) -> QueryText {
    match sort.active() {
        Some((field, direction)) => format!(
            "{PAIR_SEPARATOR}{SORT_BY_KEY}{KEY_VALUE_SEPARATOR}{field}\
             {PAIR_SEPARATOR}{SORT_ORDER_KEY}{KEY_VALUE_SEPARATOR}{}",
            direction.as_str()
        ),
        None => String::new(),
    }
}

/// Split a query into `(key, value)` pairs, skipping fragments without `=` or
/// with an empty key.
fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split(PAIR_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| match segment.split_once(KEY_VALUE_SEPARATOR) {
            Some((key, value)) if !key.is_empty() => Some((key, value)),
            _ => {
                debug!(segment, "skipping malformed query fragment");
                None
            }
        })
}

/// Decode a filter block. Sort keys and malformed fragments are ignored.
pub fn decode_filters(query: &str) -> FilterSet {
    let mut filters = FilterSet::default();
    for (key, value) in query_pairs(query) {
        if key == LOGIC_KEY {
            filters.logic = FilterLogic::parse(value);
            continue;
        }
        if key == SORT_BY_KEY || key == SORT_ORDER_KEY {
            continue;
        }
        if value.is_empty() {
            debug!(field = key, "skipping filter fragment without operator");
            continue;
        }
        let criterion = match value.split_once(OPERATOR_SEPARATOR) {
            Some((operator, raw)) => {
                FilterCriterion::new(key, FilterOperator::parse(operator), decode_component(raw))
            }
            None => FilterCriterion::new(key, FilterOperator::parse(value), String::new()),
        };
        filters.criteria.push(criterion);
    }
    filters
}

/// Decode a sort block. A missing or empty `sortBy` means unsorted; a missing
/// `sortOrder` defaults to ascending.
pub fn decode_sort(query: &str) -> SortSpec {
    let mut field = None;
    let mut direction = None;
    for (key, value) in query_pairs(query) {
        match key {
            SORT_BY_KEY if !value.is_empty() => field = Some(value.to_string()),
            SORT_ORDER_KEY => direction = Some(SortDirection::parse(value)),
            _ => {}
        }
    }
    match field {
        Some(field) => SortSpec {
            field: Some(field),
            direction: Some(direction.unwrap_or(SortDirection::Asc)),
        },
        None => SortSpec::unsorted(),
    }
}

/// Decode a concatenated `filter block + sort block` string.
pub fn decode_query(query: &str) -> GridQuery {
    GridQuery {
        filters: decode_filters(query),
        sort: decode_sort(query),
    }
}
