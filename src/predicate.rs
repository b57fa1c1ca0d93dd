//! Filter predicate evaluation.
//!
//! Evaluation never fails: unknown operators match every row and numeric
//! operators on non-numeric data match none.

use std::borrow::Cow;

use crate::codec::{FilterCriterion, FilterLogic, FilterOperator, FilterSet};
use crate::constants::operators::ANY_OF_SEPARATOR;
use crate::data::FieldLookup;
use crate::utils::{fold_case, parse_finite};

/// Evaluate one criterion against one row.
pub fn evaluate<R>(row: &R, criterion: &FilterCriterion) -> bool
where
    R: FieldLookup + ?Sized,
{
    let raw: Cow<'_, str> = row
        .lookup(&criterion.field)
        .map(|value| value.as_text())
        .unwrap_or(Cow::Borrowed(""));

    if criterion.operator.is_numeric() {
        let (Some(cell), Some(target)) = (parse_finite(&raw), parse_finite(&criterion.value))
        else {
            return false;
        };
        return match criterion.operator {
            FilterOperator::GreaterThan => cell > target,
            FilterOperator::LessThan => cell < target,
            _ => true,
        };
    }

    let cell = fold_case(&raw);
    let needle = fold_case(&criterion.value);
    match &criterion.operator {
        FilterOperator::Contains => cell.contains(&needle),
        FilterOperator::DoesNotContain => !cell.contains(&needle),
        FilterOperator::Equals => cell == needle,
        FilterOperator::DoesNotEqual => cell != needle,
        FilterOperator::StartsWith => cell.starts_with(&needle),
        FilterOperator::EndsWith => cell.ends_with(&needle),
        FilterOperator::IsEmpty => cell.trim().is_empty(),
        FilterOperator::IsNotEmpty => !cell.trim().is_empty(),
        FilterOperator::IsAnyOf => needle
            .split(ANY_OF_SEPARATOR)
            .map(str::trim)
            .any(|item| item == cell),
        FilterOperator::GreaterThan | FilterOperator::LessThan => false,
        FilterOperator::Unknown(_) => true,
    }
}

/// Evaluate a filter set against one row. An empty set matches everything.
pub fn matches<R>(row: &R, filters: &FilterSet) -> bool
where
    R: FieldLookup + ?Sized,
{
    if filters.criteria.is_empty() {
        return true;
    }
    match filters.logic {
        FilterLogic::And => filters
            .criteria
            .iter()
            .all(|criterion| evaluate(row, criterion)),
        FilterLogic::Or => filters
            .criteria
            .iter()
            .any(|criterion| evaluate(row, criterion)),
    }
}
