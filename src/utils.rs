//! Text and number coercion helpers shared by the predicate and sort code.

/// Parse trimmed text as a finite `f64`.
///
/// Empty text, `NaN`, and infinities are not numbers.
pub fn parse_finite(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Case-fold text for case-insensitive comparisons.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}
