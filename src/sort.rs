//! Row ordering: numbers before text, numeric within numbers, natural within text.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use crate::codec::{SortDirection, SortSpec};
use crate::data::{FieldLookup, Scalar};
use crate::utils::{fold_case, parse_finite};

/// Compare two cell values. Missing values compare as `""`.
pub fn compare(a: Option<&Scalar>, b: Option<&Scalar>, direction: SortDirection) -> Ordering {
    let a = a.map(Scalar::as_text).unwrap_or(Cow::Borrowed(""));
    let b = b.map(Scalar::as_text).unwrap_or(Cow::Borrowed(""));
    compare_text(&a, &b, direction)
}

/// Compare two cell texts.
///
/// Texts that parse as finite numbers rank before all other text and compare
/// by value among themselves; the rest compare naturally. The ranking keeps the
/// order total when a column mixes numbers and text.
pub fn compare_text(a: &str, b: &str, direction: SortDirection) -> Ordering {
    let ordering = match (parse_finite(a), parse_finite(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => natural_cmp(&fold_case(a.trim()), &fold_case(b.trim())),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Numeric-aware string ordering: digit runs compare by value, so `item2 < item10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ordering = compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(ch) = chars.peek().copied() {
        if !ch.is_ascii_digit() {
            break;
        }
        run.push(ch);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        // Equal values: fewer leading zeros first.
        .then_with(|| a.len().cmp(&b.len()))
}

/// Stable in-place sort of rows by a sort spec. Inactive specs leave the order untouched.
pub fn sort_rows<R: FieldLookup>(rows: &mut [R], spec: &SortSpec) {
    let Some((field, direction)) = spec.active() else {
        return;
    };
    rows.sort_by(|a, b| compare(a.lookup(field), b.lookup(field), direction));
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn rows(key: &str, values: Vec<Scalar>) -> Vec<IndexMap<String, Scalar>> {
        values
            .into_iter()
            .map(|value| IndexMap::from([(key.to_string(), value)]))
            .collect()
    }

    fn column(rows: &[IndexMap<String, Scalar>], key: &str) -> Vec<String> {
        rows.iter()
            .map(|row| row.get(key).map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn numbers_sort_numerically() {
        let mut data = rows("age", vec![35i64.into(), 16i64.into(), 45i64.into()]);
        sort_rows(&mut data, &SortSpec::by("age", SortDirection::Asc));
        assert_eq!(column(&data, "age"), vec!["16", "35", "45"]);

        sort_rows(&mut data, &SortSpec::by("age", SortDirection::Desc));
        assert_eq!(column(&data, "age"), vec!["45", "35", "16"]);
    }

    #[test]
    fn text_sorts_naturally_and_case_insensitively() {
        let mut data = rows("name", vec!["item10".into(), "Item2".into(), "item1".into()]);
        sort_rows(&mut data, &SortSpec::by("name", SortDirection::Asc));
        assert_eq!(column(&data, "name"), vec!["item1", "Item2", "item10"]);
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        assert_eq!(compare_text("9", "10", SortDirection::Asc), Ordering::Less);
        assert_eq!(compare_text(" 2.5 ", "2.25", SortDirection::Asc), Ordering::Greater);
    }

    #[test]
    fn mixed_numbers_and_text_order_totally() {
        let values = ["2.25", "2.5", "2.6x", "10", "item2", "", "-1", "item10", "2.5"];
        for a in values {
            for b in values {
                let ab = compare_text(a, b, SortDirection::Asc);
                assert_eq!(ab, compare_text(b, a, SortDirection::Asc).reverse(), "{a:?} vs {b:?}");
                for c in values {
                    if ab != Ordering::Greater
                        && compare_text(b, c, SortDirection::Asc) != Ordering::Greater
                    {
                        assert_ne!(
                            compare_text(a, c, SortDirection::Asc),
                            Ordering::Greater,
                            "{a:?} <= {b:?} <= {c:?}"
                        );
                    }
                }
            }
        }

        let mut data = rows("code", values.iter().map(|v| Scalar::from(*v)).collect());
        sort_rows(&mut data, &SortSpec::by("code", SortDirection::Asc));
        assert_eq!(
            column(&data, "code"),
            vec!["-1", "2.25", "2.5", "2.5", "10", "", "2.6x", "item2", "item10"]
        );

        sort_rows(&mut data, &SortSpec::by("code", SortDirection::Desc));
        assert_eq!(column(&data, "code")[0], "item10");
        assert_eq!(column(&data, "code")[8], "-1");
    }

    #[test]
    fn missing_values_sort_as_empty_text() {
        let mut data = vec![
            IndexMap::from([("city".to_string(), Scalar::from("Riverrun"))]),
            IndexMap::new(),
        ];
        sort_rows(&mut data, &SortSpec::by("city", SortDirection::Asc));
        assert!(data[0].is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let mut data: Vec<IndexMap<String, Scalar>> = (0..6i64)
            .map(|idx| {
                IndexMap::from([
                    ("group".to_string(), Scalar::from(if idx % 2 == 0 { "b" } else { "a" })),
                    ("idx".to_string(), Scalar::from(idx)),
                ])
            })
            .collect();
        sort_rows(&mut data, &SortSpec::by("group", SortDirection::Asc));
        assert_eq!(column(&data, "idx"), vec!["1", "3", "5", "0", "2", "4"]);
    }

    #[test]
    fn inactive_spec_keeps_order() {
        let mut data = rows("age", vec![3i64.into(), 1i64.into()]);
        sort_rows(
            &mut data,
            &SortSpec {
                field: Some("age".into()),
                direction: None,
            },
        );
        assert_eq!(column(&data, "age"), vec!["3", "1"]);
    }

    #[test]
    fn natural_cmp_handles_leading_zeros() {
        assert_eq!(natural_cmp("a007", "a7"), Ordering::Greater);
        assert_eq!(natural_cmp("a07", "a8"), Ordering::Less);
        assert_eq!(natural_cmp("ab", "abc"), Ordering::Less);
    }
}
