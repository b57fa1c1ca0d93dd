//! Deterministic sample dataset with account, opportunity and quote groups.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::constants::sample::{CITIES, FIRST_NAMES, LAST_NAMES};
use crate::constants::schema::{GROUP_ACCOUNT, GROUP_OPPORTUNITY, GROUP_QUOTE};
use crate::data::{DynamicGroup, FieldDescriptor, Record};

/// 2025-01-01T00:00:00Z; sample timestamps count back from here.
const SAMPLE_EPOCH_SECS: i64 = 1_735_689_600;

/// Build `count` sample records with ids `1..=count`.
///
/// Dynamic field ids vary with the record id, so records disagree about their
/// groups' shape the way real related entities do.
pub fn sample_records(count: usize) -> Vec<Record> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(SAMPLE_EPOCH_SECS);
    (1..=count).map(|i| sample_record(i, epoch)).collect()
}

fn sample_record(i: usize, epoch: DateTime<Utc>) -> Record {
    let first = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last = LAST_NAMES[i % LAST_NAMES.len()];
    let days = i64::try_from(i).unwrap_or(i64::MAX);
    let created_at = epoch - TimeDelta::days(days);
    let modified_at = epoch - TimeDelta::hours(days % 5);

    Record::new()
        .with_field("id", i)
        .with_field("firstName", first)
        .with_field("lastName", last)
        .with_field("fullName", format!("{first} {last}"))
        .with_field("age", 18 + i % 50)
        .with_field("city", CITIES[i % CITIES.len()])
        .with_field("quotes_name", format!("Quote #{i}"))
        .with_field("template_type", if i % 2 == 0 { "A" } else { "B" })
        .with_field("quote_status", if i % 3 == 0 { "Approved" } else { "Draft" })
        .with_field(
            "createdAt",
            created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
        .with_field(
            "modifiedAt",
            modified_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
        .with_group(GROUP_ACCOUNT, account_group(i))
        .with_group(GROUP_OPPORTUNITY, opportunity_group(i))
        .with_group(GROUP_QUOTE, quote_group(i))
}

fn account_group(i: usize) -> DynamicGroup {
    let rating = i % 3 + 1;
    let kind = i % 4 + 1;
    DynamicGroup::with_id(format!("acc_{}", i % 10 + 1))
        .with_field(
            FieldDescriptor::new(format!("A_rate_{rating}"), format!("Account Rating {rating}")),
            format!("AR-{}", i % 100),
        )
        .with_field(
            FieldDescriptor::new(format!("A_type_{kind}"), format!("Account Type {kind}")),
            format!("AR-{}", (i + 1) % 100),
        )
}

fn opportunity_group(i: usize) -> DynamicGroup {
    let score = i % 5 + 1;
    DynamicGroup::with_id(format!("opp_{}", i % 20 + 1)).with_field(
        FieldDescriptor::new(format!("O_score_{score}"), format!("Opp Score {score}")),
        format!("{}", (i * 3) % 100),
    )
}

fn quote_group(i: usize) -> DynamicGroup {
    let discount = i % 4 + 1;
    let revision = i % 2 + 1;
    DynamicGroup::with_id(format!("quote_{i}"))
        .with_field(
            FieldDescriptor::new(
                format!("Q_discount_{discount}"),
                format!("Quote Discount {discount}"),
            ),
            format!("{}%", 5 * discount),
        )
        .with_field(
            FieldDescriptor::new(format!("Q_revision_{revision}"), format!("Revision {revision}")),
            format!("R{}", i % 3 + 1),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::data::Scalar;
    use crate::schema::SchemaFlattener;

    #[test]
    fn sample_is_deterministic() {
        assert_eq!(sample_records(5), sample_records(5));
        assert_eq!(sample_records(200).len(), 200);
    }

    #[test]
    fn first_sample_record_drives_eleven_columns() {
        let records = sample_records(3);
        let config = SchemaConfig::default();
        let batch = SchemaFlattener::new(&config).flatten(&records);

        let keys: Vec<&str> = batch.columns.keys().skip(6).collect();
        assert_eq!(
            keys,
            vec!["A_rate_2", "A_type_2", "O_score_2", "Q_discount_2", "Q_revision_2"]
        );
        assert_eq!(batch.rows[0].get("Q_discount_2"), Some(&Scalar::from("10%")));
        assert_eq!(batch.rows[0].refs.get("account").map(String::as_str), Some("acc_2"));
    }

    #[test]
    fn timestamps_are_iso_8601() {
        let record = &sample_records(1)[0];
        assert_eq!(
            record.field("createdAt"),
            Some(&Scalar::from("2024-12-31T00:00:00.000Z"))
        );
    }
}
