//! Column discovery and row flattening.
//!
//! The dynamic part of the column model is inferred from the **first** record
//! of a batch only: every configured group that record carries with a
//! non-empty descriptor list contributes one column per descriptor. Later
//! records are projected onto that model, even when their own descriptors
//! differ.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BaseColumn, BaseFallback, SchemaConfig};
use crate::constants::schema::{DYNAMIC_TITLE_SEPARATOR, JOIN_SEPARATOR};
use crate::data::{FieldLookup, Record, RecordView, Scalar};
use crate::types::{ColumnKey, GroupName};

/// Origin of a column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Fixed column defined in configuration.
    Base,
    /// Column discovered from a dynamic group's descriptors.
    Dynamic {
        /// Owning group name.
        group: GroupName,
        /// Short tag of the owning group.
        tag: String,
    },
}

/// One column of the merged model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Stable key used to read row values.
    pub key: ColumnKey,
    /// Display title.
    pub title: String,
    /// Default width in pixels.
    pub width: u32,
    /// Where the column came from.
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    fn base(column: &BaseColumn) -> Self {
        Self {
            key: column.key.to_string(),
            title: column.title.to_string(),
            width: column.width,
            kind: ColumnKind::Base,
        }
    }

    /// Returns `true` for discovered columns.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, ColumnKind::Dynamic { .. })
    }
}

/// Ordered, key-unique list of columns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnModel {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnModel {
    /// Columns in display order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Consume the model into its columns.
    pub fn into_columns(self) -> Vec<ColumnDescriptor> {
        self.columns
    }

    /// Column keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.key.as_str())
    }

    /// Look up a column by key.
    pub fn get(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.key == key)
    }

    /// Returns `true` when the model has a column with `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn push_unique(&mut self, column: ColumnDescriptor) -> bool {
        if self.contains(&column.key) {
            return false;
        }
        self.columns.push(column);
        true
    }
}

/// A record projected onto a column model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    /// Cell values keyed by column key. Dynamic columns of groups the source
    /// record lacks are absent.
    pub values: IndexMap<ColumnKey, Scalar>,
    /// Reference ids of the record's groups, keyed by group name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub refs: IndexMap<GroupName, String>,
}

impl FlatRow {
    /// Cell value for a column key.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }
}

impl FieldLookup for FlatRow {
    fn lookup(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }
}

/// Columns plus flattened rows for one batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatBatch {
    /// Merged column model.
    pub columns: ColumnModel,
    /// Rows projected onto `columns`.
    pub rows: Vec<FlatRow>,
}

/// Pure column discovery and projection over a schema configuration.
#[derive(Clone, Copy, Debug)]
pub struct SchemaFlattener<'a> {
    config: &'a SchemaConfig,
}

impl<'a> SchemaFlattener<'a> {
    /// Create a flattener over `config`.
    pub fn new(config: &'a SchemaConfig) -> Self {
        Self { config }
    }

    /// Column model with base columns only.
    pub fn base_columns(&self) -> ColumnModel {
        ColumnModel {
            columns: self
                .config
                .base_columns
                .iter()
                .map(ColumnDescriptor::base)
                .collect(),
        }
    }

    /// Merge base columns with the dynamic columns declared by `sample`.
    ///
    /// Without a sample the model degrades to the base columns.
    pub fn discover(&self, sample: Option<&Record>) -> ColumnModel {
        let mut model = self.base_columns();
        let Some(sample) = sample else {
            return model;
        };
        for spec in &self.config.groups {
            let Some(group) = sample.group(&spec.name) else {
                continue;
            };
            for descriptor in &group.descriptors {
                let column = ColumnDescriptor {
                    key: descriptor.field_id.clone(),
                    title: format!(
                        "{}{DYNAMIC_TITLE_SEPARATOR}{}",
                        spec.tag, descriptor.field_name
                    ),
                    width: self.config.dynamic_width,
                    kind: ColumnKind::Dynamic {
                        group: spec.name.to_string(),
                        tag: spec.tag.to_string(),
                    },
                };
                if !model.push_unique(column) {
                    debug!(
                        group = %spec.name,
                        field_id = %descriptor.field_id,
                        "dropping dynamic column that repeats an existing key"
                    );
                }
            }
        }
        model
    }

    /// Project one record. `ordinal` is the 1-based row position used by
    /// [`BaseFallback::Ordinal`].
    pub fn flatten_row(&self, columns: &ColumnModel, record: &Record, ordinal: usize) -> FlatRow {
        let mut row = FlatRow::default();
        for base in &self.config.base_columns {
            let value = match record.field(&base.key) {
                Some(value) => value.clone(),
                None => fallback_value(record, &base.fallback, ordinal),
            };
            row.values.insert(base.key.to_string(), value);
        }
        for column in columns.columns() {
            let ColumnKind::Dynamic { group, .. } = &column.kind else {
                continue;
            };
            let Some(group) = record.group(group) else {
                continue;
            };
            let value = group
                .values
                .get(&column.key)
                .cloned()
                .unwrap_or_else(Scalar::empty);
            row.values.insert(column.key.clone(), value);
        }
        for spec in &self.config.groups {
            if let Some(id) = record.group(&spec.name).and_then(|group| group.id.as_ref()) {
                row.refs.insert(spec.name.to_string(), id.clone());
            }
        }
        row
    }

    /// Project records onto `columns`; the first record gets ordinal `first_ordinal`.
    pub fn flatten_rows<'r, I>(
        &self,
        columns: &ColumnModel,
        records: I,
        first_ordinal: usize,
    ) -> Vec<FlatRow>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        records
            .into_iter()
            .enumerate()
            .map(|(idx, record)| self.flatten_row(columns, record, first_ordinal + idx))
            .collect()
    }

    /// Borrow `record` with its joined base fallbacks resolved, so filters and
    /// ordering see the same text the grid displays.
    pub fn resolve<'r>(&self, record: &'r Record) -> ResolvedRecord<'r>
    where
        'a: 'r,
    {
        let config = self.config;
        let joined = config
            .base_columns
            .iter()
            .filter(|base| matches!(base.fallback, BaseFallback::Join(_)))
            .filter(|base| record.field(&base.key).is_none())
            .map(|base| (base.key.to_string(), fallback_value(record, &base.fallback, 0)))
            .collect();
        ResolvedRecord {
            view: record.view(&config.groups),
            joined,
        }
    }

    /// Discover columns from the first record and flatten the whole batch.
    pub fn flatten(&self, records: &[Record]) -> FlatBatch {
        let columns = self.discover(records.first());
        let rows = self.flatten_rows(&columns, records, 1);
        FlatBatch { columns, rows }
    }
}

/// A record seen through the schema: base fields, then joined fallbacks for
/// base columns it lacks, then dynamic groups in priority order.
///
/// Ordinal fallbacks depend on result position and stay unresolved.
#[derive(Clone, Debug)]
pub struct ResolvedRecord<'r> {
    view: RecordView<'r>,
    joined: IndexMap<String, Scalar>,
}

impl<'r> ResolvedRecord<'r> {
    /// The underlying record.
    pub fn record(&self) -> &'r Record {
        self.view.record()
    }
}

impl FieldLookup for ResolvedRecord<'_> {
    fn lookup(&self, key: &str) -> Option<&Scalar> {
        match self.view.record().field(key) {
            Some(value) => Some(value),
            None => self.joined.get(key).or_else(|| self.view.lookup(key)),
        }
    }
}

fn fallback_value(record: &Record, fallback: &BaseFallback, ordinal: usize) -> Scalar {
    match fallback {
        BaseFallback::Empty => Scalar::empty(),
        BaseFallback::Ordinal => Scalar::from(ordinal),
        BaseFallback::Join(fields) => {
            let parts: Vec<String> = fields
                .iter()
                .map(|field| {
                    record
                        .field(field)
                        .map(|value| value.as_text().into_owned())
                        .unwrap_or_default()
                })
                .collect();
            Scalar::Text(parts.join(JOIN_SEPARATOR))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DynamicGroup, FieldDescriptor};

    fn account(id: &str, fields: &[(&str, &str, &str)]) -> DynamicGroup {
        fields
            .iter()
            .fold(DynamicGroup::with_id(id), |group, (field_id, name, value)| {
                group.with_field(FieldDescriptor::new(*field_id, *name), *value)
            })
    }

    fn sample_record() -> Record {
        Record::new()
            .with_field("id", 1i64)
            .with_field("firstName", "Jon")
            .with_field("lastName", "Snow")
            .with_field("age", 19i64)
            .with_field("city", "Winterfell")
            .with_group(
                "account",
                account(
                    "acc_2",
                    &[("A_rate_2", "Account Rating 2", "AR-1"), ("A_type_2", "Account Type 2", "AR-2")],
                ),
            )
            .with_group(
                "quote",
                account("quote_1", &[("Q_discount_2", "Quote Discount 2", "10%")]),
            )
    }

    #[test]
    fn merged_columns_follow_base_then_group_priority() {
        let config = SchemaConfig::default();
        let flattener = SchemaFlattener::new(&config);
        let model = flattener.discover(Some(&sample_record()));

        assert_eq!(model.len(), 9);
        let keys: Vec<&str> = model.keys().collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "firstName",
                "lastName",
                "age",
                "fullName",
                "city",
                "A_rate_2",
                "A_type_2",
                "Q_discount_2"
            ]
        );
        let quote = model.get("Q_discount_2").unwrap();
        assert_eq!(quote.title, "Q: Quote Discount 2");
        assert_eq!(quote.width, 180);
        assert!(quote.is_dynamic());
    }

    #[test]
    fn empty_batch_yields_base_columns() {
        let config = SchemaConfig::default();
        let batch = SchemaFlattener::new(&config).flatten(&[]);
        assert_eq!(batch.columns.len(), 6);
        assert!(batch.rows.is_empty());
    }

    #[test]
    fn base_fields_fall_back_per_column() {
        let config = SchemaConfig::default();
        let flattener = SchemaFlattener::new(&config);
        let record = Record::new().with_field("firstName", "Arya").with_field("lastName", "Stark");
        let row = flattener.flatten_row(&flattener.base_columns(), &record, 7);

        assert_eq!(row.get("id"), Some(&Scalar::from(7usize)));
        assert_eq!(row.get("fullName"), Some(&Scalar::from("Arya Stark")));
        assert_eq!(row.get("city"), Some(&Scalar::empty()));
    }

    #[test]
    fn resolved_records_expose_joined_fallbacks() {
        let config = SchemaConfig::default();
        let flattener = SchemaFlattener::new(&config);
        let record = Record::new()
            .with_field("firstName", "Arya")
            .with_field("lastName", "Stark")
            .with_group("account", account("acc_1", &[("A_rate_1", "Account Rating 1", "AR-1")]));
        let resolved = flattener.resolve(&record);

        assert_eq!(resolved.lookup("fullName"), Some(&Scalar::from("Arya Stark")));
        assert_eq!(resolved.lookup("firstName"), Some(&Scalar::from("Arya")));
        assert_eq!(resolved.lookup("A_rate_1"), Some(&Scalar::from("AR-1")));
        assert_eq!(resolved.lookup("id"), None);

        let named = record.clone().with_field("fullName", "No One");
        assert_eq!(flattener.resolve(&named).lookup("fullName"), Some(&Scalar::from("No One")));
    }

    #[test]
    fn later_records_follow_first_record_schema() {
        let config = SchemaConfig::default();
        let flattener = SchemaFlattener::new(&config);
        let second = Record::new()
            .with_field("id", 2i64)
            .with_group("account", account("acc_3", &[("A_rate_3", "Account Rating 3", "AR-9")]));
        let third = Record::new().with_field("id", 3i64);
        let batch = flattener.flatten(&[sample_record(), second, third]);

        assert_eq!(batch.columns.len(), 9);
        let second_row = &batch.rows[1];
        assert_eq!(second_row.get("A_rate_2"), Some(&Scalar::empty()));
        assert_eq!(second_row.get("A_rate_3"), None);
        assert_eq!(second_row.get("Q_discount_2"), None);
        assert_eq!(second_row.refs.get("account").map(String::as_str), Some("acc_3"));

        let third_row = &batch.rows[2];
        assert_eq!(third_row.get("A_rate_2"), None);
        assert!(third_row.refs.is_empty());
    }

    #[test]
    fn groups_outside_the_configured_set_are_ignored() {
        let config = SchemaConfig::default();
        let record = sample_record().with_group(
            "invoice",
            account("inv_1", &[("I_total", "Invoice Total", "12")]),
        );
        let model = SchemaFlattener::new(&config).discover(Some(&record));
        assert!(!model.contains("I_total"));
    }

    #[test]
    fn repeated_dynamic_keys_keep_the_first_column() {
        let config = SchemaConfig::default();
        let record = sample_record().with_group(
            "opportunity",
            account("opp_1", &[("city", "City clash", "x"), ("O_score_1", "Opp Score 1", "3")]),
        );
        let model = SchemaFlattener::new(&config).discover(Some(&record));
        assert_eq!(model.len(), 10);
        assert_eq!(model.get("city").unwrap().kind, ColumnKind::Base);
        assert_eq!(model.get("O_score_1").unwrap().title, "O: Opp Score 1");
    }
}
