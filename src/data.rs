use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::GroupSpec;
use crate::types::{FieldId, GroupName};

/// A single cell value: text or number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Numeric cell.
    Number(f64),
    /// Text cell.
    Text(String),
}

impl Scalar {
    /// An empty text value.
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Text form of the value.
    ///
    /// Integral numbers render without a fractional part (`45`, not `45.0`).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Number(value) => Cow::Owned(format_number(*value)),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    value.to_string()
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

/// Self-description of one dynamic field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Stable identifier; becomes the column key.
    pub field_id: FieldId,
    /// Human readable name; becomes part of the column title.
    pub field_name: String,
}

impl FieldDescriptor {
    /// Build a descriptor.
    pub fn new(field_id: impl Into<FieldId>, field_name: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            field_name: field_name.into(),
        }
    }
}

/// A cluster of fields contributed by a related sub-entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicGroup {
    /// Reference id of the sub-entity (kept on flat rows for links).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fields this group declares, in display order.
    #[serde(default)]
    pub descriptors: Vec<FieldDescriptor>,
    /// Values keyed by field id.
    #[serde(default)]
    pub values: IndexMap<FieldId, Scalar>,
}

impl DynamicGroup {
    /// Build an empty group with a reference id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Declare a field and set its value.
    pub fn with_field(
        mut self,
        descriptor: FieldDescriptor,
        value: impl Into<Scalar>,
    ) -> Self {
        self.values
            .insert(descriptor.field_id.clone(), value.into());
        self.descriptors.push(descriptor);
        self
    }
}

/// A heterogeneous input record: base fields plus named dynamic groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Base fields keyed by field name.
    #[serde(default)]
    pub fields: IndexMap<String, Scalar>,
    /// Dynamic groups keyed by group name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<GroupName, DynamicGroup>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a base field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attach a dynamic group.
    pub fn with_group(mut self, name: impl Into<GroupName>, group: DynamicGroup) -> Self {
        self.groups.insert(name.into(), group);
        self
    }

    /// Base field value, if present.
    pub fn field(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    /// Dynamic group, if present.
    pub fn group(&self, name: &str) -> Option<&DynamicGroup> {
        self.groups.get(name)
    }

    /// Borrow this record together with the configured group priority.
    pub fn view<'a>(&'a self, groups: &'a [GroupSpec]) -> RecordView<'a> {
        RecordView {
            record: self,
            groups,
        }
    }
}

/// Read access to a row's cells by column key.
///
/// Implemented by raw records (through [`RecordView`]) and by flattened rows,
/// so predicates and comparators work on either.
pub trait FieldLookup {
    /// Cell value for `key`, or `None` when the row does not carry it.
    fn lookup(&self, key: &str) -> Option<&Scalar>;
}

/// A record paired with the group priority used to resolve dynamic keys.
#[derive(Clone, Copy, Debug)]
pub struct RecordView<'a> {
    record: &'a Record,
    groups: &'a [GroupSpec],
}

impl<'a> RecordView<'a> {
    /// The underlying record.
    pub fn record(&self) -> &'a Record {
        self.record
    }
}

impl FieldLookup for RecordView<'_> {
    fn lookup(&self, key: &str) -> Option<&Scalar> {
        if let Some(value) = self.record.fields.get(key) {
            return Some(value);
        }
        self.groups.iter().find_map(|spec| {
            self.record
                .groups
                .get(spec.name.as_ref())
                .and_then(|group| group.values.get(key))
        })
    }
}

impl FieldLookup for IndexMap<String, Scalar> {
    fn lookup(&self, key: &str) -> Option<&Scalar> {
        self.get(key)
    }
}
