use csv::{Terminator, WriterBuilder};

use crate::codec::encode_component;
use crate::constants::download::CSV_DATA_URL_PREFIX;
use crate::errors::GridError;
use crate::schema::{ColumnDescriptor, FlatRow};

/// Render rows as CSV: one header record of column titles, then one record per row.
///
/// Cells a row does not carry render empty.
pub fn render_csv(columns: &[ColumnDescriptor], rows: &[FlatRow]) -> Result<String, GridError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(columns.iter().map(|column| column.title.as_str()))?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| {
            row.get(&column.key)
                .map(|value| value.as_text().into_owned())
                .unwrap_or_default()
        }))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| GridError::Export(err.error().to_string()))?;
    String::from_utf8(bytes).map_err(|err| GridError::Export(err.to_string()))
}

/// Wrap CSV text in a `data:` URL.
pub fn csv_data_url(csv: &str) -> String {
    format!("{CSV_DATA_URL_PREFIX}{}", encode_component(csv))
}
