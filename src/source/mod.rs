//! Record source interface and the bundled in-memory implementation.
//!
//! Ownership model:
//! - `RecordSource` is the service-facing interface that answers page requests.
//! - `InMemorySource` owns a shared, read-only record set and runs the query
//!   pipeline over it for every request.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SchemaConfig;
use crate::constants::status;
use crate::data::Record;
use crate::engine::{PageRequest, QueryEngine};
use crate::errors::GridError;
use crate::types::SourceId;

/// Exact size of the filtered result a page was cut from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Rows in the full filtered and ordered result.
    pub total_count: usize,
}

/// Successful payload of a source response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    /// Raw records of the requested page, in result order.
    pub rows: Vec<Record>,
    /// Result totals.
    pub pagination: Pagination,
    /// First record of the whole filtered result, used for column discovery.
    ///
    /// Sources that cannot provide it leave it `None`; the page's first row
    /// is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_sample: Option<Record>,
}

/// Status-coded answer of a record source.
///
/// Any status other than 200 means "no data".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Payload, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SourceData>,
}

impl SourceResponse {
    /// A 200 response carrying `data`.
    pub fn ok(data: SourceData) -> Self {
        Self {
            status: status::OK,
            data: Some(data),
        }
    }

    /// A data-less response with `status`.
    pub fn failed(status: u16) -> Self {
        Self { status, data: None }
    }

    /// Returns `true` for status 200.
    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }
}

/// Service-facing record provider.
///
/// Implementations apply the request's filter and sort blocks and return one
/// page of raw records plus the exact filtered total.
pub trait RecordSource: Send + Sync {
    /// Stable source identifier used in errors and logs.
    fn id(&self) -> &str;

    /// Answer one page request.
    ///
    /// Return `Ok` with a non-200 status for "no data" answers; reserve `Err`
    /// for sources that cannot answer at all.
    fn fetch_records(&self, request: &PageRequest) -> Result<SourceResponse, GridError>;
}

/// Source backed by an in-memory record set.
#[derive(Clone, Debug)]
pub struct InMemorySource {
    id: SourceId,
    records: Arc<Vec<Record>>,
    engine: QueryEngine,
    latency: Option<Duration>,
}

impl InMemorySource {
    /// Create an in-memory source using the default schema.
    pub fn new(id: impl Into<SourceId>, records: Vec<Record>) -> Self {
        Self::with_schema(id, records, SchemaConfig::default())
    }

    /// Create an in-memory source with an explicit schema.
    pub fn with_schema(id: impl Into<SourceId>, records: Vec<Record>, schema: SchemaConfig) -> Self {
        Self {
            id: id.into(),
            records: Arc::new(records),
            engine: QueryEngine::new(schema),
            latency: None,
        }
    }

    /// Load records from a JSON array file.
    pub fn from_json_file(
        id: impl Into<SourceId>,
        path: impl AsRef<Path>,
        schema: SchemaConfig,
    ) -> Result<Self, GridError> {
        let records = load_records_json(path)?;
        Ok(Self::with_schema(id, records, schema))
    }

    /// Sleep this long before answering each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the source holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch_records(&self, request: &PageRequest) -> Result<SourceResponse, GridError> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        let selection = self.engine.select_page(&self.records, request);
        debug!(
            source_id = %self.id,
            total_count = selection.page.total_count,
            rows = selection.page.rows.len(),
            "answered page request"
        );
        Ok(SourceResponse::ok(SourceData {
            pagination: Pagination {
                total_count: selection.page.total_count,
            },
            schema_sample: selection.schema_sample.cloned(),
            rows: selection.page.rows.into_iter().cloned().collect(),
        }))
    }
}

/// Read a JSON array of records from `path`.
pub fn load_records_json(path: impl AsRef<Path>) -> Result<Vec<Record>, GridError> {
    let file = File::open(path.as_ref())?;
    let records: Vec<Record> = serde_json::from_reader(BufReader::new(file))?;
    debug!(
        path = %path.as_ref().display(),
        records = records.len(),
        "loaded records"
    );
    Ok(records)
}
