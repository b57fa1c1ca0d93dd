#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Restorable query string codec for filters and sort.
pub mod codec;
/// Grid, schema, download and polling configuration.
pub mod config;
/// Centralized constants used across the codec, schema and export workflow.
pub mod constants;
/// Record, scalar and dynamic group types.
pub mod data;
/// Reusable demo runners.
pub mod demo_apps;
/// Export token issuance, job storage and polling.
pub mod download;
/// Filter, order, page and flatten pipeline.
pub mod engine;
/// 1-based pagination helpers.
pub mod pagination;
/// Filter predicate evaluation.
pub mod predicate;
/// Deterministic sample dataset.
pub mod sample;
/// Column discovery and row flattening.
pub mod schema;
/// Request sequencing for superseded fetches.
pub mod sequence;
/// Caller-facing service over a record source.
pub mod service;
/// Caller-side grid state.
pub mod session;
/// Row ordering.
pub mod sort;
/// Record source trait and built-in sources.
pub mod source;
/// Shared type aliases.
pub mod types;
/// Number parsing and case folding helpers.
pub mod utils;

mod errors;

pub use codec::{
    FilterCriterion, FilterLogic, FilterOperator, FilterSet, GridQuery, SortDirection, SortSpec,
    decode_filters, decode_query, decode_sort, encode_filters, encode_sort,
};
pub use config::{
    BaseColumn, BaseFallback, DownloadConfig, GridConfig, GroupSpec, PollPolicy, SchemaConfig,
};
pub use data::{DynamicGroup, FieldDescriptor, FieldLookup, Record, Scalar};
pub use download::{
    DownloadJob, DownloadPoller, DownloadService, DownloadStatus, DownloadTicket, InMemoryJobStore,
    JobState, JobStore, PollOutcome,
};
pub use engine::{GridPage, PageRequest, QueryEngine};
pub use errors::GridError;
pub use pagination::{Page, paginate};
pub use schema::{
    ColumnDescriptor, ColumnKind, ColumnModel, FlatRow, ResolvedRecord, SchemaFlattener,
};
pub use sequence::{RequestSeq, RequestSequencer, Sequenced};
pub use service::{FetchOutcome, GridService};
pub use session::GridSession;
pub use source::{InMemorySource, RecordSource, SourceData, SourceResponse};
pub use types::{ColumnKey, DownloadToken, FieldId, GroupName, QueryText, SourceId};
