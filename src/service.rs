//! Caller-facing facade over a record source.
//!
//! `GridService` tags every page fetch with a request sequence number, shapes
//! source answers into [`GridPage`]s and owns the export workflow.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{GridConfig, PollPolicy};
use crate::constants::pagination::MIN_PAGE;
use crate::download::{
    DownloadPoller, DownloadService, DownloadStatus, DownloadTicket, JobStore, render_csv,
};
use crate::engine::{GridPage, PageRequest, QueryEngine};
use crate::errors::GridError;
use crate::pagination::Page;
use crate::schema::{ColumnDescriptor, ColumnModel};
use crate::sequence::{RequestSeq, RequestSequencer, Sequenced};
use crate::source::RecordSource;
use crate::types::{ColumnKey, DownloadToken};

/// Result of one page fetch: a page, or the reason there is none.
pub type FetchOutcome = Result<GridPage, GridError>;

/// Page fetching, request sequencing and exports for one grid.
pub struct GridService {
    source: Arc<dyn RecordSource>,
    engine: QueryEngine,
    sequencer: RequestSequencer,
    downloads: Arc<DownloadService>,
    config: GridConfig,
}

impl GridService {
    /// Validate `config` and build a service over `source`.
    pub fn new(source: Arc<dyn RecordSource>, config: GridConfig) -> Result<Self, GridError> {
        let downloads = DownloadService::new(config.download.clone());
        Self::build(source, config, downloads)
    }

    /// Like [`new`](Self::new), with an explicit job store.
    pub fn with_job_store(
        source: Arc<dyn RecordSource>,
        config: GridConfig,
        store: Arc<dyn JobStore>,
    ) -> Result<Self, GridError> {
        let downloads = DownloadService::with_store(config.download.clone(), store);
        Self::build(source, config, downloads)
    }

    fn build(
        source: Arc<dyn RecordSource>,
        config: GridConfig,
        downloads: DownloadService,
    ) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self {
            source,
            engine: QueryEngine::new(config.schema.clone()),
            sequencer: RequestSequencer::new(),
            downloads: Arc::new(downloads),
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Base columns, used when no page is available.
    pub fn base_columns(&self) -> ColumnModel {
        self.engine.flattener().base_columns()
    }

    /// Fetch and shape one page, tagged with a fresh sequence number.
    ///
    /// Source failures and non-200 answers come back as `Err` inside the
    /// tagged value; they never abort the caller.
    pub fn fetch_page(&self, request: &PageRequest) -> Sequenced<FetchOutcome> {
        let seq = self.sequencer.issue();
        debug!(
            %seq,
            page_index = request.page_index,
            page_size = request.page_size,
            filter_query = %request.filter_query,
            sorted_query = %request.sorted_query,
            "fetching page"
        );
        Sequenced::new(seq, fetch_shaped(self.source.as_ref(), &self.engine, request))
    }

    /// Returns `true` when `seq` is the most recently issued fetch.
    pub fn is_latest(&self, seq: RequestSeq) -> bool {
        self.sequencer.is_latest(seq)
    }

    /// Issue an export token for `columns` of the filtered and sorted result.
    ///
    /// An empty `columns` list exports every column. The export is rendered by
    /// the token's completion task, capped at the configured row limit.
    pub fn request_download(
        &self,
        columns: &[ColumnKey],
        filter_query: &str,
        sorted_query: &str,
    ) -> Result<DownloadTicket, GridError> {
        let source = Arc::clone(&self.source);
        let engine = self.engine.clone();
        let keys = columns.to_vec();
        let request = PageRequest::new(MIN_PAGE, self.config.download.max_export_rows)
            .with_filter_query(filter_query)
            .with_sorted_query(sorted_query);
        self.downloads.request_token(move || {
            let grid = fetch_shaped(source.as_ref(), &engine, &request)?;
            let selected: Vec<ColumnDescriptor> = if keys.is_empty() {
                grid.columns.columns().to_vec()
            } else {
                keys.iter()
                    .filter_map(|key| grid.columns.get(key).cloned())
                    .collect()
            };
            render_csv(&selected, grid.rows())
        })
    }

    /// Check an export token.
    pub fn check_download(&self, token: &str) -> DownloadStatus {
        self.downloads.check_status(token)
    }

    /// Poll an export token in the background.
    pub fn poll_download(&self, token: impl Into<DownloadToken>, policy: PollPolicy) -> DownloadPoller {
        self.downloads.poll(token.into(), policy)
    }

    /// Shared export service.
    pub fn downloads(&self) -> &Arc<DownloadService> {
        &self.downloads
    }
}

fn fetch_shaped(source: &dyn RecordSource, engine: &QueryEngine, request: &PageRequest) -> FetchOutcome {
    let response = source.fetch_records(request)?;
    if !response.is_ok() {
        warn!(
            source_id = source.id(),
            status = response.status,
            "record source answered without data"
        );
        return Err(GridError::UpstreamStatus {
            source_id: source.id().to_string(),
            status: response.status,
        });
    }
    let Some(data) = response.data else {
        return Ok(GridPage::empty(
            engine.flattener().base_columns(),
            request.page_size,
        ));
    };
    let page = Page {
        rows: data.rows.iter().collect(),
        total_count: data.pagination.total_count,
        page_index: request.page_index.max(MIN_PAGE),
        page_size: request.page_size.max(MIN_PAGE),
    };
    Ok(engine.shape(data.schema_sample.as_ref(), page))
}
