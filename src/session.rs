//! Caller-side grid state.
//!
//! A `GridSession` owns the authoritative filters, sort, paging and column
//! visibility for one grid, derives the query strings from them, and accepts
//! fetched pages only when they answer the latest request.

use tracing::{debug, warn};

use crate::codec::{
    FilterCriterion, FilterLogic, FilterOperator, FilterSet, SortDirection, SortSpec,
    decode_filters, decode_sort,
};
use crate::config::GridConfig;
use crate::constants::pagination::MIN_PAGE;
use crate::download::DownloadTicket;
use crate::engine::{GridPage, PageRequest};
use crate::errors::GridError;
use crate::pagination::page_count;
use crate::schema::{ColumnDescriptor, ColumnModel, FlatRow, SchemaFlattener};
use crate::sequence::Sequenced;
use crate::service::{FetchOutcome, GridService};
use crate::types::{ColumnKey, QueryText};

/// Filters, sort, paging and visibility state for one grid view.
#[derive(Debug)]
pub struct GridSession {
    filters: FilterSet,
    sort: SortSpec,
    page_index: usize,
    page_size: usize,
    hidden: Vec<ColumnKey>,
    base_columns: ColumnModel,
    view: GridPage,
    last_error: Option<GridError>,
}

impl GridSession {
    /// Fresh session: no filters, unsorted, first page, default page size.
    pub fn new(config: &GridConfig) -> Self {
        let base_columns = SchemaFlattener::new(&config.schema).base_columns();
        let page_size = config.default_page_size.max(MIN_PAGE);
        Self {
            filters: FilterSet::default(),
            sort: SortSpec::unsorted(),
            page_index: MIN_PAGE,
            page_size,
            hidden: Vec::new(),
            view: GridPage::empty(base_columns.clone(), page_size),
            base_columns,
            last_error: None,
        }
    }

    /// Current filters.
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Replace the filter criteria and return to the first page.
    pub fn set_filters(&mut self, criteria: Vec<FilterCriterion>) {
        self.filters.criteria = criteria;
        self.page_index = MIN_PAGE;
    }

    /// Change how criteria combine and return to the first page.
    pub fn set_logic(&mut self, logic: FilterLogic) {
        self.filters.logic = logic;
        self.page_index = MIN_PAGE;
    }

    /// Start filtering `column` with an empty `contains` criterion.
    pub fn open_filter_for_column(&mut self, column: impl Into<ColumnKey>) {
        self.set_filters(vec![FilterCriterion::new(
            column,
            FilterOperator::Contains,
            String::new(),
        )]);
    }

    /// Current sort.
    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Sort by `column` in `direction`; choosing the active sort again clears
    /// it. Returns to the first page.
    pub fn toggle_sort(&mut self, column: impl Into<ColumnKey>, direction: SortDirection) {
        let column = column.into();
        let already_active = self
            .sort
            .active()
            .is_some_and(|(field, current)| field == column && current == direction);
        self.sort = if already_active {
            SortSpec::unsorted()
        } else {
            SortSpec::by(column, direction)
        };
        self.page_index = MIN_PAGE;
    }

    /// Current 1-based page.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Current page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Jump to a page; values below 1 become 1.
    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index.max(MIN_PAGE);
    }

    /// Change the page size and return to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(MIN_PAGE);
        self.page_index = MIN_PAGE;
    }

    /// Pages in the last accepted result (at least 1).
    pub fn page_count(&self) -> usize {
        page_count(self.view.total_count(), self.page_size)
    }

    /// Go to the first page.
    pub fn first_page(&mut self) {
        self.page_index = MIN_PAGE;
    }

    /// Go back one page, stopping at the first.
    pub fn previous_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1).max(MIN_PAGE);
    }

    /// Advance one page unless the current page already reaches the total.
    pub fn next_page(&mut self) {
        if self.page_index.saturating_mul(self.page_size) < self.view.total_count() {
            self.page_index += 1;
        }
    }

    /// Go to the last page of the last accepted result.
    pub fn last_page(&mut self) {
        self.page_index = self.page_count();
    }

    /// Encoded filter block for the current filters.
    pub fn filter_query(&self) -> QueryText {
        self.filters.encode()
    }

    /// Encoded sort block for the current sort.
    pub fn sorted_query(&self) -> QueryText {
        self.sort.encode()
    }

    /// Restore filters and sort from saved query strings and return to the
    /// first page.
    pub fn restore(&mut self, filter_query: &str, sorted_query: &str) {
        self.filters = decode_filters(filter_query);
        self.sort = decode_sort(sorted_query);
        self.page_index = MIN_PAGE;
        debug!(
            criteria = self.filters.criteria.len(),
            sorted = self.sort.active().is_some(),
            "restored grid query"
        );
    }

    /// Page request for the current state.
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page_index, self.page_size)
            .with_filter_query(self.filter_query())
            .with_sorted_query(self.sorted_query())
    }

    /// Fetch the current page from `service` and accept it.
    pub fn refresh(&mut self, service: &GridService) -> bool {
        let outcome = service.fetch_page(&self.request());
        self.accept(outcome, service)
    }

    /// Apply a fetched page unless a newer request was issued since.
    ///
    /// Returns `false` for stale results, which leave the view untouched. A
    /// failed fetch shows an empty page with the base columns and keeps the
    /// error so an empty result stays distinguishable from a failure.
    pub fn accept(&mut self, outcome: Sequenced<FetchOutcome>, service: &GridService) -> bool {
        if !service.is_latest(outcome.seq) {
            debug!(seq = %outcome.seq, "dropping stale page");
            return false;
        }
        match outcome.value {
            Ok(page) => {
                self.view = page;
                self.last_error = None;
            }
            Err(err) => {
                warn!(seq = %outcome.seq, error = %err, "page fetch failed");
                self.view = GridPage::empty(self.base_columns.clone(), self.page_size);
                self.last_error = Some(err);
            }
        }
        true
    }

    /// Last accepted page.
    pub fn view(&self) -> &GridPage {
        &self.view
    }

    /// Rows of the last accepted page.
    pub fn rows(&self) -> &[FlatRow] {
        self.view.rows()
    }

    /// Total of the last accepted page.
    pub fn total_count(&self) -> usize {
        self.view.total_count()
    }

    /// Error of the last accepted fetch, if it failed.
    pub fn last_error(&self) -> Option<&GridError> {
        self.last_error.as_ref()
    }

    /// Hide a visible column or show a hidden one.
    pub fn toggle_column(&mut self, key: &str) {
        match self.hidden.iter().position(|hidden| hidden == key) {
            Some(idx) => {
                self.hidden.remove(idx);
            }
            None => self.hidden.push(key.to_string()),
        }
    }

    /// Returns `true` when `key` is hidden.
    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.iter().any(|hidden| hidden == key)
    }

    /// Unhide every column.
    pub fn show_all_columns(&mut self) {
        self.hidden.clear();
    }

    /// Columns of the last accepted page that are not hidden.
    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        self.view
            .columns
            .columns()
            .iter()
            .filter(|column| !self.is_hidden(&column.key))
            .collect()
    }

    /// Clear filters, sort and hidden columns and return to the first page.
    pub fn reset(&mut self) {
        self.filters = FilterSet::default();
        self.sort = SortSpec::unsorted();
        self.hidden.clear();
        self.page_index = MIN_PAGE;
    }

    /// Export every column of the current view for the current filters and sort.
    ///
    /// Refused with [`GridError::Export`] when the view has no rows.
    pub fn request_download(&self, service: &GridService) -> Result<DownloadTicket, GridError> {
        if self.view.rows().is_empty() {
            return Err(GridError::Export(
                "empty report cannot be downloaded".to_string(),
            ));
        }
        let columns: Vec<ColumnKey> = self.view.columns.keys().map(str::to_string).collect();
        service.request_download(&columns, &self.filter_query(), &self.sorted_query())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::Record;
    use crate::source::InMemorySource;

    fn build_record(id: i64, city: &str) -> Record {
        Record::new()
            .with_field("id", id)
            .with_field("firstName", "Sansa")
            .with_field("lastName", "Stark")
            .with_field("city", city)
    }

    fn service(count: i64) -> GridService {
        let records = (1..=count)
            .map(|id| build_record(id, if id % 2 == 0 { "Winterfell" } else { "Riverrun" }))
            .collect();
        GridService::new(
            Arc::new(InMemorySource::new("unit", records)),
            GridConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn filter_and_sort_changes_reset_the_page() {
        let mut session = GridSession::new(&GridConfig::default());
        session.set_page(4);
        session.set_filters(vec![FilterCriterion::new(
            "city",
            FilterOperator::Equals,
            "Winterfell",
        )]);
        assert_eq!(session.page_index(), 1);
        assert_eq!(session.filter_query(), "&city=equals:Winterfell");

        session.set_page(3);
        session.toggle_sort("age", SortDirection::Desc);
        assert_eq!(session.page_index(), 1);
        assert_eq!(session.sorted_query(), "&sortBy=age&sortOrder=desc");

        session.set_page(2);
        session.set_page_size(50);
        assert_eq!(session.page_index(), 1);
    }

    #[test]
    fn toggling_the_active_sort_clears_it() {
        let mut session = GridSession::new(&GridConfig::default());
        session.toggle_sort("city", SortDirection::Asc);
        session.toggle_sort("city", SortDirection::Desc);
        assert_eq!(session.sort(), &SortSpec::by("city", SortDirection::Desc));
        session.toggle_sort("city", SortDirection::Desc);
        assert_eq!(session.sorted_query(), "");
    }

    #[test]
    fn navigation_stays_within_the_result() {
        let service = service(45);
        let mut session = GridSession::new(&GridConfig::default());
        assert!(session.refresh(&service));
        assert_eq!(session.page_count(), 3);

        session.previous_page();
        assert_eq!(session.page_index(), 1);
        session.last_page();
        assert_eq!(session.page_index(), 3);
        session.next_page();
        assert_eq!(session.page_index(), 3);
        assert!(session.refresh(&service));
        assert_eq!(session.rows().len(), 5);
        session.first_page();
        assert_eq!(session.page_index(), 1);
    }

    #[test]
    fn stale_pages_are_dropped() {
        let service = service(10);
        let mut session = GridSession::new(&GridConfig::default());
        session.open_filter_for_column("city");
        let stale = service.fetch_page(&session.request());
        session.set_filters(vec![FilterCriterion::new(
            "city",
            FilterOperator::Equals,
            "Riverrun",
        )]);
        let fresh = service.fetch_page(&session.request());

        assert!(session.accept(fresh, &service));
        assert_eq!(session.total_count(), 5);
        assert!(!session.accept(stale, &service));
        assert_eq!(session.total_count(), 5);
    }

    #[test]
    fn hidden_columns_filter_the_visible_set() {
        let service = service(3);
        let mut session = GridSession::new(&GridConfig::default());
        session.refresh(&service);
        session.toggle_column("age");
        session.toggle_column("city");
        assert!(session.is_hidden("age"));
        assert_eq!(session.visible_columns().len(), 4);
        session.toggle_column("age");
        assert_eq!(session.visible_columns().len(), 5);
        session.show_all_columns();
        assert_eq!(session.visible_columns().len(), 6);
    }

    #[test]
    fn empty_views_cannot_be_downloaded() {
        let service = service(0);
        let mut session = GridSession::new(&GridConfig::default());
        session.refresh(&service);
        let err = session.request_download(&service).unwrap_err();
        assert!(matches!(err, GridError::Export(_)));
    }

    #[test]
    fn restore_and_reset_round_trip_state() {
        let mut session = GridSession::new(&GridConfig::default());
        session.restore("&city=contains:King&logic=OR", "&sortBy=age&sortOrder=asc");
        assert_eq!(session.filters().logic, FilterLogic::Or);
        assert_eq!(session.filter_query(), "&city=contains:King&logic=OR");
        assert_eq!(session.sorted_query(), "&sortBy=age&sortOrder=asc");

        session.toggle_column("city");
        session.reset();
        assert_eq!(session.filter_query(), "");
        assert_eq!(session.sorted_query(), "");
        assert!(!session.is_hidden("city"));
    }
}
