//! Filter, order, page and flatten an owned record set.
//!
//! Ownership model:
//! - `QueryEngine` holds only the schema configuration; every call is a pure
//!   function of its inputs and may run concurrently.
//! - `select_page` works on borrowed records so sources can page without
//!   cloning the corpus; `shape` turns a selected page into flat rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{FilterSet, SortSpec, decode_filters, decode_sort};
use crate::config::SchemaConfig;
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MIN_PAGE};
use crate::data::{FieldLookup, Record};
use crate::pagination::{Page, page_bounds, paginate_owned};
use crate::predicate;
use crate::schema::{ColumnModel, FlatRow, ResolvedRecord, SchemaFlattener};
use crate::sort::compare;
use crate::types::QueryText;

/// Parameters of one page fetch, as passed to a record source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page index.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Encoded filter block (may be empty).
    #[serde(default)]
    pub filter_query: QueryText,
    /// Encoded sort block (may be empty).
    #[serde(default)]
    pub sorted_query: QueryText,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_index: MIN_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            filter_query: QueryText::new(),
            sorted_query: QueryText::new(),
        }
    }
}

impl PageRequest {
    /// Request a page without filters or sort.
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
            ..Self::default()
        }
    }

    /// Attach an encoded filter block.
    pub fn with_filter_query(mut self, filter_query: impl Into<QueryText>) -> Self {
        self.filter_query = filter_query.into();
        self
    }

    /// Attach an encoded sort block.
    pub fn with_sorted_query(mut self, sorted_query: impl Into<QueryText>) -> Self {
        self.sorted_query = sorted_query.into();
        self
    }
}

/// A page of flattened rows plus the merged column model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPage {
    /// Columns derived from the first record of the filtered result.
    pub columns: ColumnModel,
    /// Flattened rows of the requested page.
    #[serde(flatten)]
    pub page: Page<FlatRow>,
}

impl GridPage {
    /// An empty page carrying only the given columns.
    pub fn empty(columns: ColumnModel, page_size: usize) -> Self {
        Self {
            columns,
            page: Page::empty(page_size),
        }
    }

    /// Rows on this page.
    pub fn rows(&self) -> &[FlatRow] {
        &self.page.rows
    }

    /// Size of the full filtered result.
    pub fn total_count(&self) -> usize {
        self.page.total_count
    }
}

/// Borrowed result of filtering, ordering and slicing.
#[derive(Clone, Debug)]
pub struct Selection<'r> {
    /// Records of the requested page, in result order.
    pub page: Page<&'r Record>,
    /// First record of the whole filtered and ordered result.
    pub schema_sample: Option<&'r Record>,
}

/// Pure query pipeline over a schema configuration.
#[derive(Clone, Debug, Default)]
pub struct QueryEngine {
    schema: SchemaConfig,
}

impl QueryEngine {
    /// Create an engine over `schema`.
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    /// Schema configuration in use.
    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Flattener bound to this engine's schema.
    pub fn flattener(&self) -> SchemaFlattener<'_> {
        SchemaFlattener::new(&self.schema)
    }

    /// Filter and stably order `records`.
    ///
    /// Criteria naming a field outside the column model of `records` are
    /// ignored. Base columns a record lacks are matched and ordered by their
    /// joined fallback text; ordinal fallbacks are not.
    pub fn select<'r>(
        &self,
        records: &'r [Record],
        filters: &FilterSet,
        sort: &SortSpec,
    ) -> Vec<&'r Record> {
        let known = self.flattener().discover(records.first());
        let mut effective = FilterSet {
            criteria: Vec::with_capacity(filters.criteria.len()),
            logic: filters.logic,
        };
        for criterion in &filters.criteria {
            if known.contains(&criterion.field) {
                effective.criteria.push(criterion.clone());
            } else {
                debug!(
                    field = %criterion.field,
                    operator = %criterion.operator,
                    "ignoring filter on unknown field"
                );
            }
        }

        let flattener = self.flattener();
        let mut selected: Vec<(&'r Record, ResolvedRecord<'_>)> = records
            .iter()
            .map(|record| (record, flattener.resolve(record)))
            .filter(|(_, resolved)| predicate::matches(resolved, &effective))
            .collect();
        if let Some((field, direction)) = sort.active() {
            selected.sort_by(|(_, a), (_, b)| compare(a.lookup(field), b.lookup(field), direction));
        }
        selected.into_iter().map(|(record, _)| record).collect()
    }

    /// Decode the request, select matching records and slice the requested page.
    pub fn select_page<'r>(&self, records: &'r [Record], request: &PageRequest) -> Selection<'r> {
        let filters = decode_filters(&request.filter_query);
        let sort = decode_sort(&request.sorted_query);
        let selected = self.select(records, &filters, &sort);
        let schema_sample = selected.first().copied();
        let page = paginate_owned(selected, request.page_index, request.page_size);
        debug!(
            total_count = page.total_count,
            page_index = page.page_index,
            page_size = page.page_size,
            criteria = filters.criteria.len(),
            "selected page"
        );
        Selection {
            page,
            schema_sample,
        }
    }

    /// Discover columns from `schema_sample` (falling back to the page's first
    /// row) and flatten the page's records.
    pub fn shape(&self, schema_sample: Option<&Record>, page: Page<&Record>) -> GridPage {
        let flattener = self.flattener();
        let columns = flattener.discover(schema_sample.or_else(|| page.rows.first().copied()));
        let mut ordinal = page_bounds(page.total_count, page.page_index, page.page_size).start + 1;
        let page = page.map(|record| {
            let row = flattener.flatten_row(&columns, record, ordinal);
            ordinal += 1;
            row
        });
        GridPage { columns, page }
    }

    /// Full pipeline: decode, filter, order, discover columns, paginate, flatten.
    pub fn fetch_page(&self, records: &[Record], request: &PageRequest) -> GridPage {
        let selection = self.select_page(records, request);
        self.shape(selection.schema_sample, selection.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FilterCriterion, FilterOperator, SortDirection};
    use crate::data::{DynamicGroup, FieldDescriptor, Scalar};

    fn build_record(id: i64, city: &str, age: i64) -> Record {
        Record::new()
            .with_field("id", id)
            .with_field("firstName", format!("Name{id}"))
            .with_field("lastName", "Stark")
            .with_field("age", age)
            .with_field("city", city)
    }

    fn with_account(record: Record, field_id: &str, value: &str) -> Record {
        record.with_group(
            "account",
            DynamicGroup::with_id("acc_1")
                .with_field(FieldDescriptor::new(field_id, "Account Rating"), value),
        )
    }

    fn ids(page: &GridPage) -> Vec<String> {
        page.rows()
            .iter()
            .map(|row| row.get("id").map(Scalar::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn filters_sorts_and_pages_in_one_pass() {
        let records: Vec<Record> = (1..=30)
            .map(|id| build_record(id, if id % 3 == 0 { "Winterfell" } else { "Riverrun" }, 60 - id))
            .collect();
        let request = PageRequest::new(2, 4)
            .with_filter_query("&city=equals:winterfell")
            .with_sorted_query("&sortBy=age&sortOrder=asc");
        let page = QueryEngine::default().fetch_page(&records, &request);

        assert_eq!(page.total_count(), 10);
        assert_eq!(ids(&page), vec!["18", "15", "12", "9"]);
        assert_eq!(page.page.page_count(), 3);
    }

    #[test]
    fn criteria_on_unknown_fields_are_ignored() {
        let records = vec![build_record(1, "Winterfell", 10), build_record(2, "Riverrun", 20)];
        let engine = QueryEngine::default();
        let filters = FilterSet::all(vec![
            FilterCriterion::new("nickname", FilterOperator::Equals, "Wolf"),
            FilterCriterion::new("age", FilterOperator::GreaterThan, "15"),
        ]);
        let selected = engine.select(&records, &filters, &SortSpec::unsorted());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].field("city"), Some(&Scalar::from("Riverrun")));
    }

    #[test]
    fn dynamic_values_can_be_filtered_and_sorted() {
        let records = vec![
            with_account(build_record(1, "Winterfell", 10), "A_rate_1", "AR-3"),
            with_account(build_record(2, "Riverrun", 20), "A_rate_1", "AR-10"),
            with_account(build_record(3, "Riverrun", 30), "A_rate_1", "BR-1"),
        ];
        let engine = QueryEngine::default();
        let filters = FilterSet::all(vec![FilterCriterion::new(
            "A_rate_1",
            FilterOperator::StartsWith,
            "ar",
        )]);
        let selected =
            engine.select(&records, &filters, &SortSpec::by("A_rate_1", SortDirection::Desc));
        let cities: Vec<String> = selected
            .iter()
            .map(|record| record.field("id").map(Scalar::to_string).unwrap_or_default())
            .collect();
        assert_eq!(cities, vec!["2", "1"]);
    }

    #[test]
    fn joined_fallbacks_are_filtered_and_sorted_as_displayed() {
        let records = vec![
            Record::new().with_field("firstName", "Sansa").with_field("lastName", "Stark"),
            Record::new().with_field("firstName", "Arya").with_field("lastName", "Stark"),
            Record::new().with_field("firstName", "Jon").with_field("lastName", "Snow"),
        ];
        let engine = QueryEngine::default();

        let filtered = engine.fetch_page(
            &records,
            &PageRequest::new(1, 20).with_filter_query("&fullName=contains:arya"),
        );
        assert_eq!(filtered.total_count(), 1);
        assert_eq!(filtered.rows()[0].get("fullName"), Some(&Scalar::from("Arya Stark")));

        let sorted = engine.fetch_page(
            &records,
            &PageRequest::new(1, 20).with_sorted_query("&sortBy=fullName&sortOrder=asc"),
        );
        let names: Vec<String> = sorted
            .rows()
            .iter()
            .map(|row| row.get("fullName").map(Scalar::to_string).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["Arya Stark", "Jon Snow", "Sansa Stark"]);
    }

    #[test]
    fn columns_come_from_the_filtered_result_not_the_page() {
        let records = vec![
            build_record(1, "Winterfell", 10),
            with_account(build_record(2, "Riverrun", 20), "A_rate_1", "AR-1"),
            build_record(3, "Riverrun", 30),
        ];
        let engine = QueryEngine::default();
        let request = PageRequest::new(2, 1).with_filter_query("&city=equals:Riverrun");
        let page = engine.fetch_page(&records, &request);

        assert_eq!(page.columns.len(), 7);
        assert!(page.columns.contains("A_rate_1"));
        assert_eq!(ids(&page), vec!["3"]);
        assert_eq!(page.rows()[0].get("A_rate_1"), None);
    }

    #[test]
    fn ordinal_fallback_counts_across_pages() {
        let records: Vec<Record> = (0..5)
            .map(|_| Record::new().with_field("firstName", "Hodor"))
            .collect();
        let page = QueryEngine::default().fetch_page(&records, &PageRequest::new(2, 2));
        assert_eq!(ids(&page), vec!["3", "4"]);
    }

    #[test]
    fn empty_record_set_yields_base_columns() {
        let page = QueryEngine::default().fetch_page(&[], &PageRequest::default());
        assert_eq!(page.columns.len(), 6);
        assert_eq!(page.total_count(), 0);
        assert!(page.rows().is_empty());
    }
}
