use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use gridquery::sample::sample_records;
use gridquery::{
    ColumnKind, DynamicGroup, FieldDescriptor, FilterCriterion, FilterOperator, FilterSet,
    FlatRow, GridConfig, GridError, GridService, GridSession, InMemorySource, PageRequest,
    QueryEngine, Record, RecordSource, Scalar, SourceResponse, encode_filters,
};

fn build_record(id: i64, city: &str, age: i64) -> Record {
    Record::new()
        .with_field("id", id)
        .with_field("firstName", format!("First{id}"))
        .with_field("lastName", format!("Last{id}"))
        .with_field("age", age)
        .with_field("city", city)
}

fn column_values(rows: &[FlatRow], key: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.get(key).map(Scalar::to_string).unwrap_or_default())
        .collect()
}

fn service_over(records: Vec<Record>) -> GridService {
    GridService::new(
        Arc::new(InMemorySource::new("test", records)),
        GridConfig::default(),
    )
    .unwrap()
}

#[test]
fn pagination_is_exact_for_filtered_results() {
    let service = service_over(sample_records(200));
    let filter_query = encode_filters(&FilterSet::all(vec![FilterCriterion::new(
        "city",
        FilterOperator::Equals,
        "Winterfell",
    )]));

    let first = service
        .fetch_page(&PageRequest::new(1, 7).with_filter_query(filter_query.clone()))
        .value
        .unwrap();
    let total = first.total_count();
    assert_eq!(total, 33);

    let page_size = 7;
    let last_index = total.div_ceil(page_size);
    let last = service
        .fetch_page(&PageRequest::new(last_index, page_size).with_filter_query(filter_query.clone()))
        .value
        .unwrap();
    assert_eq!(last.rows().len(), total - (last_index - 1) * page_size);

    for beyond in last_index + 1..last_index + 3 {
        let page = service
            .fetch_page(&PageRequest::new(beyond, page_size).with_filter_query(filter_query.clone()))
            .value
            .unwrap();
        assert!(page.rows().is_empty());
        assert_eq!(page.total_count(), total);
    }
}

#[test]
fn and_or_filters_combine_as_expected() {
    let records = vec![
        build_record(1, "Kings Landing", 45),
        build_record(2, "Kings Landing", 10),
        build_record(3, "Winterfell", 50),
    ];
    let engine = QueryEngine::default();
    let criteria = vec![
        FilterCriterion::new("city", FilterOperator::Contains, "King"),
        FilterCriterion::new("age", FilterOperator::GreaterThan, "40"),
    ];

    let and_page = engine.fetch_page(
        &records[..2],
        &PageRequest::new(1, 20).with_filter_query(FilterSet::all(criteria.clone()).encode()),
    );
    assert_eq!(column_values(and_page.rows(), "id"), vec!["1"]);

    let or_page = engine.fetch_page(
        &[records[0].clone(), records[2].clone()],
        &PageRequest::new(1, 20).with_filter_query(FilterSet::any(criteria.clone()).encode()),
    );
    assert_eq!(column_values(or_page.rows(), "id"), vec!["1", "3"]);

    let or_all = engine.fetch_page(
        &records,
        &PageRequest::new(1, 20).with_filter_query(FilterSet::any(criteria).encode()),
    );
    assert_eq!(or_all.total_count(), 3);
}

#[test]
fn numeric_and_natural_sorting_through_the_pipeline() {
    let records = vec![
        build_record(1, "item10", 35),
        build_record(2, "item2", 16),
        build_record(3, "Item1", 45),
    ];
    let engine = QueryEngine::default();

    let by_age = engine.fetch_page(
        &records,
        &PageRequest::new(1, 20).with_sorted_query("&sortBy=age&sortOrder=asc"),
    );
    assert_eq!(column_values(by_age.rows(), "age"), vec!["16", "35", "45"]);

    let by_city = engine.fetch_page(
        &records,
        &PageRequest::new(1, 20).with_sorted_query("&sortBy=city&sortOrder=asc"),
    );
    assert_eq!(column_values(by_city.rows(), "city"), vec!["Item1", "item2", "item10"]);
}

#[test]
fn dynamic_schema_merges_base_account_then_quote() {
    let first = build_record(1, "Riverrun", 30)
        .with_group(
            "quote",
            DynamicGroup::with_id("quote_1")
                .with_field(FieldDescriptor::new("Q_discount_1", "Quote Discount 1"), "5%"),
        )
        .with_group(
            "account",
            DynamicGroup::with_id("acc_1")
                .with_field(FieldDescriptor::new("A_rate_1", "Account Rating 1"), "AR-1")
                .with_field(FieldDescriptor::new("A_type_1", "Account Type 1"), "AR-2"),
        );
    let second = build_record(2, "Riverrun", 31);
    let page = QueryEngine::default().fetch_page(&[first, second], &PageRequest::default());

    let columns = page.columns.columns();
    assert_eq!(columns.len(), 9);
    assert!(columns[..6].iter().all(|column| column.kind == ColumnKind::Base));
    let dynamic: Vec<(&str, &str)> = columns[6..]
        .iter()
        .map(|column| (column.key.as_str(), column.title.as_str()))
        .collect();
    assert_eq!(
        dynamic,
        vec![
            ("A_rate_1", "A: Account Rating 1"),
            ("A_type_1", "A: Account Type 1"),
            ("Q_discount_1", "Q: Quote Discount 1"),
        ]
    );
    assert_eq!(page.rows()[0].get("fullName"), Some(&Scalar::from("First1 Last1")));
    assert_eq!(page.rows()[1].get("A_rate_1"), None);
}

#[test]
fn columns_stay_stable_across_pages() {
    let service = service_over(sample_records(60));
    let first = service.fetch_page(&PageRequest::new(1, 10)).value.unwrap();
    let third = service.fetch_page(&PageRequest::new(3, 10)).value.unwrap();
    assert_eq!(first.columns, third.columns);
}

struct FlakySource {
    inner: InMemorySource,
    down: AtomicBool,
}

impl RecordSource for FlakySource {
    fn id(&self) -> &str {
        "flaky"
    }

    fn fetch_records(&self, request: &PageRequest) -> Result<SourceResponse, GridError> {
        if self.down.load(Ordering::SeqCst) {
            return Ok(SourceResponse::failed(500));
        }
        self.inner.fetch_records(request)
    }
}

#[test]
fn upstream_failures_show_an_empty_page_with_the_error_kept() {
    let source = Arc::new(FlakySource {
        inner: InMemorySource::new("inner", sample_records(30)),
        down: AtomicBool::new(false),
    });
    let service = GridService::new(source.clone(), GridConfig::default()).unwrap();
    let mut session = GridSession::new(service.config());

    assert!(session.refresh(&service));
    assert_eq!(session.total_count(), 30);
    assert!(session.last_error().is_none());

    source.down.store(true, Ordering::SeqCst);
    assert!(session.refresh(&service));
    assert_eq!(session.total_count(), 0);
    assert!(session.rows().is_empty());
    assert_eq!(session.view().columns.len(), 6);
    assert!(matches!(
        session.last_error(),
        Some(GridError::UpstreamStatus { status: 500, .. })
    ));

    source.down.store(false, Ordering::SeqCst);
    session.set_filters(vec![FilterCriterion::new("city", FilterOperator::Equals, "nowhere")]);
    assert!(session.refresh(&service));
    assert_eq!(session.total_count(), 0);
    assert!(session.last_error().is_none());
}

#[test]
fn slow_stale_responses_never_overwrite_fresh_state() {
    let source = InMemorySource::new("slow", sample_records(50)).with_latency(Duration::from_millis(80));
    let service = Arc::new(GridService::new(Arc::new(source), GridConfig::default()).unwrap());
    let mut session = GridSession::new(service.config());

    let slow_request = session.request();
    let slow_service = Arc::clone(&service);
    let slow = thread::spawn(move || slow_service.fetch_page(&slow_request));
    thread::sleep(Duration::from_millis(20));

    session.set_filters(vec![FilterCriterion::new("city", FilterOperator::Equals, "Riverrun")]);
    let fresh = service.fetch_page(&session.request());
    let stale = slow.join().unwrap();

    assert!(stale.seq < fresh.seq);
    assert!(session.accept(fresh, &service));
    let filtered_total = session.total_count();
    assert!(filtered_total < 50);
    assert!(!session.accept(stale, &service));
    assert_eq!(session.total_count(), filtered_total);
}
