use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum, error::ErrorKind};

use crate::codec::{FilterCriterion, FilterLogic, FilterOperator, SortDirection};
use crate::config::GridConfig;
use crate::constants::query::{KEY_VALUE_SEPARATOR, OPERATOR_SEPARATOR};
use crate::constants::sample::{SAMPLE_RECORD_COUNT, SAMPLE_SOURCE_ID};
use crate::download::PollOutcome;
use crate::sample::sample_records;
use crate::service::GridService;
use crate::session::GridSession;
use crate::source::{InMemorySource, RecordSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogicArg {
    And,
    Or,
}

impl From<LogicArg> for FilterLogic {
    fn from(value: LogicArg) -> Self {
        match value {
            LogicArg::And => FilterLogic::And,
            LogicArg::Or => FilterLogic::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortDirection {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => SortDirection::Asc,
            OrderArg::Desc => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "grid_demo",
    disable_help_subcommand = true,
    about = "Query a record set like a paginated grid",
    long_about = "Filter, sort and page a record set, print the flattened page, and optionally run the export workflow.",
    after_help = "Without --records the bundled sample dataset is used. Filters use FIELD=OPERATOR[:VALUE], e.g. --filter city=contains:King --filter age=gt:40."
)]
/// CLI for `grid_demo`.
struct GridDemoCli {
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON array of records to load instead of the sample dataset"
    )]
    records: Option<PathBuf>,
    #[arg(
        long = "sample-size",
        default_value_t = SAMPLE_RECORD_COUNT,
        value_parser = parse_positive_usize,
        help = "Number of sample records to generate"
    )]
    sample_size: usize,
    #[arg(
        long,
        default_value_t = 1,
        value_parser = parse_positive_usize,
        help = "1-based page to show"
    )]
    page: usize,
    #[arg(
        long = "page-size",
        value_parser = parse_positive_usize,
        help = "Rows per page (defaults to the configured page size)"
    )]
    page_size: Option<usize>,
    #[arg(
        long = "filter",
        value_name = "FIELD=OPERATOR[:VALUE]",
        value_parser = parse_filter_arg,
        help = "Filter criterion, repeat as needed"
    )]
    filters: Vec<FilterCriterion>,
    #[arg(long, value_enum, default_value = "and", help = "How filter criteria combine")]
    logic: LogicArg,
    #[arg(long = "sort-by", value_name = "COLUMN", help = "Column to sort by")]
    sort_by: Option<String>,
    #[arg(
        long = "sort-order",
        value_enum,
        default_value = "asc",
        help = "Sort direction used with --sort-by"
    )]
    sort_order: OrderArg,
    #[arg(long = "hide", value_name = "COLUMN", help = "Hide a column, repeat as needed")]
    hidden: Vec<String>,
    #[arg(long, help = "Print the page as JSON instead of a table")]
    json: bool,
    #[arg(long, help = "Run the export workflow for the current query and wait for it")]
    download: bool,
}

/// Run the grid demo with `args_iter` (program name excluded).
pub fn run_grid_demo<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<GridDemoCli, _>(std::iter::once("grid_demo".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let config = GridConfig::default();
    let source: Arc<dyn RecordSource> = match &cli.records {
        Some(path) => Arc::new(InMemorySource::from_json_file(
            path.display().to_string(),
            path,
            config.schema.clone(),
        )?),
        None => Arc::new(InMemorySource::new(
            SAMPLE_SOURCE_ID,
            sample_records(cli.sample_size),
        )),
    };
    let service = GridService::new(source, config.clone())?;

    let mut session = GridSession::new(&config);
    session.set_filters(cli.filters);
    session.set_logic(cli.logic.into());
    if let Some(column) = cli.sort_by {
        session.toggle_sort(column, cli.sort_order.into());
    }
    if let Some(page_size) = cli.page_size {
        session.set_page_size(offered_page_size(&config, page_size)?);
    }
    session.set_page(cli.page);
    for column in &cli.hidden {
        session.toggle_column(column);
    }

    session.refresh(&service);
    if let Some(err) = session.last_error() {
        return Err(format!("fetch failed: {err}").into());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(session.view())?);
    } else {
        print_table(&session);
    }

    if cli.download {
        let ticket = session.request_download(&service)?;
        println!("export token: {}", ticket.token);
        let mut poller = service.poll_download(ticket.token, config.poll.clone());
        match poller.wait() {
            PollOutcome::Ready { url } => {
                println!("export ready after {} checks ({} bytes)", poller.attempts(), url.len());
                println!("{}", preview(&url, 96));
            }
            other => return Err(format!("export did not complete: {other:?}").into()),
        }
    }
    Ok(())
}

fn print_table(session: &GridSession) {
    let columns = session.visible_columns();
    let header: Vec<&str> = columns.iter().map(|column| column.title.as_str()).collect();
    println!("{}", header.join(" | "));
    for row in session.rows() {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                row.get(&column.key)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!(
        "page {} of {} ({} matching rows, filter '{}', sort '{}')",
        session.page_index(),
        session.page_count(),
        session.total_count(),
        session.filter_query(),
        session.sorted_query()
    );
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

fn offered_page_size(config: &GridConfig, page_size: usize) -> Result<usize, String> {
    if config.offers_page_size(page_size) {
        Ok(page_size)
    } else {
        Err(format!(
            "--page-size {} is not one of the offered sizes {:?}",
            page_size, config.page_size_options
        ))
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_filter_arg(raw: &str) -> Result<FilterCriterion, String> {
    let (field, rest) = raw
        .split_once(KEY_VALUE_SEPARATOR)
        .ok_or_else(|| format!("--filter '{}' must look like FIELD=OPERATOR[:VALUE]", raw))?;
    let field = field.trim();
    if field.is_empty() || rest.is_empty() {
        return Err(format!("--filter '{}' needs both a field and an operator", raw));
    }
    let (operator, value) = rest.split_once(OPERATOR_SEPARATOR).unwrap_or((rest, ""));
    Ok(FilterCriterion::new(
        field,
        FilterOperator::parse(operator),
        value,
    ))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
