/// Constants used by the query string codec.
pub mod query {
    /// Separator between `key=value` pairs.
    pub const PAIR_SEPARATOR: char = '&';
    /// Separator between a key and its value.
    pub const KEY_VALUE_SEPARATOR: char = '=';
    /// Separator between an operator tag and its encoded filter value.
    pub const OPERATOR_SEPARATOR: char = ':';
    /// Reserved key selecting how criteria combine (`AND`/`OR`).
    pub const LOGIC_KEY: &str = "logic";
    /// Reserved key naming the sorted column.
    pub const SORT_BY_KEY: &str = "sortBy";
    /// Reserved key naming the sort direction.
    pub const SORT_ORDER_KEY: &str = "sortOrder";
    /// Wire spelling of the `AND` combination mode.
    pub const LOGIC_AND: &str = "AND";
    /// Wire spelling of the `OR` combination mode.
    pub const LOGIC_OR: &str = "OR";
    /// Wire spelling of ascending order.
    pub const SORT_ASC: &str = "asc";
    /// Wire spelling of descending order.
    pub const SORT_DESC: &str = "desc";
}

/// Canonical operator spellings and accepted legacy aliases.
pub mod operators {
    /// Substring match.
    pub const CONTAINS: &str = "contains";
    /// Negated substring match.
    pub const DOES_NOT_CONTAIN: &str = "doesNotContain";
    /// Full match.
    pub const EQUALS: &str = "equals";
    /// Negated full match.
    pub const DOES_NOT_EQUAL: &str = "doesNotEqual";
    /// Prefix match.
    pub const STARTS_WITH: &str = "startsWith";
    /// Suffix match.
    pub const ENDS_WITH: &str = "endsWith";
    /// Numeric greater-than.
    pub const GREATER_THAN: &str = "gt";
    /// Numeric less-than.
    pub const LESS_THAN: &str = "lt";
    /// Blank cell.
    pub const IS_EMPTY: &str = "isEmpty";
    /// Non-blank cell.
    pub const IS_NOT_EMPTY: &str = "isNotEmpty";
    /// Membership in a comma-separated list.
    pub const IS_ANY_OF: &str = "isAnyOf";

    /// Legacy spellings still found in stored query strings, mapped to canonical tags.
    pub const LEGACY_ALIASES: &[(&str, &str)] = &[
        ("does not contains", DOES_NOT_CONTAIN),
        ("doesNotContains", DOES_NOT_CONTAIN),
        ("does not contain", DOES_NOT_CONTAIN),
        ("does not equal", DOES_NOT_EQUAL),
        ("starts with", STARTS_WITH),
        ("ends with", ENDS_WITH),
        ("greaterThan", GREATER_THAN),
        ("lessThan", LESS_THAN),
        ("is empty", IS_EMPTY),
        ("is not empty", IS_NOT_EMPTY),
        ("is any of", IS_ANY_OF),
    ];

    /// Separator between items of an `isAnyOf` value list.
    pub const ANY_OF_SEPARATOR: char = ',';
}

/// Constants used by schema discovery and flattening.
pub mod schema {
    /// Width given to every discovered dynamic column.
    pub const DEFAULT_DYNAMIC_WIDTH: u32 = 180;
    /// Separator between a group tag and a field name in dynamic column titles.
    pub const DYNAMIC_TITLE_SEPARATOR: &str = ": ";
    /// Separator used when a base column falls back to joined fields.
    pub const JOIN_SEPARATOR: &str = " ";

    /// Default group name for account-level dynamic fields.
    pub const GROUP_ACCOUNT: &str = "account";
    /// Default group name for opportunity-level dynamic fields.
    pub const GROUP_OPPORTUNITY: &str = "opportunity";
    /// Default group name for the record's own (quote-level) dynamic fields.
    pub const GROUP_QUOTE: &str = "quote";
}

/// Constants used by the pagination engine.
pub mod pagination {
    /// Smallest accepted page index and page size.
    pub const MIN_PAGE: usize = 1;
    /// Page size used when a caller has not chosen one.
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    /// Page sizes offered to callers.
    pub const PAGE_SIZE_OPTIONS: [usize; 3] = [10, 20, 50];
}

/// Status codes carried by source and download responses.
pub mod status {
    /// Request succeeded.
    pub const OK: u16 = 200;
    /// Export accepted but not ready yet.
    pub const ACCEPTED: u16 = 202;
    /// Token was never issued or already consumed.
    pub const NOT_FOUND: u16 = 404;
    /// Export rendering failed.
    pub const INTERNAL_ERROR: u16 = 500;
}

/// Constants used by the export workflow.
pub mod download {
    /// Prefix carried by every issued token.
    pub const TOKEN_PREFIX: &str = "tok_";
    /// Number of random characters following the prefix.
    pub const TOKEN_RANDOM_LEN: usize = 7;
    /// Alphabet used for the random part of a token.
    pub const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    /// Prefix of rendered artifact URLs.
    pub const CSV_DATA_URL_PREFIX: &str = "data:text/csv;charset=utf-8,";
    /// Minimum simulated render delay in milliseconds.
    pub const DEFAULT_READY_DELAY_MIN_MS: u64 = 2_000;
    /// Maximum simulated render delay in milliseconds.
    pub const DEFAULT_READY_DELAY_MAX_MS: u64 = 5_000;
    /// Time a job may live in the store before eviction, in seconds.
    pub const DEFAULT_JOB_TTL_SECS: u64 = 600;
    /// Upper bound on rows rendered into one export.
    pub const DEFAULT_MAX_EXPORT_ROWS: usize = 100_000;
    /// Polling cadence used by callers waiting on an export, in milliseconds.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
    /// Polling attempts before a caller gives up.
    pub const DEFAULT_POLL_MAX_ATTEMPTS: usize = 120;
    /// Longest single sleep slice while polling, so cancellation is observed promptly.
    pub const POLL_SLEEP_SLICE_MS: u64 = 20;
}

/// Constants used by the bundled sample dataset.
pub mod sample {
    /// Source id used by the sample in-memory source.
    pub const SAMPLE_SOURCE_ID: &str = "sample_records";
    /// Number of rows in the default sample dataset.
    pub const SAMPLE_RECORD_COUNT: usize = 200;
    /// Cities cycled through by sample records.
    pub const CITIES: [&str; 6] = [
        "Winterfell",
        "Casterly Rock",
        "Kings Landing",
        "Dragonstone",
        "Highgarden",
        "Riverrun",
    ];
    /// First names cycled through by sample records.
    pub const FIRST_NAMES: [&str; 8] = [
        "Jon", "Cersei", "Jaime", "Arya", "Daenerys", "Tyrion", "Sansa", "Bran",
    ];
    /// Last names cycled through by sample records.
    pub const LAST_NAMES: [&str; 7] = [
        "Snow",
        "Lannister",
        "Stark",
        "Targaryen",
        "Baratheon",
        "Tyrell",
        "Tully",
    ];
}
