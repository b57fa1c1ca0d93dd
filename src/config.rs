use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;

use crate::constants::download::{
    DEFAULT_JOB_TTL_SECS, DEFAULT_MAX_EXPORT_ROWS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_READY_DELAY_MAX_MS, DEFAULT_READY_DELAY_MIN_MS,
};
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MIN_PAGE, PAGE_SIZE_OPTIONS};
use crate::constants::schema::{
    DEFAULT_DYNAMIC_WIDTH, GROUP_ACCOUNT, GROUP_OPPORTUNITY, GROUP_QUOTE,
};
use crate::errors::GridError;

/// Value used for a base column when a record does not carry the field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseFallback {
    /// Empty string.
    Empty,
    /// 1-based position of the row in the filtered result.
    Ordinal,
    /// The listed fields joined by a single space (missing parts become `""`).
    Join(Vec<Cow<'static, str>>),
}

/// A fixed column defined once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseColumn {
    /// Record field name and column key.
    pub key: Cow<'static, str>,
    /// Display title.
    pub title: Cow<'static, str>,
    /// Default width in pixels.
    pub width: u32,
    /// Fallback used when a record lacks the field.
    pub fallback: BaseFallback,
}

impl BaseColumn {
    /// Build a base column that falls back to an empty string.
    pub fn new(key: &'static str, title: &'static str, width: u32) -> Self {
        Self {
            key: Cow::Borrowed(key),
            title: Cow::Borrowed(title),
            width,
            fallback: BaseFallback::Empty,
        }
    }

    /// Replace the fallback used for missing values.
    pub fn with_fallback(mut self, fallback: BaseFallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// A known dynamic field group and the short tag prefixed to its column titles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpec {
    /// Group name as it appears on records.
    pub name: Cow<'static, str>,
    /// Short tag used to disambiguate column origin (e.g. `A`).
    pub tag: Cow<'static, str>,
}

impl GroupSpec {
    /// Build a group spec from static strings.
    pub const fn new(name: &'static str, tag: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            tag: Cow::Borrowed(tag),
        }
    }
}

/// Column model configuration: fixed base columns plus the closed set of dynamic groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Base columns in display order.
    pub base_columns: Vec<BaseColumn>,
    /// Dynamic groups in priority order.
    pub groups: Vec<GroupSpec>,
    /// Width assigned to discovered dynamic columns.
    pub dynamic_width: u32,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            base_columns: vec![
                BaseColumn::new("id", "ID", 70).with_fallback(BaseFallback::Ordinal),
                BaseColumn::new("firstName", "First name", 160),
                BaseColumn::new("lastName", "Last name", 160),
                BaseColumn::new("age", "Age", 90),
                BaseColumn::new("fullName", "Full name", 220).with_fallback(BaseFallback::Join(
                    vec![Cow::Borrowed("firstName"), Cow::Borrowed("lastName")],
                )),
                BaseColumn::new("city", "City", 180),
            ],
            groups: vec![
                GroupSpec::new(GROUP_ACCOUNT, "A"),
                GroupSpec::new(GROUP_OPPORTUNITY, "O"),
                GroupSpec::new(GROUP_QUOTE, "Q"),
            ],
            dynamic_width: DEFAULT_DYNAMIC_WIDTH,
        }
    }
}

impl SchemaConfig {
    /// Reject configurations that would produce an ambiguous column model.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.base_columns.is_empty() {
            return Err(GridError::Configuration(
                "schema needs at least one base column".to_string(),
            ));
        }
        let mut keys = HashSet::new();
        for column in &self.base_columns {
            if column.key.is_empty() {
                return Err(GridError::Configuration(
                    "base column keys must not be empty".to_string(),
                ));
            }
            if !keys.insert(column.key.as_ref()) {
                return Err(GridError::Configuration(format!(
                    "duplicate base column key '{}'",
                    column.key
                )));
            }
        }
        let mut names = HashSet::new();
        let mut tags = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_ref()) {
                return Err(GridError::Configuration(format!(
                    "duplicate group name '{}'",
                    group.name
                )));
            }
            if !tags.insert(group.tag.as_ref()) {
                return Err(GridError::Configuration(format!(
                    "duplicate group tag '{}'",
                    group.tag
                )));
            }
        }
        Ok(())
    }
}

/// Export job timing and size limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Lower bound of the delay before a job becomes ready.
    pub ready_delay_min: Duration,
    /// Upper bound of the delay before a job becomes ready.
    pub ready_delay_max: Duration,
    /// Jobs older than this are evicted whether or not they were retrieved.
    pub ttl: Duration,
    /// Maximum number of rows rendered into one export.
    pub max_export_rows: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            ready_delay_min: Duration::from_millis(DEFAULT_READY_DELAY_MIN_MS),
            ready_delay_max: Duration::from_millis(DEFAULT_READY_DELAY_MAX_MS),
            ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            max_export_rows: DEFAULT_MAX_EXPORT_ROWS,
        }
    }
}

/// Bounds for a caller waiting on an export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status checks.
    pub interval: Duration,
    /// Give up after this many checks.
    pub max_attempts: usize,
    /// Optional wall-clock budget for the whole wait.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            deadline: None,
        }
    }
}

/// Top-level grid configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    /// Column model configuration.
    pub schema: SchemaConfig,
    /// Page size used by new sessions.
    pub default_page_size: usize,
    /// Page sizes offered to callers. Empty accepts any positive size.
    pub page_size_options: Vec<usize>,
    /// Export job settings.
    pub download: DownloadConfig,
    /// Default polling bounds for export waits.
    pub poll: PollPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            schema: SchemaConfig::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: PAGE_SIZE_OPTIONS.to_vec(),
            download: DownloadConfig::default(),
            poll: PollPolicy::default(),
        }
    }
}

impl GridConfig {
    /// Returns `true` when `page_size` is one of the offered page sizes.
    pub fn offers_page_size(&self, page_size: usize) -> bool {
        page_size >= MIN_PAGE
            && (self.page_size_options.is_empty() || self.page_size_options.contains(&page_size))
    }

    /// Validate nested settings.
    pub fn validate(&self) -> Result<(), GridError> {
        self.schema.validate()?;
        if self.default_page_size < MIN_PAGE {
            return Err(GridError::Configuration(
                "default page size must be at least 1".to_string(),
            ));
        }
        if !self.offers_page_size(self.default_page_size) {
            return Err(GridError::Configuration(format!(
                "default page size {} is not among the offered sizes {:?}",
                self.default_page_size, self.page_size_options
            )));
        }
        if self.download.ready_delay_min > self.download.ready_delay_max {
            return Err(GridError::Configuration(
                "download ready delay minimum exceeds maximum".to_string(),
            ));
        }
        if self.poll.max_attempts == 0 {
            return Err(GridError::Configuration(
                "poll policy needs at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GridConfig::default().validate().unwrap();
        assert_eq!(SchemaConfig::default().base_columns.len(), 6);
    }

    #[test]
    fn duplicate_base_keys_are_rejected() {
        let mut schema = SchemaConfig::default();
        schema.base_columns.push(BaseColumn::new("city", "Town", 100));
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, GridError::Configuration(msg) if msg.contains("city")));
    }

    #[test]
    fn duplicate_group_tags_are_rejected() {
        let schema = SchemaConfig {
            groups: vec![GroupSpec::new("account", "A"), GroupSpec::new("agent", "A")],
            ..SchemaConfig::default()
        };
        assert!(schema.validate().is_err());
    }

    #[test]
    fn page_sizes_must_be_offered() {
        let config = GridConfig::default();
        assert!(config.offers_page_size(20));
        assert!(!config.offers_page_size(25));
        assert!(!config.offers_page_size(0));

        let odd_default = GridConfig {
            default_page_size: 25,
            ..GridConfig::default()
        };
        let err = odd_default.validate().unwrap_err();
        assert!(matches!(err, GridError::Configuration(msg) if msg.contains("25")));

        let open = GridConfig {
            default_page_size: 25,
            page_size_options: Vec::new(),
            ..GridConfig::default()
        };
        open.validate().unwrap();
        assert!(open.offers_page_size(7));
    }

    #[test]
    fn inverted_download_delays_are_rejected() {
        let config = GridConfig {
            download: DownloadConfig {
                ready_delay_min: Duration::from_secs(5),
                ready_delay_max: Duration::from_secs(1),
                ..DownloadConfig::default()
            },
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
