// src/config/options.rs
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::consts::*;
use crate::core::{combo, range::RangeDescriptor};
use crate::error::ConfigError;

/// Everything the CLI reads from a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppOptions {
    #[serde(default)]
    pub crawl: CrawlOptions,
    pub source: SourceOptions,
    #[serde(default)]
    pub output: OutputOptions,
}

impl AppOptions {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let opts: AppOptions = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        opts.crawl.validate()?;
        opts.source.validate()?;
        Ok(opts)
    }
}

/* ---------------- Crawl ---------------- */

/// Inclusive bounds for a randomized pause, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayBounds {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayBounds {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Primary crawler pacing.
    pub const fn primary() -> Self {
        Self::new(PRIMARY_DELAY_MS.0, PRIMARY_DELAY_MS.1)
    }

    /// Lighter secondary crawlers.
    pub const fn light() -> Self {
        Self::new(LIGHT_DELAY_MS.0, LIGHT_DELAY_MS.1)
    }

    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvertedDelay {
                field,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self::primary()
    }
}

/// One auxiliary filter dimension (e.g. tasks, qualities, skills).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub values: Vec<String>,
}

impl Dimension {
    pub fn new<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: s!(name),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    /// Max results the source serves for one query.
    pub cap: u64,
    pub page_size: u32,
    pub initial_range: RangeDescriptor,
    pub dimensions: Vec<Dimension>,
    pub worker_count: usize,
    pub probe_delay: DelayBounds,
    pub page_delay: DelayBounds,
    pub max_pages_per_range: u32,
    pub degenerate_threshold: usize,
    pub request_timeout_secs: u64,
    pub max_vocabulary: usize,
    /// Upper bound on the attribute combos one oversized point may expand to.
    pub max_combos: u64,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            cap: CAP,
            page_size: PAGE_SIZE,
            initial_range: RangeDescriptor::from_ordered(DEFAULT_LOWER, DEFAULT_UPPER),
            dimensions: Vec::new(),
            worker_count: WORKERS,
            probe_delay: DelayBounds::primary(),
            page_delay: DelayBounds::primary(),
            max_pages_per_range: MAX_PAGES_PER_RANGE,
            degenerate_threshold: DEGENERATE_THRESHOLD,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            max_vocabulary: MAX_VOCABULARY,
            max_combos: MAX_COMBOS,
        }
    }
}

impl CrawlOptions {
    /// Same defaults, lighter pacing.
    pub fn light() -> Self {
        Self {
            probe_delay: DelayBounds::light(),
            page_delay: DelayBounds::light(),
            ..Self::default()
        }
    }

    /// Reject configurations the crawler cannot run safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap == 0 {
            return Err(ConfigError::Zero { field: "cap" });
        }
        if self.page_size == 0 {
            return Err(ConfigError::Zero { field: "page_size" });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Zero { field: "worker_count" });
        }
        if self.max_pages_per_range == 0 {
            return Err(ConfigError::Zero { field: "max_pages_per_range" });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero { field: "request_timeout_secs" });
        }
        if self.max_vocabulary > VOCABULARY_CEILING {
            return Err(ConfigError::TooHigh {
                field: "max_vocabulary",
                value: self.max_vocabulary as u64,
                max: VOCABULARY_CEILING as u64,
            });
        }
        self.probe_delay.check("probe_delay")?;
        self.page_delay.check("page_delay")?;
        RangeDescriptor::new(self.initial_range.lower(), self.initial_range.upper())?;

        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if !seen.insert(dim.name.as_str()) {
                return Err(ConfigError::DuplicateDimension(dim.name.clone()));
            }
            if dim.values.is_empty() {
                return Err(ConfigError::EmptyDimension(dim.name.clone()));
            }
            if dim.values.len() > self.max_vocabulary {
                return Err(ConfigError::VocabularyTooLarge {
                    name: dim.name.clone(),
                    size: dim.values.len(),
                    max: self.max_vocabulary,
                });
            }
        }

        let count = combo::count(&self.vocabularies());
        if count > u128::from(self.max_combos) {
            return Err(ConfigError::TooManyCombos { count, max: self.max_combos });
        }
        Ok(())
    }

    /// Dimension vocabularies in declaration order.
    pub fn vocabularies(&self) -> Vec<Vec<String>> {
        self.dimensions.iter().map(|d| d.values.clone()).collect()
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }
}

/* ---------------- Source ---------------- */

/// How to talk to a GraphQL listing endpoint and where its answers live.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub endpoint: String,
    /// Inline query text; wins over `query_file`.
    pub query: Option<String>,
    pub query_file: Option<PathBuf>,
    pub headers: BTreeMap<String, String>,

    /// `data.<key>` is picked by prefix since vendors suffix it per search type.
    pub result_prefix: String,
    pub records_field: String,
    /// Dotted path into each record, e.g. `member.id`.
    pub id_field: String,

    pub range_variable: String,
    pub page_size_variable: String,
    pub cursor_variable: String,
    pub sort_variable: String,
    pub sort_default: Option<String>,
    pub sort_alternate: Option<String>,

    /// Merged into every request's variables (zip code, service type, ...).
    pub extra_variables: Value,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            endpoint: s!(),
            query: None,
            query_file: None,
            headers: BTreeMap::new(),
            result_prefix: s!(RESULT_PREFIX),
            records_field: s!(RECORDS_FIELD),
            id_field: s!(ID_FIELD),
            range_variable: s!("payRange"),
            page_size_variable: s!("pageSize"),
            cursor_variable: s!("after"),
            sort_variable: s!("sortBy"),
            sort_default: None,
            sort_alternate: Some(s!("DISTANCE_ASC")),
            extra_variables: Value::Object(Default::default()),
        }
    }
}

impl SourceOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Source(s!("`endpoint` is required")));
        }
        if self.query.is_none() && self.query_file.is_none() {
            return Err(ConfigError::Source(s!("one of `query` or `query_file` is required")));
        }
        if self.result_prefix.is_empty() || self.id_field.is_empty() {
            return Err(ConfigError::Source(s!("`result_prefix` and `id_field` must not be empty")));
        }
        if !(self.extra_variables.is_object() || self.extra_variables.is_null()) {
            return Err(ConfigError::Source(s!("`extra_variables` must be an object")));
        }
        Ok(())
    }

    /// Resolve the query text, reading `query_file` if needed.
    pub fn query_text(&self) -> Result<String, ConfigError> {
        if let Some(q) = &self.query {
            return Ok(q.clone());
        }
        match &self.query_file {
            Some(path) => fs::read_to_string(path).map_err(|source| ConfigError::Load {
                path: path.clone(),
                source,
            }),
            None => Err(ConfigError::Source(s!("no query configured"))),
        }
    }
}

/* ---------------- Output ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub out_dir: PathBuf,
    /// Subdirectory for this run; generated from the clock when absent.
    pub run_name: Option<String>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            run_name: None,
        }
    }
}
