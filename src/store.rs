// src/store.rs
//! Persistence boundary.
//!
//! The crawler calls [`PageSink::store_page`] once per fetched page and
//! [`OutcomeSink::record_outcome`] once per terminal range state. Neither call
//! may stop a crawl: callers log the error and carry on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;

use crate::config::consts::{EXPANDED_IDS_FILE, OUTCOMES_FILE, REPORT_FILE};
use crate::core::{lock, AttributeCombo, RangeDescriptor};
use crate::error::StoreError;
use crate::file;
use crate::source::{QueryPage, RecordId, SortOrder};

/// Identifies one fetched page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageKey<'a> {
    pub range: RangeDescriptor,
    pub combo: Option<&'a AttributeCombo>,
    /// Alternate-sort re-reads of a combo page separately from the default order.
    pub sort: SortOrder,
    pub page_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Probe reported zero hits.
    Empty,
    /// Every page fetched.
    Complete,
    /// Stopped at the page ceiling.
    Truncated,
    /// Pagination failed part way; partial pages were kept.
    Error,
    /// Single value over the cap; covered by attribute combos, possibly incompletely.
    Expanded,
}

/// What happened to one range, for observability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RangeOutcome {
    pub range: RangeDescriptor,
    pub combo: Option<AttributeCombo>,
    pub status: OutcomeStatus,
    pub hits: u64,
    pub pages: u32,
    pub records: u64,
    pub elapsed_ms: u64,
    pub message: Option<String>,
}

pub trait PageSink: Send + Sync {
    fn store_page(&self, key: &PageKey<'_>, page: &QueryPage) -> Result<(), StoreError>;
}

pub trait OutcomeSink: Send + Sync {
    fn record_outcome(&self, outcome: &RangeOutcome) -> Result<(), StoreError>;

    /// Identifier union for an oversized point.
    fn record_expansion(&self, _point: RangeDescriptor, _ids: &HashSet<RecordId>) -> Result<(), StoreError> {
        Ok(())
    }
}

/* ---------------- JSON data lake ---------------- */

/// Writes a run into a directory tree:
///
/// ```text
/// <root>/<run>/outcomes.jsonl
/// <root>/<run>/report.json
/// <root>/<run>/range_<lo>_<hi>/page_0000.json
/// <root>/<run>/range_<lo>_<hi>/combo_<...>/page_0000.json
/// <root>/<run>/range_<v>_<v>/expanded_ids.json
/// ```
#[derive(Debug)]
pub struct LakeSink {
    run_dir: PathBuf,
    outcomes: Mutex<()>,
}

impl LakeSink {
    pub fn create(root: &Path, run_name: &str) -> Result<Self, StoreError> {
        let run_dir = file::run_dir(root, run_name);
        file::ensure_directory(&run_dir)?;
        Ok(Self { run_dir, outcomes: Mutex::new(()) })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn range_dir(&self, range: RangeDescriptor) -> PathBuf {
        self.run_dir.join(file::range_dir_name(range))
    }

    pub fn page_path(&self, key: &PageKey<'_>) -> PathBuf {
        let mut dir = self.range_dir(key.range);
        if let Some(combo) = key.combo {
            dir.push(file::combo_dir_name(combo));
        }
        let name = file::page_file_name(key.page_index);
        match key.sort {
            SortOrder::Default => dir.join(name),
            SortOrder::Alternate => dir.join(join!("alt_", &name)),
        }
    }

    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, StoreError> {
        let path = self.run_dir.join(REPORT_FILE);
        file::write_json(&path, report)?;
        Ok(path)
    }
}

impl PageSink for LakeSink {
    fn store_page(&self, key: &PageKey<'_>, page: &QueryPage) -> Result<(), StoreError> {
        let payloads: Vec<_> = page.records.iter().map(|r| &r.payload).collect();
        let doc = json!({
            "range": key.range,
            "combo": key.combo,
            "sort": key.sort,
            "page_index": key.page_index,
            "total_hits": page.total_hits,
            "has_next_page": page.has_next_page,
            "end_cursor": page.end_cursor,
            "records": payloads,
        });
        file::write_json(&self.page_path(key), &doc)
    }
}

impl OutcomeSink for LakeSink {
    fn record_outcome(&self, outcome: &RangeOutcome) -> Result<(), StoreError> {
        let _guard = lock(&self.outcomes);
        file::append_json_line(&self.run_dir.join(OUTCOMES_FILE), outcome)
    }

    fn record_expansion(&self, point: RangeDescriptor, ids: &HashSet<RecordId>) -> Result<(), StoreError> {
        let mut sorted: Vec<&RecordId> = ids.iter().collect();
        sorted.sort();
        let doc = json!({
            "range": point,
            "count": sorted.len(),
            "complete": false,
            "ids": sorted,
        });
        file::write_json(&self.range_dir(point).join(EXPANDED_IDS_FILE), &doc)
    }
}

/* ---------------- In-memory ---------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredPage {
    pub range: RangeDescriptor,
    pub combo: Option<AttributeCombo>,
    pub sort: SortOrder,
    pub page_index: u32,
    pub record_ids: Vec<RecordId>,
}

/// Thread-safe sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pages: Mutex<Vec<StoredPage>>,
    outcomes: Mutex<Vec<RangeOutcome>>,
    expansions: Mutex<Vec<(RangeDescriptor, Vec<RecordId>)>>,
    reject_pages: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `store_page` call fails.
    pub fn rejecting_pages() -> Self {
        Self { reject_pages: true, ..Self::default() }
    }

    pub fn pages(&self) -> Vec<StoredPage> {
        lock(&self.pages).clone()
    }

    pub fn outcomes(&self) -> Vec<RangeOutcome> {
        lock(&self.outcomes).clone()
    }

    pub fn expansions(&self) -> Vec<(RangeDescriptor, Vec<RecordId>)> {
        lock(&self.expansions).clone()
    }
}

impl PageSink for MemorySink {
    fn store_page(&self, key: &PageKey<'_>, page: &QueryPage) -> Result<(), StoreError> {
        if self.reject_pages {
            return Err(StoreError::io("<memory>", std::io::Error::other("page store rejected")));
        }
        lock(&self.pages).push(StoredPage {
            range: key.range,
            combo: key.combo.cloned(),
            sort: key.sort,
            page_index: key.page_index,
            record_ids: page.records.iter().map(|r| r.id.clone()).collect(),
        });
        Ok(())
    }
}

impl OutcomeSink for MemorySink {
    fn record_outcome(&self, outcome: &RangeOutcome) -> Result<(), StoreError> {
        lock(&self.outcomes).push(outcome.clone());
        Ok(())
    }

    fn record_expansion(&self, point: RangeDescriptor, ids: &HashSet<RecordId>) -> Result<(), StoreError> {
        let mut sorted: Vec<RecordId> = ids.iter().cloned().collect();
        sorted.sort();
        lock(&self.expansions).push((point, sorted));
        Ok(())
    }
}
