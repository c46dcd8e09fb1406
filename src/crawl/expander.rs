// src/crawl/expander.rs
//! Attribute-subset expansion for a single value that still exceeds the cap.
//!
//! Bisection cannot narrow a point range, so the point is partitioned along
//! the attribute dimensions instead: every combination of non-empty subsets
//! (plus the unfiltered combo) is paginated and the record ids are unioned.
//!
//! With a page sink attached, every combo page is persisted as well, so the
//! records behind the id union are kept.
//!
//! This is best-effort. A combo that is itself over the cap is re-read once
//! with the alternate sort order, which surfaces a different slice of the
//! same capped set; nothing guarantees the union ends up complete.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use std::thread;

use serde::Serialize;

use super::fetcher::Fetcher;
use crate::core::{combo, lock, AttributeCombo, Pacer, RangeDescriptor};
use crate::error::SourceError;
use crate::source::{RecordId, SortOrder, Source};
use crate::store::PageSink;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandResult {
    pub ids: HashSet<RecordId>,
    /// Combos whose fetch was started.
    pub attempted: usize,
    /// Combos skipped because the union already reached the expected count.
    pub skipped: usize,
    /// Combos whose fetch failed; they contribute nothing.
    pub failed: usize,
    /// Combos re-read with the alternate sort order.
    pub resorted: usize,
}

impl ExpandResult {
    pub fn summary(&self) -> ExpandSummary {
        ExpandSummary {
            ids: self.ids.len(),
            attempted: self.attempted,
            skipped: self.skipped,
            failed: self.failed,
            resorted: self.resorted,
        }
    }
}

/// Counts only, for reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExpandSummary {
    pub ids: usize,
    pub attempted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub resorted: usize,
}

pub struct Expander<'a> {
    source: &'a dyn Source,
    pages: Option<&'a dyn PageSink>,
    pacer: Pacer,
    page_size: u32,
    max_pages: u32,
    workers: usize,
    degenerate_threshold: usize,
}

impl<'a> Expander<'a> {
    pub fn new(
        source: &'a dyn Source,
        pacer: Pacer,
        page_size: u32,
        max_pages: u32,
        workers: usize,
        degenerate_threshold: usize,
    ) -> Self {
        Self {
            source,
            pages: None,
            pacer,
            page_size,
            max_pages,
            workers: workers.max(1),
            degenerate_threshold,
        }
    }

    /// Persist each combo page to `sink` while collecting ids.
    pub fn with_pages(mut self, sink: &'a dyn PageSink) -> Self {
        self.pages = Some(sink);
        self
    }

    /// Union of record ids across every combo for `point`.
    ///
    /// Each worker pauses after every request it sends, so `workers` bounds
    /// the request rate at roughly `workers / delay`.
    ///
    /// `expected` is the unfiltered hit count; once the union reaches it the
    /// remaining combos are skipped. `None` disables the early exit.
    pub fn expand(
        &self,
        point: RangeDescriptor,
        dimensions: &[Vec<String>],
        expected: Option<u64>,
    ) -> ExpandResult {
        if !point.is_point() {
            loge!(%point, "expand called on a splittable range");
            return ExpandResult::default();
        }

        let combos = combo::enumerate(dimensions);
        let workers = self.workers.min(combos.len()).max(1);
        logf!(%point, combos = combos.len(), workers, ?expected, "expanding oversized point");

        let next = AtomicUsize::new(0);
        let shared = Mutex::new(ExpandResult::default());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    let fetcher = Fetcher::new(self.source, self.pacer, self.page_size, self.max_pages);
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(combo) = combos.get(i) else { break };
                        self.run_combo(&fetcher, point, combo, expected, &shared);
                    }
                });
            }
        });

        let result = shared.into_inner().unwrap_or_else(|e| e.into_inner());
        logf!(
            %point,
            ids = result.ids.len(),
            attempted = result.attempted,
            skipped = result.skipped,
            failed = result.failed,
            resorted = result.resorted,
            "expansion done"
        );
        result
    }

    fn run_combo(
        &self,
        fetcher: &Fetcher<'_>,
        point: RangeDescriptor,
        combo: &AttributeCombo,
        expected: Option<u64>,
        shared: &Mutex<ExpandResult>,
    ) {
        {
            let mut state = lock(shared);
            if let Some(expected) = expected {
                if state.ids.len() as u64 >= expected {
                    state.skipped += 1;
                    return;
                }
            }
            state.attempted += 1;
        }

        let ids = match self.read(fetcher, point, combo, SortOrder::Default) {
            Ok(ids) => ids,
            Err(e) => {
                logw!(%point, %combo, error = %e, "combo fetch failed, skipping");
                lock(shared).failed += 1;
                return;
            }
        };

        let degenerate = ids.len() > self.degenerate_threshold;
        lock(shared).ids.extend(ids);

        if !degenerate {
            return;
        }
        logw!(%point, %combo, "combo still over the cap, re-reading with alternate sort");
        match self.read(fetcher, point, combo, SortOrder::Alternate) {
            Ok(more) => {
                let mut state = lock(shared);
                state.ids.extend(more);
                state.resorted += 1;
            }
            Err(e) => logw!(%point, %combo, error = %e, "alternate sort fetch failed"),
        }
    }
}

impl Expander<'_> {
    fn read(
        &self,
        fetcher: &Fetcher<'_>,
        point: RangeDescriptor,
        combo: &AttributeCombo,
        sort: SortOrder,
    ) -> Result<Vec<RecordId>, SourceError> {
        match self.pages {
            Some(sink) => fetcher.collect_and_store(point, Some(combo), sort, sink),
            None => fetcher.collect_ids(point, Some(combo), sort),
        }
    }
}
