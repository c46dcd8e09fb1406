// src/crawl/scheduler.rs
use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

use super::expander::{ExpandSummary, Expander};
use super::fetcher::{FetchOutcome, FetchStatus, Fetcher};
use super::oracle::{Oracle, Probe};
use crate::config::CrawlOptions;
use crate::core::{Pacer, RangeDescriptor};
use crate::progress::Progress;
use crate::source::Source;
use crate::store::{OutcomeSink, OutcomeStatus, PageSink, RangeOutcome};

/// Terminal state of one range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeState {
    Empty,
    Dispatched,
    Split,
    OversizedPoint,
}

/// What to do with a probed range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Empty,
    Dispatch,
    Split(RangeDescriptor, RangeDescriptor),
    Expand,
}

impl Decision {
    pub fn state(&self) -> RangeState {
        match self {
            Decision::Empty => RangeState::Empty,
            Decision::Dispatch => RangeState::Dispatched,
            Decision::Split(..) => RangeState::Split,
            Decision::Expand => RangeState::OversizedPoint,
        }
    }
}

/// `0` drops, `<= cap` fetches, `> cap` splits, and a point over the cap expands.
/// An unknown count is over the cap whatever the cap is.
pub fn decide(range: RangeDescriptor, probe: Probe, cap: u64) -> Decision {
    match probe {
        Probe::Count(0) => return Decision::Empty,
        Probe::Count(hits) if hits <= cap => return Decision::Dispatch,
        Probe::Count(_) | Probe::Unknown => {}
    }
    match range.bisect() {
        Some((left, right)) => Decision::Split(left, right),
        None => Decision::Expand,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitRecord {
    pub parent: RangeDescriptor,
    pub hits: u64,
    /// The probe failed; the split is conservative.
    pub unknown: bool,
    pub left: RangeDescriptor,
    pub right: RangeDescriptor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub range: RangeDescriptor,
    pub hits: u64,
    pub outcome: FetchOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExpansionRecord {
    pub point: RangeDescriptor,
    pub hits: u64,
    pub unknown: bool,
    pub summary: ExpandSummary,
}

/// Bookkeeping for one run: enough to rebuild which ranges were split,
/// dropped, fetched or expanded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub initial: Option<RangeDescriptor>,
    pub cap: u64,
    pub probes: u64,
    pub empty: Vec<RangeDescriptor>,
    pub splits: Vec<SplitRecord>,
    pub dispatched: Vec<DispatchRecord>,
    pub expanded: Vec<ExpansionRecord>,
    pub pages: u64,
    pub records: u64,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Dispatched ranges that did not fetch cleanly.
    pub fn failed(&self) -> impl Iterator<Item = &DispatchRecord> {
        self.dispatched.iter().filter(|d| !d.outcome.is_complete())
    }

    /// No failures and no best-effort expansions.
    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none() && self.expanded.is_empty()
    }

    /// Every terminal range (empty, dispatched, expanded), sorted.
    pub fn leaves(&self) -> Vec<RangeDescriptor> {
        let mut out: Vec<RangeDescriptor> = self.empty.iter().copied()
            .chain(self.dispatched.iter().map(|d| d.range))
            .chain(self.expanded.iter().map(|e| e.point))
            .collect();
        out.sort();
        out
    }
}

/// Partition scheduler: single-threaded FIFO over ranges.
pub struct Scheduler<'a> {
    source: &'a dyn Source,
    pages: &'a dyn PageSink,
    outcomes: &'a dyn OutcomeSink,
    opts: &'a CrawlOptions,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        source: &'a dyn Source,
        pages: &'a dyn PageSink,
        outcomes: &'a dyn OutcomeSink,
        opts: &'a CrawlOptions,
    ) -> Self {
        Self { source, pages, outcomes, opts }
    }

    /// Run from the configured range and cap.
    pub fn run_configured(&self, progress: Option<&mut dyn Progress>) -> RunReport {
        self.run(self.opts.initial_range, self.opts.cap, progress)
    }

    /// Crawl `initial`, keeping every query under `cap`.
    ///
    /// Never fails. Probe errors turn into splits; a failed fetch is recorded
    /// for its range and the queue moves on.
    pub fn run(
        &self,
        initial: RangeDescriptor,
        cap: u64,
        mut progress: Option<&mut dyn Progress>,
    ) -> RunReport {
        let started = Instant::now();
        let oracle = Oracle::new(self.source, Pacer::new(self.opts.probe_delay));
        let fetcher = Fetcher::new(
            self.source,
            Pacer::new(self.opts.page_delay),
            self.opts.page_size,
            self.opts.max_pages_per_range,
        );

        let mut report = RunReport { initial: Some(initial), cap, ..RunReport::default() };
        let mut queue = VecDeque::from([initial]);

        logf!(%initial, cap, "crawl: begin");
        if let Some(p) = progress.as_deref_mut() {
            p.begin(initial);
        }

        while let Some(range) = queue.pop_front() {
            let range_started = Instant::now();
            let probe = oracle.probe(range, None);
            report.probes += 1;
            let hits = probe.hits();
            let decision = decide(range, probe, cap);

            match decision {
                Decision::Empty => {
                    logd!(%range, "empty");
                    report.empty.push(range);
                    self.record(RangeOutcome {
                        range,
                        combo: None,
                        status: OutcomeStatus::Empty,
                        hits,
                        pages: 0,
                        records: 0,
                        elapsed_ms: range_started.elapsed().as_millis() as u64,
                        message: None,
                    });
                }
                Decision::Dispatch => {
                    let outcome = fetcher.fetch_all(range, None, self.pages);
                    self.finish_dispatch(range, hits, outcome, range_started, &mut report);
                }
                Decision::Split(left, right) => {
                    logd!(%range, hits, unknown = probe.is_unknown(), %left, %right, "split");
                    queue.push_back(left);
                    queue.push_back(right);
                    report.splits.push(SplitRecord {
                        parent: range,
                        hits,
                        unknown: probe.is_unknown(),
                        left,
                        right,
                    });
                }
                Decision::Expand => {
                    self.expand_point(range, probe, range_started, &mut report);
                    if let Some(p) = progress.as_deref_mut() {
                        p.log(&format!("{range} is over the cap on its own; attribute expansion may be incomplete"));
                    }
                }
            }

            if let Some(p) = progress.as_deref_mut() {
                p.range_done(range, decision.state(), hits);
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        logf!(
            probes = report.probes,
            splits = report.splits.len(),
            empty = report.empty.len(),
            dispatched = report.dispatched.len(),
            expanded = report.expanded.len(),
            failed = report.failed().count(),
            pages = report.pages,
            records = report.records,
            "crawl: done"
        );
        if let Some(p) = progress {
            p.finish(&report);
        }
        report
    }

    fn finish_dispatch(
        &self,
        range: RangeDescriptor,
        hits: u64,
        outcome: FetchOutcome,
        range_started: Instant,
        report: &mut RunReport,
    ) {
        let (status, message) = match &outcome.status {
            FetchStatus::Complete => (OutcomeStatus::Complete, None),
            FetchStatus::Truncated { max_pages } => {
                (OutcomeStatus::Truncated, Some(format!("stopped at {max_pages} pages")))
            }
            FetchStatus::Error { page_index, message } => {
                logw!(%range, page_index, "range failed, continuing with queue");
                (OutcomeStatus::Error, Some(format!("page {page_index}: {message}")))
            }
        };

        report.pages += outcome.pages_emitted as u64;
        report.records += outcome.record_count;
        self.record(RangeOutcome {
            range,
            combo: None,
            status,
            hits,
            pages: outcome.pages_emitted,
            records: outcome.record_count,
            elapsed_ms: range_started.elapsed().as_millis() as u64,
            message,
        });
        report.dispatched.push(DispatchRecord { range, hits, outcome });
    }

    fn expand_point(
        &self,
        point: RangeDescriptor,
        probe: Probe,
        range_started: Instant,
        report: &mut RunReport,
    ) {
        let hits = probe.hits();
        logw!(%point, hits, cap = report.cap, "single value exceeds the cap, expanding by attributes (best-effort)");

        let expander = Expander::new(
            self.source,
            Pacer::new(self.opts.page_delay),
            self.opts.page_size,
            self.opts.max_pages_per_range,
            self.opts.worker_count,
            self.opts.degenerate_threshold,
        )
        .with_pages(self.pages);
        let expected = match probe {
            Probe::Count(n) => Some(n),
            Probe::Unknown => None,
        };
        let result = expander.expand(point, &self.opts.vocabularies(), expected);
        let summary = result.summary();

        if let Err(e) = self.outcomes.record_expansion(point, &result.ids) {
            loge!(%point, error = %e, "store expanded ids failed");
        }
        self.record(RangeOutcome {
            range: point,
            combo: None,
            status: OutcomeStatus::Expanded,
            hits,
            pages: 0,
            records: summary.ids as u64,
            elapsed_ms: range_started.elapsed().as_millis() as u64,
            message: Some(format!(
                "best-effort: {} ids from {} combos ({} skipped, {} failed, {} resorted); may be incomplete",
                summary.ids, summary.attempted, summary.skipped, summary.failed, summary.resorted
            )),
        });
        report.records += summary.ids as u64;
        report.expanded.push(ExpansionRecord {
            point,
            hits,
            unknown: probe.is_unknown(),
            summary,
        });
    }

    fn record(&self, outcome: RangeOutcome) {
        if let Err(e) = self.outcomes.record_outcome(&outcome) {
            loge!(range = %outcome.range, error = %e, "record outcome failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::UNKNOWN_HITS;

    fn r(lo: i64, hi: i64) -> RangeDescriptor {
        RangeDescriptor::new(lo, hi).unwrap()
    }

    #[test]
    fn decide_branches() {
        use Probe::Count;
        assert_eq!(decide(r(0, 10), Count(0), 500), Decision::Empty);
        assert_eq!(decide(r(0, 10), Count(1), 500), Decision::Dispatch);
        assert_eq!(decide(r(0, 10), Count(500), 500), Decision::Dispatch);
        assert_eq!(decide(r(0, 10), Count(501), 500), Decision::Split(r(0, 5), r(6, 10)));
        assert_eq!(decide(r(5, 5), Count(501), 500), Decision::Expand);
        assert_eq!(decide(r(5, 5), Count(0), 500), Decision::Empty);
    }

    #[test]
    fn unknown_count_never_dispatches() {
        for cap in [500, UNKNOWN_HITS, UNKNOWN_HITS + 1, u64::MAX] {
            assert_eq!(decide(r(0, 10), Probe::Unknown, cap), Decision::Split(r(0, 5), r(6, 10)));
            assert_eq!(decide(r(3, 3), Probe::Unknown, cap), Decision::Expand);
        }
    }

    #[test]
    fn states_map() {
        assert_eq!(Decision::Expand.state(), RangeState::OversizedPoint);
        assert_eq!(Decision::Split(r(0, 0), r(1, 1)).state(), RangeState::Split);
    }
}
