// src/crawl/oracle.rs
use crate::config::consts::{PROBE_PAGE_SIZE, UNKNOWN_HITS};
use crate::core::{AttributeCombo, Pacer, RangeDescriptor};
use crate::source::{QueryRequest, SortOrder, Source};

/// Result of a count probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Count(u64),
    /// The probe failed. Treated as oversized, never as empty.
    Unknown,
}

impl Probe {
    /// Hit count, with [`UNKNOWN_HITS`] standing in for a failed probe.
    pub fn hits(self) -> u64 {
        match self {
            Probe::Count(n) => n,
            Probe::Unknown => UNKNOWN_HITS,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Probe::Unknown)
    }
}

/// Asks the source how many records a filter matches, one page-size-1 query at a time.
pub struct Oracle<'a> {
    source: &'a dyn Source,
    pacer: Pacer,
}

impl<'a> Oracle<'a> {
    pub fn new(source: &'a dyn Source, pacer: Pacer) -> Self {
        Self { source, pacer }
    }

    /// Never fails: any error comes back as [`Probe::Unknown`].
    /// Pauses after the call whether it succeeded or not.
    pub fn probe(&self, range: RangeDescriptor, combo: Option<&AttributeCombo>) -> Probe {
        let req = QueryRequest {
            range,
            combo,
            page_size: PROBE_PAGE_SIZE,
            cursor: None,
            sort: SortOrder::Default,
        };
        let result = self.source.query(&req);
        self.pacer.pause();

        match result {
            Ok(page) => {
                logd!(%range, hits = page.total_hits, "probe");
                Probe::Count(page.total_hits)
            }
            Err(e) => {
                logw!(%range, error = %e, "probe failed, assuming oversized");
                Probe::Unknown
            }
        }
    }
}
