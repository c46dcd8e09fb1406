// src/source/memory.rs
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use super::{QueryPage, QueryRequest, Record, RecordId, SortOrder, Source};
use crate::error::SourceError;

/// One listing held by [`MemorySource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub id: RecordId,
    pub value: i64,
    /// One attribute list per filter dimension.
    pub attributes: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(id: impl Into<RecordId>, value: i64) -> Self {
        Self { id: id.into(), value, attributes: Vec::new() }
    }

    pub fn with_attributes(mut self, attributes: Vec<Vec<String>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// A combo subset filters by "has every value listed".
    fn matches(&self, req: &QueryRequest<'_>) -> bool {
        if !req.range.contains(self.value) {
            return false;
        }
        let Some(combo) = req.combo else { return true };
        combo.subsets().iter().enumerate().all(|(dim, subset)| {
            let have = self.attributes.get(dim).map(Vec::as_slice).unwrap_or(&[]);
            subset.iter().all(|want| have.contains(want))
        })
    }
}

/// In-memory listing source that behaves like a capped search API:
/// `total_hits` is the true match count, but pagination stops after `cap`
/// results. Cursors are decimal offsets.
#[derive(Debug)]
pub struct MemorySource {
    listings: Vec<Listing>,
    cap: u64,
    queries: AtomicU64,
}

impl MemorySource {
    pub fn new(mut listings: Vec<Listing>, cap: u64) -> Self {
        listings.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id)));
        Self { listings, cap, queries: AtomicU64::new(0) }
    }

    /// Number of `query` calls served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl Source for MemorySource {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let mut hits: Vec<&Listing> = self.listings.iter().filter(|l| l.matches(req)).collect();
        if req.sort == SortOrder::Alternate {
            hits.reverse();
        }
        let total_hits = hits.len() as u64;
        let reachable = hits.len().min(self.cap as usize);

        let offset = match req.cursor {
            None => 0,
            Some(c) => c.parse::<usize>()
                .map_err(|_| SourceError::Malformed(format!("unknown cursor `{c}`")))?,
        };
        let start = offset.min(reachable);
        let end = (start + req.page_size as usize).min(reachable);

        let records = hits[start..end].iter()
            .map(|l| Record::new(l.id.clone(), json!({
                "id": l.id,
                "value": l.value,
                "attributes": l.attributes,
            })))
            .collect();

        Ok(QueryPage {
            total_hits,
            records,
            has_next_page: end < reachable,
            end_cursor: Some(end.to_string()),
        })
    }
}
