// src/crawl/fetcher.rs
use serde::Serialize;

use crate::core::{AttributeCombo, Pacer, RangeDescriptor};
use crate::error::SourceError;
use crate::source::{QueryPage, QueryRequest, RecordId, SortOrder, Source};
use crate::store::{PageKey, PageSink};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Complete,
    /// Stopped at the page ceiling with pages still reported.
    Truncated { max_pages: u32 },
    /// Failed requesting page `page_index`; earlier pages were kept.
    Error { page_index: u32, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub pages_emitted: u32,
    pub record_count: u64,
    pub status: FetchStatus,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }
}

/// How a pagination loop ended.
enum LoopEnd {
    Exhausted,
    Ceiling,
    Failed { page_index: u32, error: SourceError },
}

struct Tally {
    pages: u32,
    records: u64,
    end: LoopEnd,
}

/// Cursor pagination over one range (and optional combo).
pub struct Fetcher<'a> {
    source: &'a dyn Source,
    pacer: Pacer,
    page_size: u32,
    max_pages: u32,
}

impl<'a> Fetcher<'a> {
    pub fn new(source: &'a dyn Source, pacer: Pacer, page_size: u32, max_pages: u32) -> Self {
        Self { source, pacer, page_size, max_pages }
    }

    /// Fetch every page and hand each to `sink` as it arrives, pausing after
    /// each request.
    /// No retries: on error the partial counts come back with `FetchStatus::Error`.
    pub fn fetch_all(
        &self,
        range: RangeDescriptor,
        combo: Option<&AttributeCombo>,
        sink: &dyn PageSink,
    ) -> FetchOutcome {
        let sort = SortOrder::Default;
        let tally = self.paginate(range, combo, sort, |page_index, page| {
            store_or_log(sink, &PageKey { range, combo, sort, page_index }, page);
        });

        let status = match tally.end {
            LoopEnd::Exhausted => FetchStatus::Complete,
            LoopEnd::Ceiling => {
                logw!(%range, max_pages = self.max_pages, "page ceiling reached");
                FetchStatus::Truncated { max_pages: self.max_pages }
            }
            LoopEnd::Failed { page_index, error } => {
                loge!(%range, page_index, error = %error, "fetch failed");
                FetchStatus::Error { page_index, message: error.to_string() }
            }
        };

        FetchOutcome {
            pages_emitted: tally.pages,
            record_count: tally.records,
            status,
        }
    }

    /// Same pagination, collecting record ids instead of persisting pages.
    /// A ceiling stop still returns what was collected.
    pub fn collect_ids(
        &self,
        range: RangeDescriptor,
        combo: Option<&AttributeCombo>,
        sort: SortOrder,
    ) -> Result<Vec<RecordId>, SourceError> {
        self.collect(range, combo, sort, None)
    }

    /// [`collect_ids`](Self::collect_ids) that also hands every page to `sink`.
    pub fn collect_and_store(
        &self,
        range: RangeDescriptor,
        combo: Option<&AttributeCombo>,
        sort: SortOrder,
        sink: &dyn PageSink,
    ) -> Result<Vec<RecordId>, SourceError> {
        self.collect(range, combo, sort, Some(sink))
    }

    fn collect(
        &self,
        range: RangeDescriptor,
        combo: Option<&AttributeCombo>,
        sort: SortOrder,
        sink: Option<&dyn PageSink>,
    ) -> Result<Vec<RecordId>, SourceError> {
        let mut ids = Vec::new();
        let tally = self.paginate(range, combo, sort, |page_index, page| {
            if let Some(sink) = sink {
                store_or_log(sink, &PageKey { range, combo, sort, page_index }, page);
            }
            ids.extend(page.records.iter().map(|r| r.id.clone()));
        });
        match tally.end {
            LoopEnd::Exhausted => Ok(ids),
            LoopEnd::Ceiling => {
                logw!(%range, max_pages = self.max_pages, "id collection hit page ceiling");
                Ok(ids)
            }
            LoopEnd::Failed { error, .. } => Err(error),
        }
    }

    fn paginate<F>(
        &self,
        range: RangeDescriptor,
        combo: Option<&AttributeCombo>,
        sort: SortOrder,
        mut on_page: F,
    ) -> Tally
    where
        F: FnMut(u32, &QueryPage),
    {
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;
        let mut records = 0u64;

        loop {
            if pages >= self.max_pages {
                return Tally { pages, records, end: LoopEnd::Ceiling };
            }

            let req = QueryRequest {
                range,
                combo,
                page_size: self.page_size,
                cursor: cursor.as_deref(),
                sort,
            };
            // Pause after every request, the last one included.
            let result = self.source.query(&req);
            self.pacer.pause();
            let page = match result {
                Ok(page) => page,
                Err(error) => {
                    return Tally { pages, records, end: LoopEnd::Failed { page_index: pages, error } };
                }
            };

            on_page(pages, &page);
            pages += 1;
            records += page.records.len() as u64;

            if !page.has_next_page {
                return Tally { pages, records, end: LoopEnd::Exhausted };
            }

            let next = match page.end_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => next,
                Some(_) => {
                    let error = SourceError::Malformed(s!("cursor did not advance"));
                    return Tally { pages, records, end: LoopEnd::Failed { page_index: pages, error } };
                }
                None => {
                    let error = SourceError::Malformed(s!("hasNextPage without endCursor"));
                    return Tally { pages, records, end: LoopEnd::Failed { page_index: pages, error } };
                }
            };
            cursor = Some(next);
        }
    }
}

fn store_or_log(sink: &dyn PageSink, key: &PageKey<'_>, page: &QueryPage) {
    if let Err(e) = sink.store_page(key, page) {
        loge!(range = %key.range, page_index = key.page_index, error = %e, "store page failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Record;
    use crate::config::DelayBounds;
    use crate::store::MemorySink;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Serves scripted pages in order.
    struct Pages(Mutex<Vec<Result<QueryPage, SourceError>>>);

    impl Source for Pages {
        fn query(&self, _req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
            let mut q = self.0.lock().unwrap();
            if q.is_empty() {
                return Err(SourceError::Transport(s!("script exhausted")));
            }
            q.remove(0)
        }
    }

    fn page(ids: &[&str], next: Option<&str>) -> Result<QueryPage, SourceError> {
        Ok(QueryPage {
            total_hits: 99,
            records: ids.iter().map(|id| Record::new(*id, json!({}))).collect(),
            has_next_page: next.is_some(),
            end_cursor: next.map(String::from),
        })
    }

    fn fetcher(src: &Pages, max_pages: u32) -> Fetcher<'_> {
        Fetcher::new(src, Pacer::none(), 2, max_pages)
    }

    #[test]
    fn follows_cursor_to_the_end() {
        let src = Pages(Mutex::new(vec![
            page(&["a", "b"], Some("c1")),
            page(&["c", "d"], Some("c2")),
            page(&["e"], None),
        ]));
        let sink = MemorySink::new();
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &sink);
        assert_eq!(out, FetchOutcome { pages_emitted: 3, record_count: 5, status: FetchStatus::Complete });
        let stored = sink.pages();
        assert_eq!(stored.iter().map(|p| p.page_index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn pauses_after_every_request_including_the_last() {
        let src = Pages(Mutex::new(vec![page(&["a"], Some("c1")), page(&["b"], None)]));
        let fetcher = Fetcher::new(&src, Pacer::new(DelayBounds::new(40, 40)), 2, 10);

        let started = Instant::now();
        let out = fetcher.fetch_all(RangeDescriptor::point(1), None, &MemorySink::new());
        assert!(out.is_complete());
        assert!(started.elapsed() >= Duration::from_millis(80), "{:?}", started.elapsed());

        let src = Pages(Mutex::new(vec![page(&["only"], None)]));
        let fetcher = Fetcher::new(&src, Pacer::new(DelayBounds::new(40, 40)), 2, 10);
        let started = Instant::now();
        fetcher.collect_ids(RangeDescriptor::point(1), None, SortOrder::Default).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn collect_and_store_keeps_sort_in_the_key() {
        let src = Pages(Mutex::new(vec![page(&["a"], Some("c1")), page(&["b"], None)]));
        let sink = MemorySink::new();
        let combo = AttributeCombo::new(vec![vec![s!("cook")]]);
        let ids = fetcher(&src, 10)
            .collect_and_store(RangeDescriptor::point(3), Some(&combo), SortOrder::Alternate, &sink)
            .unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        let pages = sink.pages();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.sort == SortOrder::Alternate && p.combo.as_ref() == Some(&combo)));
    }

    #[test]
    fn timeout_on_second_page_keeps_first() {
        let src = Pages(Mutex::new(vec![
            page(&["a", "b"], Some("c1")),
            Err(SourceError::Timeout),
        ]));
        let sink = MemorySink::new();
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &sink);
        assert_eq!(out.pages_emitted, 1);
        assert_eq!(out.record_count, 2);
        assert!(matches!(out.status, FetchStatus::Error { page_index: 1, .. }));
        assert_eq!(sink.pages().len(), 1);
    }

    #[test]
    fn missing_or_stuck_cursor_is_error() {
        let src = Pages(Mutex::new(vec![page(&["a"], Some("")), page(&["b"], None)]));
        // An empty-but-present cursor is accepted here; only None or a repeat fails.
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &MemorySink::new());
        assert!(out.is_complete());

        let mut no_cursor = page(&["a"], None).unwrap();
        no_cursor.has_next_page = true;
        let src = Pages(Mutex::new(vec![Ok(no_cursor)]));
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &MemorySink::new());
        assert!(matches!(out.status, FetchStatus::Error { page_index: 1, .. }));

        let src = Pages(Mutex::new(vec![page(&["a"], Some("x")), page(&["b"], Some("x"))]));
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &MemorySink::new());
        assert_eq!(out.pages_emitted, 2);
        assert!(matches!(out.status, FetchStatus::Error { page_index: 2, .. }));
    }

    #[test]
    fn page_ceiling_truncates() {
        let src = Pages(Mutex::new(vec![
            page(&["a"], Some("1")),
            page(&["b"], Some("2")),
            page(&["c"], Some("3")),
        ]));
        let out = fetcher(&src, 2).fetch_all(RangeDescriptor::point(1), None, &MemorySink::new());
        assert_eq!(out.pages_emitted, 2);
        assert_eq!(out.status, FetchStatus::Truncated { max_pages: 2 });
    }

    #[test]
    fn sink_failure_does_not_stop_pagination() {
        let src = Pages(Mutex::new(vec![page(&["a"], Some("1")), page(&["b"], None)]));
        let out = fetcher(&src, 10).fetch_all(RangeDescriptor::point(1), None, &MemorySink::rejecting_pages());
        assert_eq!(out.pages_emitted, 2);
        assert!(out.is_complete());
    }

    #[test]
    fn collect_ids_propagates_errors() {
        let src = Pages(Mutex::new(vec![page(&["a", "b"], Some("1")), page(&["c"], None)]));
        let ids = fetcher(&src, 10).collect_ids(RangeDescriptor::point(1), None, SortOrder::Default).unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let src = Pages(Mutex::new(vec![Err(SourceError::Status(500))]));
        let r = fetcher(&src, 10).collect_ids(RangeDescriptor::point(1), None, SortOrder::Default);
        assert!(matches!(r, Err(SourceError::Status(500))));
    }
}
