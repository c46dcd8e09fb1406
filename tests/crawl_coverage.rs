// tests/crawl_coverage.rs
use std::collections::HashSet;

use care_scrape::config::{CrawlOptions, DelayBounds};
use care_scrape::core::RangeDescriptor;
use care_scrape::crawl::Scheduler;
use care_scrape::source::{Listing, MemorySource};
use care_scrape::store::MemorySink;

fn fast_opts() -> CrawlOptions {
    CrawlOptions {
        probe_delay: DelayBounds::none(),
        page_delay: DelayBounds::none(),
        page_size: 25,
        ..CrawlOptions::default()
    }
}

/// Clustered values: a few hot spots plus a sparse tail.
fn listings() -> Vec<Listing> {
    let mut out = Vec::new();
    for i in 0..2_000 {
        let value = match i % 10 {
            0..=3 => 15 + (i % 3),
            4..=6 => 40 + (i % 17),
            _ => (i * 7) % 101,
        };
        out.push(Listing::new(format!("l{i}"), value as i64));
    }
    out
}

#[test]
fn leaves_partition_the_initial_range() {
    let src = MemorySource::new(listings(), 100);
    let sink = MemorySink::new();
    let opts = fast_opts();
    let initial = RangeDescriptor::new(0, 100).unwrap();

    let report = Scheduler::new(&src, &sink, &sink, &opts).run(initial, 100, None);

    let leaves = report.leaves();
    assert_eq!(leaves.first().unwrap().lower(), 0);
    assert_eq!(leaves.last().unwrap().upper(), 100);
    for pair in leaves.windows(2) {
        assert_eq!(pair[0].upper() + 1, pair[1].lower(), "{} then {}", pair[0], pair[1]);
    }
    for d in &report.dispatched {
        assert!(d.hits <= 100, "{} dispatched with {} hits", d.range, d.hits);
    }
    for split in &report.splits {
        assert!(split.left.width() < split.parent.width());
        assert!(split.right.width() < split.parent.width());
    }
}

#[test]
fn every_reachable_listing_is_fetched_exactly_once() {
    let all = listings();
    let src = MemorySource::new(all.clone(), 100);
    let sink = MemorySink::new();
    let opts = fast_opts();

    let report = Scheduler::new(&src, &sink, &sink, &opts)
        .run(RangeDescriptor::new(0, 100).unwrap(), 100, None);

    // Range pages only; expanded points also store per-combo pages.
    let fetched: Vec<String> = sink.pages().into_iter()
        .filter(|p| p.combo.is_none())
        .flat_map(|p| p.record_ids)
        .collect();
    let unique: HashSet<&String> = fetched.iter().collect();
    assert_eq!(fetched.len(), unique.len());

    let expanded: HashSet<i64> = report.expanded.iter().map(|e| e.point.lower()).collect();
    let expected = all.iter().filter(|l| !expanded.contains(&l.value)).count();
    assert_eq!(fetched.len(), expected);
    assert_eq!(report.failed().count(), 0);
}

#[test]
fn each_range_is_probed_once() {
    let src = MemorySource::new(listings(), 100);
    let sink = MemorySink::new();
    let opts = fast_opts();

    let report = Scheduler::new(&src, &sink, &sink, &opts)
        .run(RangeDescriptor::new(0, 100).unwrap(), 100, None);

    let terminal = report.empty.len() + report.dispatched.len() + report.expanded.len();
    assert_eq!(report.probes as usize, report.splits.len() + terminal);
    assert!(src.query_count() >= report.probes + report.pages);
}
