// benches/partition.rs
use criterion::{criterion_group, criterion_main, Criterion, black_box};

use care_scrape::{
    config::{CrawlOptions, DelayBounds},
    core::{combo, RangeDescriptor},
    crawl::Scheduler,
    source::{Listing, MemorySource},
    store::MemorySink,
};

fn vocabularies() -> Vec<Vec<String>> {
    let dim = |vals: &[&str]| vals.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    vec![
        dim(&["cook", "clean", "drive", "pets"]),
        dim(&["cpr", "first_aid", "nurse"]),
        dim(&["en", "es"]),
    ]
}

/// Skewed synthetic market: most listings sit on a handful of round values.
fn listings(n: usize) -> Vec<Listing> {
    (0..n)
        .map(|i| {
            let value = if i % 4 == 0 { 15 + (i % 5) * 5 } else { (i * 31) % 200 };
            Listing::new(format!("l{i}"), value as i64)
        })
        .collect()
}

fn bench_combos(c: &mut Criterion) {
    let vocab = vocabularies();
    c.bench_function("combo_enumerate", |b| {
        b.iter(|| black_box(combo::enumerate(black_box(&vocab)).len()))
    });
}

fn bench_scheduler(c: &mut Criterion) {
    let opts = CrawlOptions {
        probe_delay: DelayBounds::none(),
        page_delay: DelayBounds::none(),
        page_size: 50,
        worker_count: 4,
        ..CrawlOptions::default()
    };
    let initial = RangeDescriptor::from_ordered(0, 199);

    c.bench_function("scheduler_memory_10k", |b| {
        b.iter(|| {
            let src = MemorySource::new(listings(10_000), 500);
            let sink = MemorySink::new();
            let report = Scheduler::new(&src, &sink, &sink, &opts).run(initial, 500, None);
            black_box(report.records)
        })
    });
}

criterion_group!(benches, bench_combos, bench_scheduler);
criterion_main!(benches);
