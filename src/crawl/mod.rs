// src/crawl/mod.rs
//! # Adaptive range-partitioning crawler
//!
//! Upstream search APIs refuse to page past a hard result cap (500 on the
//! sites this was built for). To read everything, the pay range is split
//! until each piece is under the cap:
//!
//! ```text
//! queue ─▶ Oracle::probe(range) ─┬─ 0          ─▶ drop (Empty)
//!                                ├─ <= cap     ─▶ Fetcher::fetch_all (Dispatched)
//!                                ├─ > cap      ─▶ bisect, enqueue both halves (Split)
//!                                └─ > cap, point ─▶ Expander::expand (OversizedPoint)
//! ```
//!
//! - [`oracle`] – page-size-1 count probes; failures read as "oversized".
//! - [`scheduler`] – the FIFO loop above, single-threaded, plus the run report.
//! - [`fetcher`] – cursor pagination for one range, streaming pages to a sink.
//! - [`expander`] – concurrent attribute-combo coverage for an oversized point.
//!
//! Widths strictly shrink on every split and no range is probed twice, so a
//! run always terminates.

pub mod expander;
pub mod fetcher;
pub mod oracle;
pub mod scheduler;

pub use expander::{ExpandResult, Expander};
pub use fetcher::{FetchOutcome, FetchStatus, Fetcher};
pub use oracle::{Oracle, Probe};
pub use scheduler::{decide, Decision, RangeState, RunReport, Scheduler};
