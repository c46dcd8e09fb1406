// src/cli.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{bail, eyre, Result, WrapErr};

use crate::{
    config::{consts::LOG_FILE, AppOptions, DelayBounds},
    core::{Pacer, RangeDescriptor},
    crawl::{Oracle, RangeState, RunReport, Scheduler},
    file,
    log::{self, LogTarget},
    progress::Progress,
    source::GraphqlSource,
    store::LakeSink,
};

#[derive(Debug, Parser)]
#[command(name = "cli", version, about = "Crawl a capped listing API by adaptive pay-range partitioning")]
pub struct Args {
    /// JSON config file (crawl, source and output sections)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output root; overrides `output.out_dir`
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Run directory name; overrides `output.run_name`
    #[arg(long)]
    pub run: Option<String>,

    #[arg(long, requires = "upper", allow_hyphen_values = true)]
    pub lower: Option<i64>,

    #[arg(long, requires = "lower", allow_hyphen_values = true)]
    pub upper: Option<i64>,

    /// Max results per query
    #[arg(long)]
    pub cap: Option<u64>,

    /// Expander worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Shorter politeness delays (secondary crawlers)
    #[arg(long)]
    pub light: bool,

    /// Log file (default: .store/debug.log)
    #[arg(long, conflicts_with = "log_stderr")]
    pub log_file: Option<PathBuf>,

    /// Log to stderr instead of a file
    #[arg(long)]
    pub log_stderr: bool,

    #[arg(short, long)]
    pub verbose: bool,

    /// Probe the initial range once, print the hit count and exit
    #[arg(long)]
    pub dry_probe: bool,
}

pub fn run() -> Result<()> {
    run_with(Args::parse())
}

pub fn run_with(args: Args) -> Result<()> {
    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File(args.log_file.clone().unwrap_or_else(|| PathBuf::from(LOG_FILE)))
    };
    log::init(target, args.verbose).wrap_err("cannot open log")?;

    let mut opts = AppOptions::load(&args.config)
        .wrap_err_with(|| format!("loading {}", args.config.display()))?;
    apply_overrides(&mut opts, &args)?;
    opts.crawl.validate()?;

    let crawl = &opts.crawl;
    let source = GraphqlSource::from_options(
        &opts.source,
        crawl.dimension_names(),
        Duration::from_secs(crawl.request_timeout_secs),
    )?;

    if args.dry_probe {
        let probe = Oracle::new(&source, Pacer::none()).probe(crawl.initial_range, None);
        if probe.is_unknown() {
            bail!("probe of {} failed; see log", crawl.initial_range);
        }
        println!("{}\t{}", crawl.initial_range, probe.hits());
        return Ok(());
    }

    let run_name = opts.output.run_name.clone().unwrap_or_else(file::default_run_name);
    let sink = LakeSink::create(&opts.output.out_dir, &run_name)?;
    logf!(run_dir = %sink.run_dir().display(), "cli: writing run");

    let mut progress = ConsoleProgress::default();
    let report = Scheduler::new(&source, &sink, &sink, crawl).run_configured(Some(&mut progress));

    match sink.write_report(&report) {
        Ok(path) => logf!(path = %path.display(), "cli: report saved"),
        Err(e) => loge!(error = %e, "cli: report save failed"),
    }
    print_summary(&report);

    let failed = report.failed().count();
    if failed > 0 {
        return Err(eyre!("{failed} range(s) failed; see {}", sink.run_dir().display()));
    }
    Ok(())
}

fn apply_overrides(opts: &mut AppOptions, args: &Args) -> Result<()> {
    if let Some(out) = &args.out {
        opts.output.out_dir = out.clone();
    }
    if let Some(run) = &args.run {
        opts.output.run_name = Some(run.clone());
    }
    if let (Some(lower), Some(upper)) = (args.lower, args.upper) {
        opts.crawl.initial_range = RangeDescriptor::new(lower, upper)?;
    }
    if let Some(cap) = args.cap {
        opts.crawl.cap = cap;
    }
    if let Some(workers) = args.workers {
        opts.crawl.worker_count = workers;
    }
    if args.light {
        opts.crawl.probe_delay = DelayBounds::light();
        opts.crawl.page_delay = DelayBounds::light();
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("probes      {}", report.probes);
    println!("splits      {}", report.splits.len());
    println!("empty       {}", report.empty.len());
    println!("dispatched  {}", report.dispatched.len());
    println!("expanded    {}", report.expanded.len());
    println!("failed      {}", report.failed().count());
    println!("pages       {}", report.pages);
    println!("records     {}", report.records);
    for d in report.failed() {
        println!("  failed {} ({} pages kept)", d.range, d.outcome.pages_emitted);
    }
    for e in &report.expanded {
        println!("  incomplete {} ({} ids, {} hits)", e.point, e.summary.ids, e.hits);
    }
}

/// Status lines on stderr, one per finished range.
#[derive(Default)]
struct ConsoleProgress {
    done: usize,
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, initial: RangeDescriptor) {
        eprintln!("Crawling {initial}...");
    }

    fn log(&mut self, msg: &str) {
        eprintln!("{msg}");
    }

    fn range_done(&mut self, range: RangeDescriptor, state: RangeState, hits: u64) {
        self.done += 1;
        let label = match state {
            RangeState::Empty => "empty",
            RangeState::Dispatched => "fetched",
            RangeState::Split => "split",
            RangeState::OversizedPoint => "expanded",
        };
        eprintln!("[{:>5}] {range:<20} {hits:>7} hits  {label}", self.done);
    }

    fn finish(&mut self, report: &RunReport) {
        if report.is_complete() {
            eprintln!("Crawl complete ({} ranges)", self.done);
        } else {
            eprintln!("Crawl finished with gaps ({} ranges)", self.done);
        }
    }
}
