// src/config/consts.rs

// Upstream limits
pub const CAP: u64 = 500;                   // results a single query can reach
pub const UNKNOWN_HITS: u64 = 999_999;      // failed probe; never read as "empty"
pub const PROBE_PAGE_SIZE: u32 = 1;
pub const PAGE_SIZE: u32 = 10;
pub const MAX_PAGES_PER_RANGE: u32 = 500;
pub const DEGENERATE_THRESHOLD: usize = 498; // one combo alone is still capped

// Initial pay range (currency units per hour)
pub const DEFAULT_LOWER: i64 = 0;
pub const DEFAULT_UPPER: i64 = 100;

// Concurrency
pub const WORKERS: usize = 16;
pub const MAX_VOCABULARY: usize = 8;        // 2^n - 1 subsets per dimension
pub const VOCABULARY_CEILING: usize = 16;   // hard bound on `max_vocabulary`
pub const MAX_COMBOS: u64 = 65_536;         // two full 8-value dimensions fit

// Politeness (ms)
pub const PRIMARY_DELAY_MS: (u64, u64) = (1_500, 1_800);
pub const LIGHT_DELAY_MS: (u64, u64) = (300, 700);

// Net
pub const REQUEST_TIMEOUT_SECS: u64 = 60;
pub const USER_AGENT: &str = "care_scrape/0.4";

// GraphQL response shape
pub const RESULT_PREFIX: &str = "searchProviders";
pub const RECORDS_FIELD: &str = "results";
pub const ID_FIELD: &str = "id";

// Local store
pub const LOG_FILE: &str = ".store/debug.log";
pub const DEFAULT_OUT_DIR: &str = "out";
pub const OUTCOMES_FILE: &str = "outcomes.jsonl";
pub const EXPANDED_IDS_FILE: &str = "expanded_ids.json";
pub const REPORT_FILE: &str = "report.json";
