//! Raw API payload → canonical model.
//!
//! The scheduler's HTTP gateway has been observed answering with camelCase
//! field names on some builds and snake_case on others. Every field that can
//! vary is listed once in [`fields`] with its accepted names in order of
//! preference; the functions here resolve against that table and fall back
//! to defaults instead of failing.

use serde_json::Value;

use crate::job::{Job, JobId, JobStats, JobStatus, Page};

/// Accepted names for one semantic field, most preferred first.
pub type Aliases = &'static [&'static str];

pub mod fields {
    use super::Aliases;

    pub const JOB_ID: Aliases = &["jobId", "job_id"];
    pub const JOB_TYPE: Aliases = &["type"];
    pub const JOB_STATUS: Aliases = &["status"];
    pub const CREATED_AT: Aliases = &["createdAt", "created_at"];
    pub const RETRY_COUNT: Aliases = &["retryCount", "retry_count"];
    pub const PAYLOAD: Aliases = &["payload"];
    pub const ERROR_MESSAGE: Aliases = &["errorMessage", "error_message"];

    pub const TOTAL_JOBS: Aliases = &["totalJobs", "total_jobs"];
    pub const PENDING_JOBS: Aliases = &["pendingJobs", "pending_jobs"];
    pub const RUNNING_JOBS: Aliases = &["runningJobs", "running_jobs"];
    pub const FAILED_JOBS: Aliases = &["failedJobs", "failed_jobs"];
    pub const COMPLETED_JOBS: Aliases = &["completedJobs", "completed_jobs"];

    pub const CURRENT_PAGE: Aliases = &["currentPage", "current_page"];
    pub const TOTAL_PAGES: Aliases = &["totalPages", "total_pages"];
    pub const TOTAL_RECORDS: Aliases = &["totalRecords", "total_records"];

    pub const PAGE_ITEMS: Aliases = &["jobs"];
    pub const PAGE_META: Aliases = &["meta"];
}

/// First non-null value among `names`, or `None` when `raw` is not an object.
pub fn lookup<'a>(raw: &'a Value, names: Aliases) -> Option<&'a Value> {
    let obj = raw.as_object()?;
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|v| !v.is_null()))
}

/// Like [`lookup`], but an empty string, `false` or a zero also counts as
/// absent and moves on to the next name. Used for job fields where an empty
/// first-convention value must not hide a populated second one.
pub fn lookup_filled<'a>(raw: &'a Value, names: Aliases) -> Option<&'a Value> {
    let obj = raw.as_object()?;
    names
        .iter()
        .find_map(|name| obj.get(*name).filter(|v| is_filled(v)))
}

fn is_filled(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Base-10 integer parse with `parseInt` leniency: surrounding whitespace and a
/// leading `+` are accepted, parsing stops at the first non-digit. Negative,
/// empty and non-numeric input give 0.
pub fn parse_count_str(s: &str) -> u64 {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let mut n: u64 = 0;
    for b in s.bytes().take_while(u8::is_ascii_digit) {
        n = n.saturating_mul(10).saturating_add(u64::from(b - b'0'));
    }
    n
}

pub fn parse_count(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Value::String(s) => parse_count_str(s),
        _ => 0,
    }
}

fn count_or(raw: &Value, names: Aliases, default: u64) -> u64 {
    lookup(raw, names).map(parse_count).unwrap_or(default)
}

/// Strings pass through; any other JSON value is re-encoded so opaque fields
/// such as `payload` survive even when the server sends an object.
fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text(raw: &Value, names: Aliases) -> Option<String> {
    lookup(raw, names).map(as_text)
}

fn filled_text(raw: &Value, names: Aliases) -> Option<String> {
    lookup_filled(raw, names).map(as_text)
}

/// First name whose value parses to a non-zero count.
fn filled_count(raw: &Value, names: Aliases) -> u64 {
    let Some(obj) = raw.as_object() else {
        return 0;
    };
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .map(parse_count)
        .find(|n| *n != 0)
        .unwrap_or(0)
}

pub fn normalize_job(raw: &Value) -> Job {
    Job {
        id: JobId(filled_text(raw, fields::JOB_ID).unwrap_or_default()),
        job_type: text(raw, fields::JOB_TYPE).unwrap_or_default(),
        status: text(raw, fields::JOB_STATUS)
            .map(|s| JobStatus::parse_lenient(&s))
            .unwrap_or_default(),
        created_at: filled_text(raw, fields::CREATED_AT).unwrap_or_default(),
        retry_count: filled_count(raw, fields::RETRY_COUNT),
        payload: text(raw, fields::PAYLOAD),
        error_message: filled_text(raw, fields::ERROR_MESSAGE),
    }
}

/// When the server omits the total entirely, it is derived from the four
/// status counters. A reported total is kept as-is.
pub fn normalize_stats(raw: &Value) -> JobStats {
    let mut stats = JobStats {
        total_jobs: 0,
        pending_jobs: count_or(raw, fields::PENDING_JOBS, 0),
        running_jobs: count_or(raw, fields::RUNNING_JOBS, 0),
        failed_jobs: count_or(raw, fields::FAILED_JOBS, 0),
        completed_jobs: count_or(raw, fields::COMPLETED_JOBS, 0),
    };
    stats.total_jobs = match lookup(raw, fields::TOTAL_JOBS) {
        Some(v) => parse_count(v),
        None => stats.status_sum(),
    };
    stats
}

/// `{jobs: [...], meta: {...}}` → `Page<Job>`. Missing `jobs` is an empty page;
/// page numbers are never below 1.
pub fn normalize_page(raw: &Value) -> Page<Job> {
    let items = lookup(raw, fields::PAGE_ITEMS)
        .and_then(Value::as_array)
        .map(|jobs| jobs.iter().map(normalize_job).collect())
        .unwrap_or_default();

    let meta = lookup(raw, fields::PAGE_META).unwrap_or(&Value::Null);

    Page {
        items,
        current_page: count_or(meta, fields::CURRENT_PAGE, 1).max(1),
        total_pages: count_or(meta, fields::TOTAL_PAGES, 1).max(1),
        total_records: count_or(meta, fields::TOTAL_RECORDS, 0),
    }
}
