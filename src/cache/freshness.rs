// Freshness evaluation for cached responses.
// Pure functions deriving age, max-age and staleness from stored headers.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{CACHE_CONTROL, DATE};

use super::entry::CacheEntry;

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_DATE: &str = "%a %b %e %H:%M:%S %Y";

/// Freshness snapshot of an entry at one point in time. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    /// Parsed `Date` header.
    pub time: Option<DateTime<Utc>>,
    /// Seconds since `time`.
    pub age: Option<i64>,
    pub max_age: Option<u64>,
    pub stale: bool,
    /// `ETag` verbatim.
    pub etag: Option<String>,
}

impl Freshness {
    pub fn evaluate(entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        let time = parse_date(entry);
        let age = time.map(|time| seconds_between(time, now));
        let max_age = max_age(entry);

        Self {
            time,
            age,
            max_age,
            stale: stale_from(age, max_age),
            etag: entry.etag().map(str::to_string),
        }
    }
}

/// Parse an HTTP-date in any of the three formats HTTP/1.1 allows.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    NaiveDateTime::parse_from_str(value, IMF_FIXDATE)
        .or_else(|_| NaiveDateTime::parse_from_str(value, RFC850_DATE))
        .or_else(|_| NaiveDateTime::parse_from_str(value, ASCTIME_DATE))
        .map(|naive| naive.and_utc())
        .ok()
}

/// Format a timestamp as IMF-fixdate.
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(IMF_FIXDATE).to_string()
}

/// The entry's `Date` header, if present and well formed.
pub fn parse_date(entry: &CacheEntry) -> Option<DateTime<Utc>> {
    entry.header(DATE.as_str()).and_then(parse_http_date)
}

/// Whole seconds elapsed since the entry's `Date`, floored.
pub fn age(entry: &CacheEntry, now: DateTime<Utc>) -> Option<i64> {
    parse_date(entry).map(|time| seconds_between(time, now))
}

/// First `max-age=<digits>` token inside `Cache-Control`.
pub fn max_age(entry: &CacheEntry) -> Option<u64> {
    entry.header(CACHE_CONTROL.as_str()).and_then(parse_max_age)
}

/// Missing date or max-age counts as stale.
pub fn is_stale(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    stale_from(age(entry, now), max_age(entry))
}

/// True when `Cache-Control` lists `directive`, with or without an argument.
///
/// Directives are separated by commas or whitespace and compared
/// case-insensitively.
pub fn has_directive(entry: &CacheEntry, directive: &str) -> bool {
    let Some(value) = entry.header(CACHE_CONTROL.as_str()) else {
        return false;
    };

    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|token| token.split('=').next().unwrap_or_default())
        .any(|name| name.eq_ignore_ascii_case(directive))
}

/// `no-cache` or `no-store`: the entry may not be served without revalidation.
pub fn forbids_reuse(entry: &CacheEntry) -> bool {
    has_directive(entry, "no-cache") || has_directive(entry, "no-store")
}

/// `no-store`: the response should not be kept at all.
pub fn forbids_storage(entry: &CacheEntry) -> bool {
    has_directive(entry, "no-store")
}

fn stale_from(age: Option<i64>, max_age: Option<u64>) -> bool {
    match (age, max_age) {
        // A negative age (Date ahead of our clock) is fresh.
        (Some(age), Some(max_age)) => u64::try_from(age).is_ok_and(|age| age >= max_age),
        _ => true,
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().div_euclid(1000)
}

/// Grammar: the literal `max-age=` (any case) followed by one or more decimal
/// digits. The first occurrence with digits wins.
fn parse_max_age(value: &str) -> Option<u64> {
    let lower = value.to_ascii_lowercase();

    lower.match_indices("max-age=").find_map(|(start, token)| {
        let rest = &lower[start + token.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse().ok()
    })
}
