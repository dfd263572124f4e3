use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::sumo::CreateSearchJob;

/// Timestamp layout the search-job API accepts for `from` / `to`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub const ORDER_ID_PLACEHOLDER: &str = "{order_id}";

/// Charge-request query. `replace()` needs four backslashes to strip one.
pub const DEFAULT_QUERY_TEMPLATE: &str = concat!(
    "_dataTier=infrequent _index=nytimes_spg_shared _sourceCategory=nytimes-spg-pug-app-prd ",
    r#""PUGRB: Received charge request" "{order_id}" "#,
    r#"| parse regex "request (?<json>.*), approximate" "#,
    r#"| replace(json, "\\\\", "") as json"#,
);

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid day {0:?}, expected YYYY-MM-DD")]
    InvalidDay(String),
    #[error("invalid timestamp {0:?}, expected YYYY-MM-DDTHH:MM:SS or a relative offset like -7d")]
    InvalidTimestamp(String),
    #[error("relative offset {0:?} is out of range")]
    OffsetOutOfRange(String),
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),
    #[error("window start {from} is after end {to}")]
    InvertedWindow { from: String, to: String },
}

/// An absolute search window. Timestamps are wall-clock in `time_zone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub time_zone: String,
}

impl TimeWindow {
    pub fn new(
        from: NaiveDateTime,
        to: NaiveDateTime,
        time_zone: impl Into<String>,
    ) -> Result<Self, QueryError> {
        if from > to {
            return Err(QueryError::InvertedWindow {
                from: from.format(TIMESTAMP_FORMAT).to_string(),
                to: to.format(TIMESTAMP_FORMAT).to_string(),
            });
        }
        Ok(Self {
            from,
            to,
            time_zone: time_zone.into(),
        })
    }

    /// 00:00:00 through 23:59:59 of `day`.
    pub fn day(day: NaiveDate, time_zone: impl Into<String>) -> Self {
        Self {
            from: day.and_time(NaiveTime::MIN),
            to: day.and_time(end_of_day()),
            time_zone: time_zone.into(),
        }
    }

    /// True when the window spans exactly one calendar day.
    pub fn is_day_shaped(&self) -> bool {
        self.from.date() == self.to.date()
            && self.from.time() == NaiveTime::MIN
            && self.to.time() == end_of_day()
    }

    /// The same shape shifted to the following calendar day.
    pub fn next_day(&self) -> Option<Self> {
        if !self.is_day_shaped() {
            return None;
        }
        let next = self.from.date().succ_opt()?;
        Some(Self::day(next, self.time_zone.clone()))
    }

    pub fn start_str(&self) -> String {
        self.from.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.to.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {} ({})", self.start_str(), self.end_str(), self.time_zone)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// How the caller described the time range.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    Day(NaiveDate),
    /// `from` is absolute or relative (`-7d`); `to` is absolute, `now`, or absent (= now).
    Range { from: String, to: Option<String> },
}

impl TimeInput {
    pub fn parse_day(day: &str) -> Result<Self, QueryError> {
        parse_day(day).map(TimeInput::Day)
    }
}

pub fn parse_day(day: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(day.trim(), DAY_FORMAT)
        .map_err(|_| QueryError::InvalidDay(day.to_string()))
}

/// A query plus the window it should run against.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    pub query: String,
    pub window: TimeWindow,
}

impl SearchSpec {
    pub fn to_request(&self) -> CreateSearchJob {
        CreateSearchJob {
            query: self.query.clone(),
            from: self.window.start_str(),
            to: self.window.end_str(),
            time_zone: self.window.time_zone.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    template: String,
    time_zone: String,
}

impl QueryBuilder {
    pub fn new(template: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            time_zone: time_zone.into(),
        }
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn query(&self, order_id: &str) -> String {
        self.template.replace(ORDER_ID_PLACEHOLDER, order_id)
    }

    /// The search for `order_id` over an already resolved window.
    pub fn build(&self, order_id: &str, window: &TimeWindow) -> SearchSpec {
        SearchSpec {
            query: self.query(order_id),
            window: window.clone(),
        }
    }

    pub fn resolve_window(&self, input: &TimeInput) -> Result<TimeWindow, QueryError> {
        self.resolve_window_at(input, Utc::now())
    }

    /// Resolves against a fixed `now`. A relative `from` pins the zone to UTC;
    /// otherwise `now` is read as wall-clock time in the configured zone.
    pub fn resolve_window_at(
        &self,
        input: &TimeInput,
        now: DateTime<Utc>,
    ) -> Result<TimeWindow, QueryError> {
        let (from, to) = match input {
            TimeInput::Day(day) => return Ok(TimeWindow::day(*day, self.time_zone.clone())),
            TimeInput::Range { from, to } => (from, to),
        };

        let offset = parse_relative(from)?;
        let time_zone = if offset.is_some() { "UTC" } else { self.time_zone.as_str() };
        let current = || wall_clock_now(now, time_zone);

        let from = match offset {
            Some(offset) => current()?
                .checked_sub_signed(offset)
                .ok_or_else(|| QueryError::OffsetOutOfRange(from.clone()))?,
            None => parse_timestamp(from)?,
        };

        let to = match to.as_deref().map(str::trim) {
            None | Some("") => current()?,
            Some(s) if s.eq_ignore_ascii_case("now") => current()?,
            Some(s) => parse_timestamp(s)?,
        };

        TimeWindow::new(from, to, time_zone)
    }
}

/// `now` as local wall-clock time in `time_zone`, truncated to whole seconds.
fn wall_clock_now(now: DateTime<Utc>, time_zone: &str) -> Result<NaiveDateTime, QueryError> {
    let tz: Tz = time_zone
        .parse()
        .map_err(|_| QueryError::UnknownTimeZone(time_zone.to_string()))?;
    let local = now.with_timezone(&tz).naive_local();
    Ok(local.with_nanosecond(0).unwrap_or(local))
}

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-(\d+)([dhms])$").expect("valid relative offset pattern"))
}

/// `-7d`, `-12h`, `-30m`, `-60s`. Returns `None` when `input` is not relative.
fn parse_relative(input: &str) -> Result<Option<Duration>, QueryError> {
    let normalized = input.trim().to_lowercase();
    let Some(caps) = relative_pattern().captures(&normalized) else {
        return Ok(None);
    };
    let out_of_range = || QueryError::OffsetOutOfRange(input.to_string());
    let amount: i64 = caps[1].parse().map_err(|_| out_of_range())?;
    let offset = match &caps[2] {
        "d" => Duration::try_days(amount),
        "h" => Duration::try_hours(amount),
        "m" => Duration::try_minutes(amount),
        _ => Duration::try_seconds(amount),
    };
    offset.map(Some).ok_or_else(out_of_range)
}

fn parse_timestamp(input: &str) -> Result<NaiveDateTime, QueryError> {
    let s = input.trim();
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| QueryError::InvalidTimestamp(input.to_string()))
}
