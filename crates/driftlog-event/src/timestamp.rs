//! UTC instants with microsecond precision and strict ISO-8601 round-tripping.
//!
//! A [`Timestamp`] always holds a UTC instant truncated to microseconds.
//! There are two independent parse paths and two independent format paths,
//! and they must agree byte-for-byte on canonical input:
//!
//! - [`Timestamp::parse`] -- generic, tries RFC 3339, RFC 2822, and a list of
//!   common layouts through `chrono`.
//! - [`Timestamp::parse_iso8601`] -- dedicated single-pass ISO-8601 reader
//!   used on the ingestion hot path.
//! - [`Timestamp::to_iso8601`] -- `chrono`'s RFC 3339 writer.
//! - [`fmt::Display`] / [`Serialize`] -- fixed-width writer over the
//!   microsecond expansion.
//!
//! Formatting always emits exactly three fractional digits and a `Z` offset.
//! Sub-millisecond digits are truncated, never rounded.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta,
    TimeZone, Timelike, Utc,
};
use serde::{Serialize, Serializer};

use crate::value::Value;

/// Nanoseconds per microsecond.
const NANOS_PER_MICRO: u32 = 1_000;

/// Nanoseconds per second; chrono stores leap seconds as `>= 1e9` nanos.
const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Layouts carrying an explicit offset, tried by [`Timestamp::parse`].
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%d/%b/%Y:%H:%M:%S %z",
    "%a %b %e %H:%M:%S %z %Y",
];

/// Layouts without an offset, read as UTC by [`Timestamp::parse`].
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a %b %e %H:%M:%S %Y",
];

/// Date-only layouts, read as midnight UTC by [`Timestamp::parse`].
const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y"];

/// Errors that can occur when building or parsing a [`Timestamp`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    /// Epoch inputs do not describe a representable instant.
    #[error("value error: {seconds}s + {micros}us is not a representable instant")]
    Value {
        /// Seconds since the Unix epoch.
        seconds: i64,
        /// Additional microseconds.
        micros: i64,
    },

    /// Text could not be parsed as a date/time.
    #[error("parse error: {input:?}: {reason}")]
    Parse {
        /// The rejected input.
        input: String,
        /// What the parser objected to.
        reason: String,
    },

    /// [`Timestamp::import`] was handed a string that is not ISO-8601.
    #[error("timestamp parser error: {input:?} is not an ISO-8601 timestamp ({reason})")]
    TimestampParser {
        /// The rejected input.
        input: String,
        /// The underlying parse failure.
        reason: String,
    },
}

/// A UTC instant with microsecond resolution.
///
/// Immutable once built, except for [`Timestamp::utc`], which normalizes in
/// place and returns the same instance for call chaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    time: DateTime<Utc>,
}

/// Anything [`Timestamp::import`] knows how to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource<'a> {
    /// An existing timestamp, returned as a copy.
    Timestamp(Timestamp),
    /// A native instant, wrapped.
    Time(DateTime<Utc>),
    /// ISO-8601 text, parsed.
    Text(&'a str),
    /// Anything else; import yields no value.
    Unsupported,
}

impl From<Timestamp> for TimeSource<'_> {
    fn from(timestamp: Timestamp) -> Self {
        Self::Timestamp(timestamp)
    }
}

impl From<&Timestamp> for TimeSource<'_> {
    fn from(timestamp: &Timestamp) -> Self {
        Self::Timestamp(*timestamp)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeSource<'_> {
    fn from(time: DateTime<Tz>) -> Self {
        Self::Time(time.with_timezone(&Utc))
    }
}

impl<'a> From<&'a str> for TimeSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Value> for TimeSource<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Timestamp(timestamp) => Self::Timestamp(*timestamp),
            Value::String(text) => Self::Text(text),
            _ => Self::Unsupported,
        }
    }
}

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Build an instant from Unix time plus optional microseconds.
    ///
    /// `micros` may be negative or exceed one second; it is added to
    /// `seconds` as a signed offset.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Value`] if the sum is outside the range
    /// `chrono` can represent.
    pub fn at(seconds: i64, micros: i64) -> Result<Self, TimestampError> {
        DateTime::from_timestamp(seconds, 0)
            .and_then(|base| base.checked_add_signed(TimeDelta::microseconds(micros)))
            .map(Self::from)
            .ok_or(TimestampError::Value { seconds, micros })
    }

    /// Parse a free-form date/time string.
    ///
    /// Tries RFC 3339, RFC 2822, then a fixed list of common layouts. Text
    /// without an offset is read as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] if no layout matches.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let trimmed = text.trim();

        if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from(time));
        }
        if let Ok(time) = DateTime::parse_from_rfc2822(trimmed) {
            return Ok(Self::from(time));
        }
        for layout in OFFSET_LAYOUTS {
            if let Ok(time) = DateTime::<FixedOffset>::parse_from_str(trimmed, layout) {
                return Ok(Self::from(time));
            }
        }
        for layout in NAIVE_LAYOUTS {
            if let Ok(time) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Ok(Self::from(time.and_utc()));
            }
        }
        for layout in DATE_LAYOUTS {
            if let Some(time) = NaiveDate::parse_from_str(trimmed, layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
            {
                return Ok(Self::from(time.and_utc()));
            }
        }

        Err(TimestampError::Parse {
            input: text.to_owned(),
            reason: "no known date/time layout matches".to_owned(),
        })
    }

    /// Parse strict ISO-8601 with the dedicated single-pass reader.
    ///
    /// Accepts `YYYY[-MM[-DD]]` optionally followed by
    /// `Thh[:mm[:ss[.fraction]]]` and an offset (`Z`, `+hh`, `+hhmm`,
    /// `+hh:mm`). A missing offset means UTC. Fraction digits beyond
    /// microseconds are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] on malformed input.
    pub fn parse_iso8601(text: &str) -> Result<Self, TimestampError> {
        iso8601::parse(text)
            .map(Self::from)
            .map_err(|reason| TimestampError::Parse {
                input: text.to_owned(),
                reason: reason.to_owned(),
            })
    }

    /// [`Timestamp::parse_iso8601`] for callers that may hold a non-string.
    ///
    /// Returns `Ok(None)` when `value` is not a string.
    pub fn parse_iso8601_value(value: &Value) -> Result<Option<Self>, TimestampError> {
        match value {
            Value::String(text) => Self::parse_iso8601(text).map(Some),
            _ => Ok(None),
        }
    }

    /// Coerce a timestamp-like input into a [`Timestamp`].
    ///
    /// Timestamps are copied, native instants wrapped, and strings parsed as
    /// ISO-8601. Unsupported inputs yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::TimestampParser`] when a string is not
    /// valid ISO-8601.
    pub fn import<'a>(source: impl Into<TimeSource<'a>>) -> Result<Option<Self>, TimestampError> {
        match source.into() {
            TimeSource::Timestamp(timestamp) => Ok(Some(timestamp)),
            TimeSource::Time(time) => Ok(Some(Self::from(time))),
            TimeSource::Text(text) => Self::parse_iso8601(text).map(Some).map_err(|e| {
                TimestampError::TimestampParser {
                    input: text.to_owned(),
                    reason: e.to_string(),
                }
            }),
            TimeSource::Unsupported => Ok(None),
        }
    }

    /// Normalize to UTC in place and return `self` for chaining.
    ///
    /// Must not race with readers of the same instance.
    pub fn utc(&mut self) -> &mut Self {
        self.time = self.time.with_timezone(&Utc);
        self
    }

    /// Canonical `YYYY-MM-DDThh:mm:ss.sssZ` rendering.
    pub fn to_iso8601(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Whole seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.time.timestamp()
    }

    /// Microseconds since the Unix epoch.
    pub fn epoch_micros(&self) -> i64 {
        self.time.timestamp_micros()
    }

    /// Microsecond part of the current second (`0..1_000_000`, leap
    /// seconds fold into the last second).
    pub fn usec(&self) -> u32 {
        (self.time.timestamp_subsec_nanos() % NANOS_PER_SECOND) / NANOS_PER_MICRO
    }

    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.time.year()
    }

    /// The underlying `chrono` instant.
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.time
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(time: DateTime<Tz>) -> Self {
        Self {
            time: truncate_to_micros(time.with_timezone(&Utc)),
        }
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.time
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = &self.time;
        let year = time.year();
        if !(0..=9999).contains(&year) {
            // Expanded years carry a sign; let chrono spell them.
            return f.write_str(&self.to_iso8601());
        }

        let nanos = time.timestamp_subsec_nanos();
        let (second, nanos) = if nanos >= NANOS_PER_SECOND {
            (60, nanos % NANOS_PER_SECOND)
        } else {
            (time.second(), nanos)
        };
        let micros = nanos / NANOS_PER_MICRO;

        write!(
            f,
            "{year:04}-{:02}-{:02}T{:02}:{:02}:{second:02}.{:03}Z",
            time.month(),
            time.day(),
            time.hour(),
            time.minute(),
            micros / 1_000,
        )
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Drop everything below microsecond precision.
fn truncate_to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = time.timestamp_subsec_nanos();
    time.with_nanosecond(nanos.saturating_sub(nanos % NANOS_PER_MICRO))
        .unwrap_or(time)
}

/// Dedicated ISO-8601 reader.
mod iso8601 {
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

    /// Byte cursor over the input.
    struct Cursor<'a> {
        bytes: &'a [u8],
        pos: usize,
    }

    impl<'a> Cursor<'a> {
        const fn new(text: &'a str) -> Self {
            Self {
                bytes: text.as_bytes(),
                pos: 0,
            }
        }

        fn peek(&self) -> Option<u8> {
            self.bytes.get(self.pos).copied()
        }

        const fn bump(&mut self) {
            self.pos = self.pos.saturating_add(1);
        }

        fn eat(&mut self, byte: u8) -> bool {
            if self.peek() == Some(byte) {
                self.bump();
                true
            } else {
                false
            }
        }

        fn digit(&mut self) -> Option<u32> {
            let value = self.peek().and_then(|b| char::from(b).to_digit(10))?;
            self.bump();
            Some(value)
        }

        /// Exactly `count` digits as a number.
        fn fixed(&mut self, count: usize, what: &'static str) -> Result<u32, &'static str> {
            let mut value: u32 = 0;
            for _ in 0..count {
                let digit = self.digit().ok_or(what)?;
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(what)?;
            }
            Ok(value)
        }

        const fn is_done(&self) -> bool {
            self.pos >= self.bytes.len()
        }
    }

    /// Parse `text`, returning a static reason on failure.
    pub(super) fn parse(text: &str) -> Result<DateTime<Utc>, &'static str> {
        let mut cursor = Cursor::new(text);

        let year = cursor.fixed(4, "expected a four-digit year")?;
        let mut month = 1;
        let mut day = 1;
        if cursor.eat(b'-') {
            month = cursor.fixed(2, "expected a two-digit month")?;
            if cursor.eat(b'-') {
                day = cursor.fixed(2, "expected a two-digit day")?;
            }
        }

        let (mut hour, mut minute, mut second, mut micros) = (0, 0, 0, 0);
        let mut offset_seconds: i32 = 0;
        if cursor.eat(b'T') {
            hour = cursor.fixed(2, "expected a two-digit hour")?;
            if cursor.eat(b':') {
                minute = cursor.fixed(2, "expected two-digit minutes")?;
                if cursor.eat(b':') {
                    second = cursor.fixed(2, "expected two-digit seconds")?;
                    if cursor.eat(b'.') || cursor.eat(b',') {
                        micros = fraction(&mut cursor)?;
                    }
                }
            }
            offset_seconds = offset(&mut cursor)?;
        }

        if !cursor.is_done() {
            return Err("unexpected trailing characters");
        }

        let year = i32::try_from(year).map_err(|_overflow| "year out of range")?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or("invalid calendar date")?
            .and_hms_micro_opt(hour, minute, second, micros)
            .ok_or("invalid time of day")?;
        let zone = FixedOffset::east_opt(offset_seconds).ok_or("offset out of range")?;

        zone.from_local_datetime(&naive)
            .single()
            .map(|time| time.with_timezone(&Utc))
            .ok_or("instant out of range")
    }

    /// Fraction digits scaled to microseconds; extra digits are truncated.
    fn fraction(cursor: &mut Cursor<'_>) -> Result<u32, &'static str> {
        let mut micros: u32 = 0;
        let mut kept: u32 = 0;
        let mut seen = false;
        while let Some(digit) = cursor.digit() {
            seen = true;
            if kept < 6 {
                micros = micros
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or("fraction overflow")?;
                kept = kept.saturating_add(1);
            }
        }
        if !seen {
            return Err("expected fraction digits");
        }
        while kept < 6 {
            micros = micros.checked_mul(10).ok_or("fraction overflow")?;
            kept = kept.saturating_add(1);
        }
        Ok(micros)
    }

    /// `Z`, `+hh`, `+hhmm`, `+hh:mm`, or nothing (UTC).
    fn offset(cursor: &mut Cursor<'_>) -> Result<i32, &'static str> {
        if cursor.eat(b'Z') {
            return Ok(0);
        }
        let sign: i32 = if cursor.eat(b'+') {
            1
        } else if cursor.eat(b'-') {
            -1
        } else {
            return Ok(0);
        };

        let hours = cursor.fixed(2, "expected two-digit offset hours")?;
        let minutes = if cursor.eat(b':') || cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
            cursor.fixed(2, "expected two-digit offset minutes")?
        } else {
            0
        };
        if hours > 23 || minutes > 59 {
            return Err("offset out of range");
        }

        let total = hours
            .checked_mul(3_600)
            .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
            .and_then(|s| i32::try_from(s).ok())
            .ok_or("offset out of range")?;
        total.checked_mul(sign).ok_or("offset out of range")
    }
}
