//! Joda-style date patterns for `%{+pattern}` tokens.
//!
//! Runs of the same letter form one field; the run length picks the width
//! for numbers and the short or long form for text. Text inside single
//! quotes is copied as-is, and `''` yields one quote. Any other character
//! that is not an ASCII letter passes through unchanged. Instants are
//! always rendered in UTC with millisecond precision.
//!
//! | Letter | Field                 | Example (`2023-11-14T22:13:20.123Z`) |
//! |--------|-----------------------|--------------------------------------|
//! | `G`    | era                   | `AD`                                 |
//! | `C`    | century of era        | `20`                                 |
//! | `y`/`Y`| year (`yy` two-digit) | `2023`, `23`                         |
//! | `x`    | ISO week-year         | `2023`                               |
//! | `w`    | ISO week of week-year | `46`                                 |
//! | `e`    | day of week (Mon = 1) | `2`                                  |
//! | `E`    | day of week name      | `Tue`, `Tuesday` (4+)                |
//! | `D`    | day of year           | `318`                                |
//! | `M`    | month                 | `11`, `Nov` (3), `November` (4+)     |
//! | `d`    | day of month          | `14`                                 |
//! | `a`    | half-day              | `PM`                                 |
//! | `K`    | hour of half-day 0-11 | `10`                                 |
//! | `h`    | hour of half-day 1-12 | `10`                                 |
//! | `H`    | hour of day 0-23      | `22`                                 |
//! | `k`    | hour of day 1-24      | `22`                                 |
//! | `m`    | minute                | `13`                                 |
//! | `s`    | second                | `20`                                 |
//! | `S`    | fraction of second    | `123`                                |
//! | `Z`    | offset                | `+0000`, `+00:00` (2), `UTC` (3+)    |
//! | `z`    | zone name             | `UTC`, `Coordinated Universal Time`  |

use std::iter::Peekable;
use std::str::Chars;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::EventError;
use crate::timestamp::Timestamp;

/// Render `timestamp` in UTC using a Joda-style `pattern`.
///
/// # Errors
///
/// Returns [`EventError::DatePattern`] if the pattern uses a letter that
/// is not a known field.
pub fn format(pattern: &str, timestamp: Timestamp) -> Result<String, EventError> {
    let time = timestamp.as_datetime();
    let mut out = String::with_capacity(pattern.len().saturating_mul(2));
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            quoted(&mut chars, &mut out);
        } else if c.is_ascii_alphabetic() {
            let mut count: usize = 1;
            while chars.next_if_eq(&c).is_some() {
                count = count.saturating_add(1);
            }
            if !field(c, count, &time, &mut out) {
                return Err(EventError::DatePattern {
                    pattern: pattern.to_owned(),
                    reason: format!("illegal pattern letter '{c}'"),
                });
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Copy quoted text up to the closing quote (or the end of the pattern).
fn quoted(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    if chars.next_if_eq(&'\'').is_some() {
        out.push('\'');
        return;
    }
    while let Some(c) = chars.next() {
        if c != '\'' {
            out.push(c);
        } else if chars.next_if_eq(&'\'').is_some() {
            out.push('\'');
        } else {
            return;
        }
    }
}

/// Append one field; `false` if `letter` is not a field.
fn field(letter: char, count: usize, time: &DateTime<Utc>, out: &mut String) -> bool {
    match letter {
        'G' => out.push_str(if time.year() > 0 { "AD" } else { "BC" }),
        'C' => number(out, i64::from(time.year().div_euclid(100)), count),
        'y' | 'Y' => year(out, time.year(), count),
        'x' => year(out, time.iso_week().year(), count),
        'w' => number(out, i64::from(time.iso_week().week()), count),
        'e' => number(out, i64::from(time.weekday().number_from_monday()), count),
        'E' => text(out, time, if count >= 4 { "%A" } else { "%a" }),
        'D' => number(out, i64::from(time.ordinal()), count),
        'M' => match count {
            1 | 2 => number(out, i64::from(time.month()), count),
            3 => text(out, time, "%b"),
            _ => text(out, time, "%B"),
        },
        'd' => number(out, i64::from(time.day()), count),
        'a' => text(out, time, "%p"),
        'K' => number(out, i64::from(time.hour().rem_euclid(12)), count),
        'h' => number(out, i64::from(time.hour12().1), count),
        'H' => number(out, i64::from(time.hour()), count),
        'k' => {
            let hour = if time.hour() == 0 { 24 } else { time.hour() };
            number(out, i64::from(hour), count);
        }
        'm' => number(out, i64::from(time.minute()), count),
        's' => number(out, i64::from(time.second().min(59)), count),
        'S' => fraction(out, time.timestamp_subsec_millis().min(999), count),
        'Z' => out.push_str(match count {
            1 => "+0000",
            2 => "+00:00",
            _ => "UTC",
        }),
        'z' => out.push_str(if count >= 4 {
            "Coordinated Universal Time"
        } else {
            "UTC"
        }),
        _ => return false,
    }
    true
}

fn number(out: &mut String, n: i64, width: usize) {
    out.push_str(&format!("{n:0width$}"));
}

/// `yy` is the two-digit year; any other run is the full year.
fn year(out: &mut String, year: i32, count: usize) {
    if count == 2 {
        number(out, i64::from(year.rem_euclid(100)), 2);
    } else {
        number(out, i64::from(year), count);
    }
}

fn text(out: &mut String, time: &DateTime<Utc>, spec: &str) {
    out.push_str(&time.format(spec).to_string());
}

/// Milliseconds as a fraction: truncated below three digits, zero-padded above.
fn fraction(out: &mut String, millis: u32, count: usize) {
    let digits = format!("{millis:03}");
    out.extend(digits.chars().chain(std::iter::repeat('0')).take(count));
}
