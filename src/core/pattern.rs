//! Purpose: Compile letter-style date patterns (`dd-MMM-yyyy HH:mm:ss`) into `time` formats.
//! Exports: `DatePattern`, `iso_date`, `iso_time`, `iso_timestamp`.
//! Role: Lets callers keep familiar pattern strings while rendering goes through `time`.
//! Invariants: Patterns are compiled once; unknown letters are rejected at compile time.
//! Invariants: Text inside single quotes and any non-letter character is literal.

use std::fmt;
use std::str::FromStr;

use time::format_description::{self, OwnedFormatItem};
use time::{Date, PrimitiveDateTime, Time};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone)]
pub struct DatePattern {
    pattern: String,
    items: OwnedFormatItem,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self, Error> {
        let description = translate(pattern)?;
        let items = format_description::parse_owned::<1>(&description).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid date pattern {pattern:?}"))
                .with_source(err)
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            items,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Dates render as midnight, so time letters in the pattern produce zeros.
    pub fn format_date(&self, date: Date) -> Result<String, Error> {
        self.format_datetime(date.midnight())
    }

    pub fn format_datetime(&self, value: PrimitiveDateTime) -> Result<String, Error> {
        value.format(&self.items).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("failed to format with pattern {:?}", self.pattern))
                .with_source(err)
        })
    }
}

impl fmt::Debug for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DatePattern").field(&self.pattern).finish()
    }
}

impl FromStr for DatePattern {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Self::compile(pattern)
    }
}

fn translate(pattern: &str) -> Result<String, Error> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        if ch == '\'' {
            idx += 1;
            if chars.get(idx) == Some(&'\'') {
                out.push('\'');
                idx += 1;
                continue;
            }
            loop {
                match chars.get(idx) {
                    None => {
                        return Err(Error::new(ErrorKind::Usage)
                            .with_message(format!("unterminated quote in date pattern {pattern:?}")));
                    }
                    Some('\'') if chars.get(idx + 1) == Some(&'\'') => {
                        out.push('\'');
                        idx += 2;
                    }
                    Some('\'') => {
                        idx += 1;
                        break;
                    }
                    Some(literal) => {
                        push_literal(&mut out, *literal);
                        idx += 1;
                    }
                }
            }
            continue;
        }
        if !ch.is_ascii_alphabetic() {
            push_literal(&mut out, ch);
            idx += 1;
            continue;
        }
        let run = chars[idx..].iter().take_while(|c| **c == ch).count();
        out.push_str(&component(ch, run).ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported letter {ch:?} in date pattern {pattern:?}"))
                .with_hint("Supported letters: y M d H h m s S a E; quote literal text with '.")
        })?);
        idx += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '[' {
        out.push_str("[[");
    } else {
        out.push(ch);
    }
}

fn component(letter: char, run: usize) -> Option<String> {
    let padded = |name: &str| {
        if run == 1 {
            format!("[{name} padding:none]")
        } else {
            format!("[{name}]")
        }
    };
    let item = match letter {
        'y' if run == 2 => "[year repr:last_two]".to_string(),
        'y' => "[year]".to_string(),
        'M' if run >= 4 => "[month repr:long]".to_string(),
        'M' if run == 3 => "[month repr:short]".to_string(),
        'M' => padded("month"),
        'd' => padded("day"),
        'H' => padded("hour"),
        'h' if run == 1 => "[hour repr:12 padding:none]".to_string(),
        'h' => "[hour repr:12]".to_string(),
        'm' => padded("minute"),
        's' => padded("second"),
        'S' => format!("[subsecond digits:{}]", run.min(9)),
        'a' => "[period]".to_string(),
        'E' if run >= 4 => "[weekday repr:long]".to_string(),
        'E' => "[weekday repr:short]".to_string(),
        _ => return None,
    };
    Some(item)
}

/// `YYYY-MM-DD`.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// `HH:MM:SS`; sub-second precision is dropped.
pub fn iso_time(time: Time) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        time.hour(),
        time.minute(),
        time.second()
    )
}

/// `YYYY-MM-DD HH:MM:SS`, with milliseconds appended when non-zero.
pub fn iso_timestamp(value: PrimitiveDateTime) -> String {
    let millis = value.millisecond();
    if millis == 0 {
        return format!("{} {}", iso_date(value.date()), iso_time(value.time()));
    }
    format!(
        "{} {}.{millis:03}",
        iso_date(value.date()),
        iso_time(value.time())
    )
}

#[cfg(test)]
mod tests {
    use super::{DatePattern, iso_date, iso_time, iso_timestamp};
    use crate::core::error::ErrorKind;
    use time::{Date, Month, PrimitiveDateTime, Time};

    fn sample() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2024, Month::March, 5).unwrap();
        let time = Time::from_hms_milli(14, 7, 9, 250).unwrap();
        PrimitiveDateTime::new(date, time)
    }

    #[test]
    fn default_date_pattern_renders_short_month() {
        let pattern = DatePattern::compile("dd-MMM-yyyy").unwrap();
        assert_eq!(pattern.format_date(sample().date()).unwrap(), "05-Mar-2024");
    }

    #[test]
    fn timestamp_pattern_renders_time_of_day() {
        let pattern = DatePattern::compile("dd-MMM-yyyy HH:mm:ss").unwrap();
        assert_eq!(pattern.format_datetime(sample()).unwrap(), "05-Mar-2024 14:07:09");
        let millis = DatePattern::compile("yyyy-MM-dd'T'HH:mm:ss.SSS").unwrap();
        assert_eq!(millis.format_datetime(sample()).unwrap(), "2024-03-05T14:07:09.250");
    }

    #[test]
    fn twelve_hour_clock_and_names() {
        let pattern = DatePattern::compile("EEE, d MMMM yy h:mm a").unwrap();
        assert_eq!(
            pattern.format_datetime(sample()).unwrap(),
            "Tue, 5 March 24 2:07 PM"
        );
    }

    #[test]
    fn quoted_text_and_brackets_are_literal() {
        let pattern = DatePattern::compile("'day' d [yyyy] 'o''clock'").unwrap();
        assert_eq!(
            pattern.format_date(sample().date()).unwrap(),
            "day 5 [2024] o'clock"
        );
    }

    #[test]
    fn dates_render_time_letters_as_midnight() {
        let pattern = DatePattern::compile("yyyy-MM-dd HH:mm").unwrap();
        assert_eq!(pattern.format_date(sample().date()).unwrap(), "2024-03-05 00:00");
    }

    #[test]
    fn unknown_letters_are_rejected() {
        let err = DatePattern::compile("yyyy-QQ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(DatePattern::compile("'open").is_err());
    }

    #[test]
    fn iso_helpers_are_zero_padded() {
        let value = sample();
        assert_eq!(iso_date(value.date()), "2024-03-05");
        assert_eq!(iso_time(value.time()), "14:07:09");
        assert_eq!(iso_timestamp(value), "2024-03-05 14:07:09.250");
    }
}
