//! Natural-language due dates ("next Friday", "in two days", "today at 9pm").

use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use regex::{Captures, Regex};

/// Resolves free text against a reference time.
pub trait DateParser: Send + Sync {
    /// `None` when the text names no recognisable date or time.
    fn parse(&self, text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime>;
}

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";
const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun";
const COUNTS: &str = r"\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|a couple of|couple of|a few|few";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static date pattern")
}

static TIME_HINT: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\d\s*(?:a\.m\.?|p\.m\.?|am\b|pm\b)|(?:^|\D)\d{1,2}:\d{2}|\b(?:noon|midnight|morning|afternoon|evening|tonight|night)\b|\bat\s+\d{1,2}\b|\bin\s+(?:\S+\s+)*?(?:minutes?|mins?|hours?|hrs?)\b",
    )
});

static ISO: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(\d{4})-(\d{2})-(\d{2})(?:[t ](\d{2}):(\d{2})(?::(\d{2}))?)?")
});
static MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(\d{1,2})(?::(\d{2}))?\s*(a\.m\.?|p\.m\.?|am\b|pm\b)")
});
static CLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:^|\D)(\d{1,2}):(\d{2})\b"));
static AT_HOUR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bat\s+(\d{1,2})\b(?:\s*o'?clock)?"));
static NAMED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(noon|midnight|morning|afternoon|evening|tonight|night)\b")
});
static IN_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\bin\s+({COUNTS})\s+(minutes?|mins?|hours?|hrs?|days?|weeks?|months?)\b"
    ))
});
static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b({MONTHS})\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:\s*,?\s*(\d{{4}})\b)?"
    ))
});
static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b\.?(?:\s*,?\s*(\d{{4}})\b)?"
    ))
});
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b"));
static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| compile(&format!(r"\b({WEEKDAYS})\b")));
static END_OF: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bend\s+of\s+(?:the\s+)?(week|month)\b"));

/// Words that may surround a time without naming a date.
const FILLER: &[&str] = &[
    "at", "on", "by", "due", "this", "the", "in", "around", "about", "before", "until", "o'clock",
];

/// True when the text carries an explicit time of day: a meridiem marker,
/// an `H:MM` clock time, a named time of day, `at <hour>`, or an offset in
/// minutes or hours.
pub fn has_time_component(text: &str) -> bool {
    TIME_HINT.is_match(&text.to_lowercase())
}

/// Rule-based English parser over `chrono`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalDateParser;

impl NaturalDateParser {
    pub fn new() -> Self {
        Self
    }
}

impl DateParser for NaturalDateParser {
    fn parse(&self, text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
        let text = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim_matches(|c: char| c == ',' || c == ';' || c == '!');
        if text.is_empty() {
            return None;
        }

        if let Some(at) = parse_iso(text) {
            return Some(at);
        }
        if let Some(at) = parse_clock_offset(text, reference) {
            return Some(at);
        }

        let (time, rest) = match extract_time(text) {
            Some((time, rest)) => (Some(time), rest),
            None => (None, text.to_string()),
        };

        let date = match resolve_date(&rest, reference.date()) {
            Some(date) => date,
            None if time.is_some() && is_filler(&rest) => reference.date(),
            None => return None,
        };

        Some(date.and_time(time.unwrap_or(NaiveTime::MIN)))
    }
}

fn is_filler(text: &str) -> bool {
    text.split_whitespace().all(|word| FILLER.contains(&word))
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    let caps = ISO.captures(text)?;
    let date = NaiveDate::from_ymd_opt(number(&caps, 1)? as i32, number(&caps, 2)?, number(&caps, 3)?)?;
    let time = match caps.get(4) {
        Some(_) => NaiveTime::from_hms_opt(number(&caps, 4)?, number(&caps, 5)?, number(&caps, 6).unwrap_or(0))?,
        None => match extract_time(text) {
            Some((time, _)) => time,
            None => NaiveTime::MIN,
        },
    };
    Some(date.and_time(time))
}

/// "in 20 minutes", "in an hour".
fn parse_clock_offset(text: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let caps = IN_COUNT.captures(text)?;
    let count = count_value(&caps[1])?;
    let unit = &caps[2];
    let offset = if unit.starts_with("min") {
        TimeDelta::try_minutes(count)?
    } else if unit.starts_with('h') {
        TimeDelta::try_hours(count)?
    } else {
        return None;
    };
    reference.checked_add_signed(offset)
}

/// Pull a time of day out of the text, returning it with the remainder.
fn extract_time(text: &str) -> Option<(NaiveTime, String)> {
    for caps in MERIDIEM.captures_iter(text) {
        let hour = number(&caps, 1)?;
        let minute = number(&caps, 2).unwrap_or(0);
        if !(1..=12).contains(&hour) {
            continue;
        }
        let pm = caps[3].starts_with('p');
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            let span = caps.get(0)?;
            return Some((time, cut(text, span.start(), span.end())));
        }
    }

    for caps in CLOCK.captures_iter(text) {
        let (Some(hour), Some(minute)) = (number(&caps, 1), number(&caps, 2)) else {
            continue;
        };
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            let start = caps.get(1)?.start();
            let end = caps.get(2)?.end();
            return Some((time, cut(text, start, end)));
        }
    }

    if let Some(caps) = AT_HOUR.captures(text) {
        let hour = number(&caps, 1)?;
        // Bare "at 5" means the afternoon.
        let hour = if (1..=7).contains(&hour) { hour + 12 } else { hour };
        if let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) {
            let span = caps.get(0)?;
            return Some((time, cut(text, span.start(), span.end())));
        }
    }

    let caps = NAMED_TIME.captures(text)?;
    let hour = match &caps[1] {
        "midnight" => 0,
        "morning" => 9,
        "noon" => 12,
        "afternoon" => 15,
        "evening" => 18,
        _ => 21,
    };
    let span = caps.get(0)?;
    Some((
        NaiveTime::from_hms_opt(hour, 0, 0)?,
        cut(text, span.start(), span.end()),
    ))
}

fn resolve_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = MONTH_DAY.captures(text) {
        if let Some(date) = calendar_date(today, month_number(&caps[1])?, number(&caps, 2)?, caps.get(3)) {
            return Some(date);
        }
    }
    if let Some(caps) = DAY_MONTH.captures(text) {
        if let Some(date) = calendar_date(today, month_number(&caps[2])?, number(&caps, 1)?, caps.get(3)) {
            return Some(date);
        }
    }
    if let Some(caps) = NUMERIC.captures(text) {
        if let Some(date) = calendar_date(today, number(&caps, 1)?, number(&caps, 2)?, caps.get(3)) {
            return Some(date);
        }
    }

    if text.contains("day after tomorrow") {
        return add_days(today, 2);
    }
    if has_word(text, &["tomorrow", "tmrw", "tmr", "tomorow"]) {
        return add_days(today, 1);
    }
    if has_word(text, &["today", "tonight", "now", "asap"]) {
        return Some(today);
    }
    if has_word(text, &["yesterday"]) {
        return add_days(today, -1);
    }
    if text.contains("next week") {
        return add_days(today, 7);
    }
    if text.contains("next month") {
        return today.checked_add_months(Months::new(1));
    }

    if let Some(caps) = END_OF.captures(text) {
        return if &caps[1] == "week" {
            let ahead = (Weekday::Fri.num_days_from_monday() + 7
                - today.weekday().num_days_from_monday())
                % 7;
            add_days(today, i64::from(ahead))
        } else {
            let first = today.with_day(1)?;
            first.checked_add_months(Months::new(1))?.pred_opt()
        };
    }

    if let Some(caps) = IN_COUNT.captures(text) {
        let count = count_value(&caps[1])?;
        let unit = &caps[2];
        if unit.starts_with('d') {
            return today.checked_add_signed(TimeDelta::try_days(count)?);
        }
        if unit.starts_with('w') {
            return today.checked_add_signed(TimeDelta::try_weeks(count)?);
        }
        if unit.starts_with("mon") {
            return today.checked_add_months(Months::new(u32::try_from(count).ok()?));
        }
    }

    let caps = WEEKDAY.captures(text)?;
    let target = weekday_from(&caps[1])?;
    next_weekday(today, target)
}

/// First occurrence of `target` strictly after `today`.
fn next_weekday(today: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    add_days(today, i64::from(ahead))
}

/// `None` instead of a panic when the offset leaves chrono's range.
fn add_days(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    today.checked_add_signed(TimeDelta::try_days(days)?)
}

/// Month/day with an optional year. Yearless dates already past roll into next year.
fn calendar_date(
    today: NaiveDate,
    month: u32,
    day: u32,
    year: Option<regex::Match<'_>>,
) -> Option<NaiveDate> {
    match year {
        Some(year) => {
            let year: i32 = year.as_str().parse().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            NaiveDate::from_ymd_opt(year, month, day)
        }
        None => {
            let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if date < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(date)
            }
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from(name: &str) -> Option<Weekday> {
    let day = match name.get(..3)? {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn count_value(word: &str) -> Option<i64> {
    if let Ok(n) = word.parse::<i64>() {
        return Some(n);
    }
    let n = match word {
        "a" | "an" | "one" => 1,
        "two" | "a couple of" | "couple of" => 2,
        "three" | "a few" | "few" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(n)
}

fn has_word(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| words.contains(&token))
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn cut(text: &str, start: usize, end: usize) -> String {
    format!("{} {}", &text[..start], &text[end..])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Wednesday 2026-10-14, 10:30.
    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn parse(text: &str) -> Option<NaiveDateTime> {
        NaturalDateParser::new().parse(text, reference())
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(parse("today"), Some(at(2026, 10, 14, 0, 0)));
        assert_eq!(parse("Tomorrow"), Some(at(2026, 10, 15, 0, 0)));
        assert_eq!(parse("day after tomorrow"), Some(at(2026, 10, 16, 0, 0)));
        assert_eq!(parse("in two days"), Some(at(2026, 10, 16, 0, 0)));
        assert_eq!(parse("in 2 weeks"), Some(at(2026, 10, 28, 0, 0)));
        assert_eq!(parse("next week"), Some(at(2026, 10, 21, 0, 0)));
        assert_eq!(parse("in a month"), Some(at(2026, 11, 14, 0, 0)));
        assert_eq!(parse("end of week"), Some(at(2026, 10, 16, 0, 0)));
        assert_eq!(parse("end of the month"), Some(at(2026, 10, 31, 0, 0)));
    }

    #[test]
    fn test_weekdays_are_strictly_after_today() {
        assert_eq!(parse("next Friday"), Some(at(2026, 10, 16, 0, 0)));
        assert_eq!(parse("on fri"), Some(at(2026, 10, 16, 0, 0)));
        assert_eq!(parse("Wednesday"), Some(at(2026, 10, 21, 0, 0)));
        assert_eq!(parse("monday"), Some(at(2026, 10, 19, 0, 0)));
    }

    #[test]
    fn test_times_of_day() {
        assert_eq!(parse("tomorrow at 2pm"), Some(at(2026, 10, 15, 14, 0)));
        assert_eq!(parse("today at 9pm"), Some(at(2026, 10, 14, 21, 0)));
        assert_eq!(parse("9:30 p.m."), Some(at(2026, 10, 14, 21, 30)));
        assert_eq!(parse("12am tomorrow"), Some(at(2026, 10, 15, 0, 0)));
        assert_eq!(parse("14:00"), Some(at(2026, 10, 14, 14, 0)));
        assert_eq!(parse("at 5"), Some(at(2026, 10, 14, 17, 0)));
        assert_eq!(parse("noon"), Some(at(2026, 10, 14, 12, 0)));
        assert_eq!(parse("tonight"), Some(at(2026, 10, 14, 21, 0)));
        assert_eq!(parse("tomorrow morning"), Some(at(2026, 10, 15, 9, 0)));
        assert_eq!(parse("friday evening"), Some(at(2026, 10, 16, 18, 0)));
        assert_eq!(parse("in 3 hours"), Some(at(2026, 10, 14, 13, 30)));
        assert_eq!(parse("in 20 minutes"), Some(at(2026, 10, 14, 10, 50)));
    }

    #[test]
    fn test_calendar_dates() {
        assert_eq!(parse("Dec 25th"), Some(at(2026, 12, 25, 0, 0)));
        assert_eq!(parse("June 9"), Some(at(2027, 6, 9, 0, 0)));
        assert_eq!(parse("9 June 2026"), Some(at(2026, 6, 9, 0, 0)));
        assert_eq!(parse("November 3, 2026 at 4:15pm"), Some(at(2026, 11, 3, 16, 15)));
        assert_eq!(parse("11/5"), Some(at(2026, 11, 5, 0, 0)));
        assert_eq!(parse("1/2/27"), Some(at(2027, 1, 2, 0, 0)));
        assert_eq!(parse("2026-11-02"), Some(at(2026, 11, 2, 0, 0)));
        assert_eq!(parse("2026-11-02T08:15"), Some(at(2026, 11, 2, 8, 15)));
        assert_eq!(parse("2026-11-02 at 3pm"), Some(at(2026, 11, 2, 15, 0)));
    }

    #[test]
    fn test_unrecognised_text() {
        assert_eq!(parse("whenever I get a chance"), None);
        assert_eq!(parse("someday at 9pm"), None);
        assert_eq!(parse("February 30"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_oversized_offsets_are_unresolved() {
        assert_eq!(parse("in 100000000 days"), None);
        assert_eq!(parse("in 99999999999 days"), None);
        assert_eq!(parse("in 9999999999999999 minutes"), None);
        assert_eq!(parse("in 9999999999999999 hours"), None);
        assert_eq!(parse("in 99999999999999 weeks"), None);
        assert_eq!(parse("in 99999999999 months"), None);
        assert_eq!(parse("in 99999999999999999999999 days"), None);
    }

    #[test]
    fn test_time_component_detection() {
        for text in [
            "tomorrow at 2pm",
            "9 AM",
            "6 p.m.",
            "14:00",
            "2026-11-02T08:15",
            "noon",
            "this evening",
            "Friday morning",
            "tonight",
            "at 5",
            "in an hour",
        ] {
            assert!(has_time_component(text), "expected time in {:?}", text);
        }

        for text in [
            "tomorrow",
            "next Friday",
            "June 9",
            "2026-11-02",
            "in two days",
            "11/5",
            "Amsterdam trip",
        ] {
            assert!(!has_time_component(text), "expected date only in {:?}", text);
        }
    }
}
