//! ISO-8601 recognition and rendering for query parameters.
//!
//! Dates come in extended form (`YYYY-MM-DD`, `YYYY-MM`, `YYYY-DDD`,
//! `YYYY-Www`, `YYYY-Www-D`) or basic form (`YYYYMMDD`, `YYYYMM`, `YYYYDDD`,
//! `YYYYWww`, `YYYYWwwD`, `YYYY`). Six-digit signed years are accepted for
//! full calendar dates. A time follows after `T` or a space and uses the
//! same form as the date: `HH[:MM[:SS[.fff]]]` or `HH[MM[SS[.fff]]]`, with
//! `,` also accepted as the fraction separator and `24:00` meaning the end
//! of the day. Month-only, year-only and week-only dates take no time. An
//! optional `Z` or `±HH`, `±HHMM`, `±HH:MM` offset ends the value; values
//! without an offset are read as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc, Weekday};

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format_iso8601(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse `input` as an ISO-8601 date or date-time.
///
/// Returns `None` for anything that is not a well-formed, valid calendar
/// value, so `2024-02-30` is rejected along with free text. Mixing basic and
/// extended form (`2024-01-15T1030`) is rejected too.
pub fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim_start();
    if !s.is_ascii() {
        return None;
    }

    let (date_part, time_part) = match s.find(|c: char| c == 'T' || c == ' ') {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };

    let date = parse_date(date_part)?;
    let Some(time_part) = time_part else {
        return Some(date.day.and_time(NaiveTime::MIN).and_utc());
    };
    if !date.takes_time {
        return None;
    }

    let (clock, offset_seconds) = split_offset(time_part)?;
    let (time, end_of_day) = parse_time(clock, date.form)?;
    let day = if end_of_day { date.day.succ_opt()? } else { date.day };
    Some(day.and_time(time).and_utc() - Duration::seconds(offset_seconds))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Basic,
    Extended,
}

struct DatePart {
    day: NaiveDate,
    form: Form,
    takes_time: bool,
}

impl DatePart {
    fn new(day: NaiveDate, form: Form, takes_time: bool) -> Self {
        Self {
            day,
            form,
            takes_time,
        }
    }
}

fn parse_date(s: &str) -> Option<DatePart> {
    if let Some(sign @ (b'+' | b'-')) = s.bytes().next() {
        return parse_expanded_date(sign == b'-', &s[1..]);
    }
    if s.len() < 4 {
        return None;
    }
    let year = digits(&s[..4])? as i32;
    match s[4..].strip_prefix('-') {
        Some(rest) => parse_extended_date(year, rest),
        None => parse_basic_date(year, &s[4..]),
    }
}

/// `±YYYYYY-MM-DD` or `±YYYYYYMMDD`.
fn parse_expanded_date(negative: bool, s: &str) -> Option<DatePart> {
    if s.len() < 6 {
        return None;
    }
    let magnitude = digits(&s[..6])? as i32;
    let year = if negative { -magnitude } else { magnitude };
    let rest = &s[6..];
    let (month, day, form) = match rest.len() {
        6 if rest.as_bytes()[0] == b'-' && rest.as_bytes()[3] == b'-' => {
            (&rest[1..3], &rest[4..], Form::Extended)
        }
        4 => (&rest[..2], &rest[2..], Form::Basic),
        _ => return None,
    };
    let day = NaiveDate::from_ymd_opt(year, two_digits(month)?, two_digits(day)?)?;
    Some(DatePart::new(day, form, true))
}

fn parse_extended_date(year: i32, rest: &str) -> Option<DatePart> {
    if let Some(week) = rest.strip_prefix('W') {
        return match week.split_once('-') {
            Some((week, day)) if day.len() == 1 => {
                week_date(year, week, Some(day)).map(|d| DatePart::new(d, Form::Extended, true))
            }
            Some(_) => None,
            None => week_date(year, week, None).map(|d| DatePart::new(d, Form::Extended, false)),
        };
    }

    match rest.len() {
        2 => NaiveDate::from_ymd_opt(year, digits(rest)?, 1)
            .map(|d| DatePart::new(d, Form::Extended, false)),
        3 => NaiveDate::from_yo_opt(year, digits(rest)?)
            .map(|d| DatePart::new(d, Form::Extended, true)),
        5 if rest.as_bytes()[2] == b'-' => {
            NaiveDate::from_ymd_opt(year, two_digits(&rest[..2])?, two_digits(&rest[3..])?)
                .map(|d| DatePart::new(d, Form::Extended, true))
        }
        _ => None,
    }
}

fn parse_basic_date(year: i32, rest: &str) -> Option<DatePart> {
    if let Some(week) = rest.strip_prefix('W') {
        return match week.len() {
            2 => week_date(year, week, None).map(|d| DatePart::new(d, Form::Basic, false)),
            3 => week_date(year, &week[..2], Some(&week[2..]))
                .map(|d| DatePart::new(d, Form::Basic, true)),
            _ => None,
        };
    }

    match rest.len() {
        0 => NaiveDate::from_ymd_opt(year, 1, 1).map(|d| DatePart::new(d, Form::Basic, false)),
        2 => NaiveDate::from_ymd_opt(year, digits(rest)?, 1)
            .map(|d| DatePart::new(d, Form::Basic, false)),
        3 => NaiveDate::from_yo_opt(year, digits(rest)?).map(|d| DatePart::new(d, Form::Basic, true)),
        4 => NaiveDate::from_ymd_opt(year, digits(&rest[..2])?, digits(&rest[2..])?)
            .map(|d| DatePart::new(d, Form::Basic, true)),
        _ => None,
    }
}

fn week_date(year: i32, week: &str, day: Option<&str>) -> Option<NaiveDate> {
    let weekday = match day {
        None => Weekday::Mon,
        Some(day) => weekday_from_iso(digits(day)?)?,
    };
    NaiveDate::from_isoywd_opt(year, two_digits(week)?, weekday)
}

/// Parse a clock value written in `form`. The flag is set for `24:00`, which
/// is midnight at the end of the day.
fn parse_time(s: &str, form: Form) -> Option<(NaiveTime, bool)> {
    let (clock, fraction) = match s.find(|c: char| c == '.' || c == ',') {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };

    let fields: Vec<&str> = match form {
        Form::Extended => clock.split(':').collect(),
        Form::Basic if clock.len() % 2 == 0 => (0..clock.len())
            .step_by(2)
            .map(|at| &clock[at..at + 2])
            .collect(),
        Form::Basic => return None,
    };
    if fields.is_empty() || fields.len() > 3 {
        return None;
    }
    let hour = two_digits(fields[0])?;
    let minute = fields.get(1).map_or(Some(0), |f| two_digits(f))?;
    let second = fields.get(2).map_or(Some(0), |f| two_digits(f))?;

    // A fraction is only valid after full seconds.
    let nanos = match fraction {
        None => 0,
        Some(_) if fields.len() != 3 => return None,
        Some(frac) if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) => return None,
        Some(frac) => {
            let mut padded: String = frac.chars().take(9).collect();
            while padded.len() < 9 {
                padded.push('0');
            }
            padded.parse().ok()?
        }
    };

    if hour == 24 {
        return (minute == 0 && second == 0 && nanos == 0).then_some((NaiveTime::MIN, true));
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).map(|time| (time, false))
}

/// Split a trailing zone designator off the time, returning its offset east
/// of UTC in seconds.
fn split_offset(s: &str) -> Option<(&str, i64)> {
    if let Some(clock) = s.strip_suffix('Z') {
        return Some((clock.trim_end(), 0));
    }

    let Some(at) = s.rfind(|c: char| c == '+' || c == '-') else {
        return Some((s, 0));
    };
    let sign = if s.as_bytes()[at] == b'-' { -1 } else { 1 };
    let zone = s[at + 1..].replace(':', "");
    if !zone.is_ascii() {
        return None;
    }
    let (hours, minutes) = match zone.len() {
        2 => (digits(&zone)?, 0),
        4 => (digits(&zone[..2])?, digits(&zone[2..])?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some((&s[..at], sign * i64::from(hours * 3600 + minutes * 60)))
}

fn weekday_from_iso(day: u32) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 {
        return None;
    }
    digits(s)
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
