//! Date formatting with the PHP style codes Django uses, and the
//! "N units, M units" durations of `timesince` / `timeuntil`.
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use std::collections::BTreeMap;

/// The named formats known by default.
pub fn default_formats() -> BTreeMap<String, String> {
    [
        ("DATE_FORMAT", "N j, Y"),
        ("DATETIME_FORMAT", "N j, Y, P"),
        ("MONTH_DAY_FORMAT", "F j"),
        ("SHORT_DATE_FORMAT", "m/d/Y"),
        ("SHORT_DATETIME_FORMAT", "m/d/Y P"),
        ("TIME_FORMAT", "h:i:s A"),
        ("YEAR_MONTH_FORMAT", "F Y"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Format `datetime` according to `format`, which is either the name
/// of one of `formats` or a string of format codes.
///
/// Characters that are not format codes are copied as is.  Codes that
/// need time zone or locale data (`B`, `I`, `L`, `O`, `S`, `t`, `T`,
/// `W`, `Z`) produce nothing.
pub fn format_datetime(
    formats: &BTreeMap<String, String>,
    format: &str,
    datetime: &NaiveDateTime,
) -> String {
    let format = formats.get(format).map_or(format, String::as_str);
    let with = |spec: &str| datetime.format(spec).to_string();

    let (pm, hour12) = datetime.hour12();
    let minute = datetime.minute();
    let a = if pm { "p.m." } else { "a.m." };
    let f = if minute != 0 {
        format!("{hour12}:{minute:02}")
    } else {
        hour12.to_string()
    };

    let mut out = String::with_capacity(format.len() * 2);
    for c in format.chars() {
        match c {
            'a' => out.push_str(a),
            'A' => out.push_str(if pm { "PM" } else { "AM" }),
            'b' => out.push_str(&with("%b").to_lowercase()),
            'c' => out.push_str(&with("%Y-%m-%dT%H:%M:%S")),
            'd' => out.push_str(&with("%d")),
            'D' => out.push_str(&with("%a")),
            'E' | 'F' => out.push_str(&with("%B")),
            'f' => out.push_str(&f),
            'g' => out.push_str(&hour12.to_string()),
            'G' => out.push_str(&datetime.hour().to_string()),
            'h' => out.push_str(&with("%I")),
            'H' => out.push_str(&with("%H")),
            'i' => out.push_str(&with("%M")),
            'j' => out.push_str(&datetime.day().to_string()),
            'l' => out.push_str(&with("%A")),
            'm' => out.push_str(&with("%m")),
            'M' | 'N' => out.push_str(&with("%b")),
            'n' => out.push_str(&datetime.month().to_string()),
            'o' => out.push_str(&datetime.iso_week().year().to_string()),
            'P' => match (datetime.hour(), minute) {
                (0, 0) => out.push_str("midnight"),
                (12, 0) => out.push_str("noon"),
                _ => {
                    out.push_str(&f);
                    out.push(' ');
                    out.push_str(a);
                }
            },
            'r' => out.push_str(&with("%a, %d %b %Y %H:%M:%S")),
            's' => out.push_str(&with("%S")),
            'u' => out.push_str(&format!("{:06}", datetime.nanosecond() / 1000)),
            'U' => out.push_str(&datetime.and_utc().timestamp().to_string()),
            'w' => out.push_str(&datetime.weekday().num_days_from_sunday().to_string()),
            'y' => out.push_str(&with("%y")),
            'Y' => out.push_str(&datetime.year().to_string()),
            'z' => out.push_str(&datetime.ordinal().to_string()),
            'B' | 'e' | 'I' | 'L' | 'O' | 'S' | 't' | 'T' | 'W' | 'Z' => (),
            c => out.push(c),
        }
    }
    out
}

const UNITS: [(i64, &str); 6] = [
    (60 * 60 * 24 * 365, "year"),
    (60 * 60 * 24 * 30, "month"),
    (60 * 60 * 24 * 7, "week"),
    (60 * 60 * 24, "day"),
    (60 * 60, "hour"),
    (60, "minute"),
];

/// Describe `duration` by its largest nonzero unit and, when nonzero,
/// the next smaller one, e.g. `1&nbsp;day, 12&nbsp;hours`.
///
/// Negative durations, and durations under a minute, are
/// `0&nbsp;minutes`.
pub fn format_duration(duration: TimeDelta, nonbreaking_space: &str) -> String {
    let unit = |n: i64, name: &str| {
        let plural = if n == 1 { "" } else { "s" };
        format!("{n}{nonbreaking_space}{name}{plural}")
    };
    let total = duration.num_seconds();
    if total < 0 {
        return unit(0, "minute");
    }
    let Some(i) = UNITS.iter().position(|(seconds, _)| total / seconds > 0) else {
        return unit(0, "minute");
    };
    let (seconds, name) = UNITS[i];
    let count = total / seconds;
    let mut result = unit(count, name);
    if let Some((next, next_name)) = UNITS.get(i + 1) {
        let rest = (total - seconds * count) / next;
        if rest > 0 {
            result.push_str(", ");
            result.push_str(&unit(rest, next_name));
        }
    }
    result
}
