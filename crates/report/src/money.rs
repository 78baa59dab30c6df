// Cell value parsing: amounts in kopecks and timestamps.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::table::Cell;

/// Text formats seen in OFD exports, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d"];

/// Largest accepted amount magnitude, in kopecks (100 billion rubles).
pub const MAX_KOPECKS: i64 = 10_000_000_000_000;

/// Last representable Excel serial: 9999-12-31 23:59:59.
pub const MAX_EXCEL_SERIAL: f64 = 2_958_465.999_99;

/// Convert an amount cell to kopecks. Blank cells are zero.
///
/// Text accepts `,` or `.` as decimal separator and spaces (including
/// non-breaking ones) as thousands grouping: `"1 234,50"` → 123450.
pub fn parse_kopecks(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Empty => Some(0),
        Cell::Number(n) => to_kopecks(*n),
        Cell::Text(s) => parse_kopecks_str(s),
        Cell::DateTime(_) => None,
    }
}

fn parse_kopecks_str(s: &str) -> Option<i64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    to_kopecks(cleaned.parse().ok()?)
}

/// Rubles to kopecks; `None` for non-finite or out-of-range values.
fn to_kopecks(rubles: f64) -> Option<i64> {
    let kopecks = (rubles * 100.0).round();
    if !kopecks.is_finite() || kopecks.abs() > MAX_KOPECKS as f64 {
        return None;
    }
    Some(kopecks as i64)
}

/// Excel serial day number (1900 date system) to a timestamp.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    // Round to whole seconds; serials carry float noise in the last digits.
    let seconds = millis.checked_add(500)?.div_euclid(1000);
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Timestamp to Excel serial day number (1900 date system).
pub fn to_excel_serial(dt: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let seconds = (*dt - epoch).num_seconds();
    seconds as f64 / 86_400.0
}

pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(n) => from_excel_serial(*n),
        Cell::Text(s) => parse_timestamp_str(s),
        Cell::Empty => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    // Drop fractional seconds: "2024-01-15 10:30:00.000"
    let s = match s.rfind('.') {
        Some(pos) if s.len() - pos <= 7 && s[pos + 1..].chars().all(|c| c.is_ascii_digit()) && s[..pos].contains(':') => &s[..pos],
        _ => s,
    };
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
