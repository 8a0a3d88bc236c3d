//! Ordering primitives shared by the sort engine.
//!
//! Text compares at "base" strength: case and accents are ignored, but `ñ`
//! stays a letter of its own between `n` and `o`, as Spanish collation has it.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use unicode_normalization::char::{decompose_canonical, is_combining_mark};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Lower-cases text, treating `None` as the empty string.
pub fn normalize_text(s: Option<&str>) -> String {
    s.unwrap_or_default().to_lowercase()
}

// One weight per character; `ñ` sorts right after `n`.
fn collation_key(s: &str) -> Vec<u32> {
    let mut key = Vec::with_capacity(s.len());
    for c in s.to_lowercase().chars() {
        if c == 'ñ' {
            key.push('n' as u32 * 2 + 1);
            continue;
        }
        decompose_canonical(c, |d| {
            if !is_combining_mark(d) {
                key.push(d as u32 * 2);
            }
        });
    }
    key
}

/// Case- and accent-insensitive comparison.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b))
}

/// Parses a date-like string. Values without an offset are read as UTC.
pub fn parse_date(v: &str) -> Option<DateTime<FixedOffset>> {
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(v, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().fixed_offset())
}

/// Milliseconds since the epoch. Anything unparseable yields 0, so broken
/// dates sort as the oldest entries.
pub fn to_epoch_millis(v: &str) -> i64 {
    parse_date(v).map(|dt| dt.timestamp_millis()).unwrap_or(0)
}

/// Compares two numeric fields, a missing value counts as 0.
pub fn compare_numeric(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| v.is_finite()).unwrap_or(0.0);
    let b = b.filter(|v| v.is_finite()).unwrap_or(0.0);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Formats a date for display as `dd/mm/yyyy, HH:MM` in the offset it was
/// written with; unparseable input gives "".
pub fn format_date(v: &str) -> String {
    parse_date(v)
        .map(|dt| dt.format("%d/%m/%Y, %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_ignores_case_and_accents() {
        assert_eq!(compare_text("Álvaro", "alvaro"), Ordering::Equal);
        assert_eq!(compare_text("josé", "JOSE"), Ordering::Equal);
        assert_eq!(compare_text("Ana", "beatriz"), Ordering::Less);
    }

    #[test]
    fn enie_sorts_between_n_and_o() {
        assert_eq!(compare_text("ñandú", "nube"), Ordering::Greater);
        assert_eq!(compare_text("ñandú", "oso"), Ordering::Less);
        assert_eq!(compare_text("Ñandú", "ñandu"), Ordering::Equal);
    }

    #[test]
    fn empty_text_sorts_first() {
        assert_eq!(compare_text("", "a"), Ordering::Less);
        assert_eq!(normalize_text(None), "");
        assert_eq!(normalize_text(Some("MaRía")), "maría");
    }

    #[test]
    fn epoch_millis_accepts_iso_variants() {
        assert_eq!(to_epoch_millis("1970-01-02"), 86_400_000);
        assert_eq!(to_epoch_millis("1970-01-01T00:00:01Z"), 1_000);
        assert_eq!(to_epoch_millis("1970-01-01T00:00:01.5"), 1_500);
        assert_eq!(to_epoch_millis("1970-01-01 00:01"), 60_000);
        assert!(to_epoch_millis("2024-02-10") > to_epoch_millis("2024-01-05"));
    }

    #[test]
    fn epoch_millis_never_fails() {
        assert_eq!(to_epoch_millis(""), 0);
        assert_eq!(to_epoch_millis("mañana"), 0);
        assert_eq!(to_epoch_millis("2024-13-45"), 0);
    }

    #[test]
    fn missing_numbers_are_zero() {
        assert_eq!(compare_numeric(None, Some(0.0)), Ordering::Equal);
        assert_eq!(compare_numeric(None, Some(5.0)), Ordering::Less);
        assert_eq!(compare_numeric(Some(f64::NAN), Some(-1.0)), Ordering::Greater);
    }

    #[test]
    fn dates_format_for_display() {
        assert_eq!(format_date("2024-01-05"), "05/01/2024, 00:00");
        assert_eq!(format_date("2024-02-10T14:30:00Z"), "10/02/2024, 14:30");
        assert_eq!(format_date("n/a"), "");
    }

    #[test]
    fn epoch_start_is_a_real_date() {
        assert_eq!(format_date("1970-01-01T00:00:00Z"), "01/01/1970, 00:00");
        assert_eq!(format_date("1970-01-01"), "01/01/1970, 00:00");
        assert_eq!(to_epoch_millis("1970-01-01T00:00:00Z"), 0);
    }

    #[test]
    fn offset_dates_show_their_own_wall_time() {
        assert_eq!(format_date("2024-02-10T14:30:00-05:00"), "10/02/2024, 14:30");
        assert!(to_epoch_millis("2024-02-10T14:30:00-05:00") > to_epoch_millis("2024-02-10T14:30:00Z"));
    }
}
