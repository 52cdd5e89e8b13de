//! Extended Date/Time Format (EDTF) checks, levels 0 and 1.
//!
//! Level 0: `1985`, `1985-04`, `1985-04-12`, `1985-04-12T23:20:30[Z|±hh:mm]`
//! and intervals of those (`1964/2008`).
//!
//! Level 1 adds qualification (`1984?`, `2004-06~`, `2004-06-11%`),
//! unspecified digits (`201X`, `20XX`, `2004-XX`, `1985-04-XX`, `1985-XX-XX`),
//! long years (`Y170000002`, `Y-170000002`), seasons (`2001-21`..`2001-24`),
//! negative years (`-1985`) and intervals with open (`..`) or unknown (empty)
//! ends.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<year>-?[0-9X]{4})(?:-(?P<month>[0-9X]{2})(?:-(?P<day>[0-9X]{2}))?)?(?P<qualifier>[?~%])?$")
        .expect("Invalid EDTF date regex")
});

static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{4}$|^\d{2}(?:\dX|XX)$").expect("Invalid EDTF year regex"));

static LONG_YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Y-?[1-9]\d{4,}$").expect("Invalid EDTF long year regex"));

static DATE_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<local>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(?:Z|[+-](?P<oh>\d{2})(?::?(?P<om>\d{2}))?)?$")
        .expect("Invalid EDTF date-time regex")
});

/// Open interval end.
const OPEN: &str = "..";

/// True when `value` is a valid level 0 or level 1 EDTF string.
pub fn is_valid(value: &str) -> bool {
    if let Some((start, end)) = value.split_once('/') {
        return is_interval(start, end);
    }
    is_date_time(value) || LONG_YEAR_REGEX.is_match(value) || parse_date(value).is_some()
}

fn is_interval(start: &str, end: &str) -> bool {
    let bound = |s: &str| -> Option<Option<Date>> {
        match s {
            "" | OPEN => Some(None),
            _ => parse_date(s).filter(|d| !d.is_season()).map(Some),
        }
    };

    match (bound(start), bound(end)) {
        (Some(Some(a)), Some(Some(b))) => a.earliest() <= b.latest(),
        (Some(Some(_)), Some(None)) | (Some(None), Some(Some(_))) => true,
        _ => false,
    }
}

fn is_date_time(value: &str) -> bool {
    let Some(caps) = DATE_TIME_REGEX.captures(value) else {
        return false;
    };
    if NaiveDateTime::parse_from_str(&caps["local"], "%Y-%m-%dT%H:%M:%S").is_err() {
        return false;
    }
    let in_range = |name: &str, max: u32| {
        caps.name(name)
            .map_or(true, |m| m.as_str().parse::<u32>().map_or(false, |v| v <= max))
    };
    in_range("oh", 14) && in_range("om", 59)
}

/// A parsed calendar date at year, month or day precision.
#[derive(Debug, Clone, Copy)]
struct Date {
    /// Lowest and highest year covered; equal unless digits are unspecified.
    years: (i64, i64),
    month: Option<u32>,
    day: Option<u32>,
}

impl Date {
    fn is_season(&self) -> bool {
        self.month.is_some_and(|m| m > 12)
    }

    /// Earliest (year, month, day) covered; unspecified parts widen the range.
    fn earliest(&self) -> (i64, u32, u32) {
        (self.years.0, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }

    fn latest(&self) -> (i64, u32, u32) {
        (self.years.1, self.month.unwrap_or(12), self.day.unwrap_or(31))
    }
}

fn parse_date(value: &str) -> Option<Date> {
    let caps = DATE_REGEX.captures(value)?;
    let year_text = &caps["year"];
    if !YEAR_REGEX.is_match(year_text) {
        return None;
    }
    let year_unspecified = year_text.contains('X');
    let years = (
        year_text.replace('X', "0").parse::<i64>().ok()?,
        year_text.replace('X', "9").parse::<i64>().ok()?,
    );

    let month_text = caps.name("month").map(|m| m.as_str());
    let day_text = caps.name("day").map(|m| m.as_str());

    let month = match month_text {
        None => None,
        Some("XX") => {
            if day_text.is_some_and(|d| d != "XX") {
                return None;
            }
            None
        }
        Some(text) => {
            if year_unspecified {
                return None;
            }
            let month: u32 = text.parse().ok()?;
            let is_month = (1..=12).contains(&month);
            let is_season = (21..=24).contains(&month) && day_text.is_none();
            if !is_month && !is_season {
                return None;
            }
            Some(month)
        }
    };

    let day = match day_text {
        None | Some("XX") => None,
        Some(text) => {
            let day: u32 = text.parse().ok()?;
            NaiveDate::from_ymd_opt(i32::try_from(years.0).ok()?, month?, day)?;
            Some(day)
        }
    };

    Some(Date { years, month, day })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level0_dates() {
        for value in ["1985", "1985-04", "1985-04-12", "2000-02-29", "0000"] {
            assert!(is_valid(value), "{value}");
        }
    }

    #[test]
    fn test_calendar_validity() {
        assert!(!is_valid("1985-13"));
        assert!(!is_valid("1985-00"));
        assert!(!is_valid("1985-02-30"));
        assert!(!is_valid("1900-02-29"));
        assert!(!is_valid("1985-04-31"));
    }

    #[test]
    fn test_date_times() {
        assert!(is_valid("1985-04-12T23:20:30"));
        assert!(is_valid("1985-04-12T23:20:30Z"));
        assert!(is_valid("1985-04-12T23:20:30-04"));
        assert!(is_valid("1985-04-12T23:20:30+04:30"));
        assert!(!is_valid("1985-04-12T25:20:30"));
        assert!(!is_valid("1985-04-12 23:20:30"));
    }

    #[test]
    fn test_level1_qualifiers_and_unspecified() {
        for value in [
            "1984?",
            "2004-06~",
            "2004-06-11%",
            "201X",
            "20XX",
            "2004-XX",
            "1985-04-XX",
            "1985-XX-XX",
        ] {
            assert!(is_valid(value), "{value}");
        }
        assert!(!is_valid("1985-XX-12"));
        assert!(!is_valid("2XXX"));
        assert!(!is_valid("20XX-04"));
        assert!(!is_valid("1984??"));
    }

    #[test]
    fn test_level1_years_and_seasons() {
        assert!(is_valid("Y170000002"));
        assert!(is_valid("Y-170000002"));
        assert!(is_valid("-1985"));
        assert!(is_valid("2001-21"));
        assert!(is_valid("2001-24"));
        assert!(!is_valid("2001-25"));
        assert!(!is_valid("2001-21-01"));
        assert!(!is_valid("Y1985"));
    }

    #[test]
    fn test_intervals() {
        for value in [
            "1964/2008",
            "2004-06/2006-08",
            "2004-02-01/2005-02-08",
            "1985-04-12/..",
            "../1985-04-12",
            "1985-04-12/",
            "/1985",
            "1984~/2004-06",
            "19XX/2004",
            "1950/19XX",
        ] {
            assert!(is_valid(value), "{value}");
        }
        assert!(!is_valid("2008/1964"));
        assert!(!is_valid("../.."));
        assert!(!is_valid("/"));
        assert!(!is_valid("1985/2004/2010"));
        assert!(!is_valid("1985-13/2004"));
        assert!(!is_valid("2004/19XX"));
    }

    #[test]
    fn test_free_text_rejected() {
        for value in ["1/2/2022", "circa 1900", "", "April 1985", "85"] {
            assert!(!is_valid(value), "{value}");
        }
    }
}
