use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::{Error, Result, SalesError, ValidationError};

/// A reporting month (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ym {
    pub year: i32,
    pub month: u32,
}

impl Ym {
    pub fn parse(s: &str) -> Result<Self> {
        let (year_str, month_str) = s
            .split_once('-')
            .ok_or_else(|| SalesError::InvalidMonth(format!("expected YYYY-MM, got '{}'", s)))?;
        let year: i32 = year_str
            .parse()
            .map_err(|_| SalesError::InvalidMonth(format!("bad year in '{}'", s)))?;
        let month: u32 = month_str
            .parse()
            .map_err(|_| SalesError::InvalidMonth(format!("bad month in '{}'", s)))?;
        if !(1..=12).contains(&month) {
            return Err(SalesError::InvalidMonth(format!("month out of range in '{}'", s)).into());
        }
        Ok(Ym { year, month })
    }

    fn next(self) -> Ym {
        if self.month == 12 {
            Ym {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Ym {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// UTC half-open window [first 00:00 tz, first-of-next 00:00 tz) for this month.
    pub fn utc_window(self, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((month_start_utc(self, tz)?, month_start_utc(self.next(), tz)?))
    }
}

impl std::fmt::Display for Ym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn month_start_utc(ym: Ym, tz: Tz) -> Result<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(ym.year, ym.month, 1).ok_or_else(|| {
        Error::Validation(ValidationError::InvalidInput(format!(
            "invalid month {}",
            ym
        )))
    })?;
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let local = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        Error::Validation(ValidationError::InvalidInput(format!(
            "month start {} does not exist in {}",
            naive, tz
        )))
    })?;
    Ok(local.with_timezone(&Utc))
}

/// Parses a sales timestamp into UTC.
///
/// Offset-carrying forms (RFC3339) are converted directly; naive forms are
/// interpreted in the supplied file timezone. Date-only rows land on midnight.
pub fn parse_timestamp(raw: &str, file_tz: Tz) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%b %e, %Y %I:%M:%S %p",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, file_tz);
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return localize(date.and_hms_opt(0, 0, 0)?, file_tz);
        }
    }

    None
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    #[test]
    fn test_ym_parse() {
        let ym = Ym::parse("2025-01").unwrap();
        assert_eq!(ym.year, 2025);
        assert_eq!(ym.month, 1);
        assert_eq!(ym.to_string(), "2025-01");

        assert!(Ym::parse("2025-13").is_err());
        assert!(Ym::parse("202501").is_err());
        assert!(Ym::parse("2025-xx").is_err());
    }

    #[test]
    fn test_utc_window_utc() {
        let ym = Ym::parse("2025-01").unwrap();
        let (start, end) = ym.utc_window(UTC).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_utc_window_offset_tz() {
        let ym = Ym::parse("2025-06").unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        let (start, end) = ym.utc_window(tz).unwrap();
        // EDT is UTC-4 in June
        assert_eq!(start.to_rfc3339(), "2025-06-01T04:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-07-01T04:00:00+00:00");
    }

    #[test]
    fn test_year_rollover() {
        let ym = Ym::parse("2024-12").unwrap();
        let (_, end) = ym.utc_window(UTC).unwrap();
        assert_eq!(end.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2025-01-10T08:30:00+00:00", UTC)
                .unwrap()
                .to_rfc3339(),
            "2025-01-10T08:30:00+00:00"
        );
        assert_eq!(
            parse_timestamp("2025-01-10 08:30:00", UTC)
                .unwrap()
                .to_rfc3339(),
            "2025-01-10T08:30:00+00:00"
        );
        assert_eq!(
            parse_timestamp("2025-01-10", UTC).unwrap().to_rfc3339(),
            "2025-01-10T00:00:00+00:00"
        );
        assert!(parse_timestamp("not a date", UTC).is_none());
        assert!(parse_timestamp("", UTC).is_none());
    }

    #[test]
    fn test_parse_timestamp_naive_in_tz() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        // PST is UTC-8 in January
        assert_eq!(
            parse_timestamp("2025-01-10 08:00:00", tz)
                .unwrap()
                .to_rfc3339(),
            "2025-01-10T16:00:00+00:00"
        );
    }
}
