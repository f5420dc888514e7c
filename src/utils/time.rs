use chrono::{DateTime, NaiveDate};

use crate::error::{Error, Result};

/// Accepts a calendar date (`2024-03-01`) or an RFC 3339 timestamp, whose
/// date part is used.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| Error::invalid(format!("{} must be a date (YYYY-MM-DD), got '{}'", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_and_timestamps() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("start_date", "2024-03-01").unwrap(), march);
        assert_eq!(parse_date("start_date", "2024-03-01T10:00:00Z").unwrap(), march);
        assert!(matches!(
            parse_date("start_date", "March 1st"),
            Err(Error::InvalidInput(_))
        ));
    }
}
