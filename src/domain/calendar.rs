//! Calendar-day helpers
//!
//! The harvest window, the cursor and quarantined dates are all plain
//! calendar days rendered as `YYYY-MM-DD`.

use chrono::{Days, NaiveDate};

/// Wire format for every date the harvester reads or writes
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date
///
/// # Examples
///
/// ```
/// use harvester::domain::calendar::{format_date, parse_date};
///
/// let date = parse_date("2025-01-01").unwrap();
/// assert_eq!(format_date(date), "2025-01-01");
/// assert!(parse_date("01/01/2025").is_err());
/// ```
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("Invalid date '{value}' (expected YYYY-MM-DD): {e}"))
}

/// Formats a date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The calendar day after `date`
///
/// Saturates at the last representable day.
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_day_crosses_month_and_year() {
        assert_eq!(
            next_day(parse_date("2024-02-28").unwrap()),
            parse_date("2024-02-29").unwrap()
        );
        assert_eq!(
            next_day(parse_date("2024-12-31").unwrap()),
            parse_date("2025-01-01").unwrap()
        );
    }

    #[test]
    fn test_parse_date_trims_whitespace() {
        assert_eq!(
            parse_date(" 2025-03-04 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
    }

    #[test]
    fn test_parse_date_rejects_datetime() {
        assert!(parse_date("2025-03-04T10:00:00Z").is_err());
        assert!(parse_date("").is_err());
    }
}
