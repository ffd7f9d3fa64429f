//! Expiration date detection.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// `YYYY-MM-DD`, years 2000-2099.
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(20\d{2})-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])\b").unwrap()
});

/// `DD/MM/YYYY` or `DD-MM-YYYY`, years 2000-2099.
static DMY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(0[1-9]|[12]\d|3[01])[/\-](0[1-9]|1[0-2])[/\-](20\d{2})\b").unwrap()
});

fn first_valid(re: &Regex, text: &str, order: (usize, usize, usize)) -> Option<NaiveDate> {
    let (y, m, d) = order;
    re.captures_iter(text).find_map(|caps| {
        let year = caps.get(y)?.as_str().parse().ok()?;
        let month = caps.get(m)?.as_str().parse().ok()?;
        let day = caps.get(d)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// First calendar-valid ISO date, else first day-first date, else `None`.
///
/// Matches that are not real dates (`2024-02-31`) are skipped.
pub fn find_expiration_date(text: &str) -> Option<NaiveDate> {
    first_valid(&ISO_DATE, text, (1, 2, 3)).or_else(|| first_valid(&DMY_DATE, text, (3, 2, 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_iso_and_dmy_agree() {
        assert_eq!(find_expiration_date("expires 2024-12-31"), date(2024, 12, 31));
        assert_eq!(find_expiration_date("expires 31/12/2024"), date(2024, 12, 31));
        assert_eq!(find_expiration_date("expires 31-12-2024"), date(2024, 12, 31));
    }

    #[test]
    fn test_no_date() {
        assert_eq!(find_expiration_date("no dates in here, 1999-01-01 either"), None);
    }

    #[test]
    fn test_iso_preferred_over_earlier_dmy() {
        assert_eq!(
            find_expiration_date("signed 01/02/2023, valid until 2025-06-30"),
            date(2025, 6, 30)
        );
    }

    #[test]
    fn test_invalid_calendar_date_skipped() {
        assert_eq!(
            find_expiration_date("2024-02-31 then 2024-02-29"),
            date(2024, 2, 29)
        );
        assert_eq!(find_expiration_date("2023-02-29"), None);
    }
}
