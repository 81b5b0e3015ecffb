use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

/// Layout of stored task dates, e.g. `20240131`.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Upper bound for the `d N` rule.
pub const MAX_INTERVAL_DAYS: u32 = 400;

/// Error type for recurrence computations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NextDateError {
    /// The date is not an 8-digit `YYYYMMDD` calendar date.
    #[error("malformed date '{0}', expected YYYYMMDD")]
    MalformedDate(String),
    /// No repeat rule was given.
    #[error("repeat rule is not specified")]
    MissingRule,
    /// The `d N` rule has a missing, non-numeric or out-of-range interval.
    #[error("invalid day interval in repeat rule '{0}', expected 'd N' with 1 <= N <= 400")]
    InvalidInterval(String),
    /// The rule is neither `y` nor `d N`.
    #[error("unsupported repeat rule '{0}'")]
    UnsupportedRule(String),
    /// Stepping left the representable calendar range.
    #[error("next date is out of the supported calendar range")]
    OutOfRange,
}

/// A parsed repeat rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatRule {
    /// `y`: same month and day, one year later.
    Yearly,
    /// `d N`: every `N` days.
    Days(u32),
}

impl RepeatRule {
    /// Advances `date` by exactly one step of the rule.
    ///
    /// A yearly step from Feb 29 into a non-leap year lands on Mar 1.
    pub fn step(&self, date: NaiveDate) -> Result<NaiveDate, NextDateError> {
        match *self {
            RepeatRule::Yearly => {
                let year = date.year() + 1;
                date.with_year(year)
                    .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
                    .ok_or(NextDateError::OutOfRange)
            }
            RepeatRule::Days(days) => date
                .checked_add_days(Days::new(u64::from(days)))
                .ok_or(NextDateError::OutOfRange),
        }
    }
}

impl FromStr for RepeatRule {
    type Err = NextDateError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        if rule.is_empty() {
            return Err(NextDateError::MissingRule);
        }
        if rule == "y" {
            return Ok(RepeatRule::Yearly);
        }
        match rule.strip_prefix('d') {
            Some(rest) => rest
                .strip_prefix(' ')
                .and_then(|interval| interval.parse::<u32>().ok())
                .filter(|days| (1..=MAX_INTERVAL_DAYS).contains(days))
                .map(RepeatRule::Days)
                .ok_or_else(|| NextDateError::InvalidInterval(rule.to_string())),
            None => Err(NextDateError::UnsupportedRule(rule.to_string())),
        }
    }
}

/// Parses a `YYYYMMDD` string into a calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate, NextDateError> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NextDateError::MalformedDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| NextDateError::MalformedDate(date.to_string()))
}

/// Formats a calendar date as `YYYYMMDD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Returns the first occurrence after `start` that is not before `now`.
///
/// The start date itself is never returned: the rule is applied at least once
/// and then repeatedly while the candidate (taken at midnight) is before `now`.
pub fn next_occurrence(
    now: NaiveDateTime,
    start: NaiveDate,
    rule: RepeatRule,
) -> Result<NaiveDate, NextDateError> {
    let mut candidate = rule.step(start)?;
    while candidate.and_time(NaiveTime::MIN) < now {
        candidate = rule.step(candidate)?;
    }
    Ok(candidate)
}

/// String-level entry point: parses `date` and `repeat`, then formats the
/// computed occurrence as `YYYYMMDD`.
pub fn next_date(now: NaiveDateTime, date: &str, repeat: &str) -> Result<String, NextDateError> {
    let start = parse_date(date)?;
    let rule: RepeatRule = repeat.parse()?;
    next_occurrence(now, start, rule).map(format_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midnight(date: &str) -> NaiveDateTime {
        parse_date(date).unwrap().and_time(NaiveTime::MIN)
    }

    #[test]
    fn can_parse_supported_rules() {
        assert_eq!("y".parse::<RepeatRule>(), Ok(RepeatRule::Yearly));
        assert_eq!("d 1".parse::<RepeatRule>(), Ok(RepeatRule::Days(1)));
        assert_eq!("d 400".parse::<RepeatRule>(), Ok(RepeatRule::Days(400)));
    }

    #[test]
    fn can_reject_invalid_intervals() {
        for rule in ["d 0", "d 401", "d", "d ", "d x", "d -3", "d 7 8", "dd 3"] {
            assert_eq!(
                rule.parse::<RepeatRule>(),
                Err(NextDateError::InvalidInterval(rule.to_string())),
                "rule {:?}",
                rule
            );
        }
    }

    #[test]
    fn can_reject_empty_and_unknown_rules() {
        assert_eq!("".parse::<RepeatRule>(), Err(NextDateError::MissingRule));
        for rule in ["w 1", "m 5", "x", "Y", "yy", " y"] {
            assert_eq!(
                rule.parse::<RepeatRule>(),
                Err(NextDateError::UnsupportedRule(rule.to_string()))
            );
        }
    }

    #[test]
    fn can_reject_malformed_dates() {
        for date in ["", "2024011", "202401011", "2024-01-01", "20241301", "20230229", "abcdefgh"] {
            assert_eq!(
                parse_date(date),
                Err(NextDateError::MalformedDate(date.to_string()))
            );
        }
    }

    #[test]
    fn can_advance_yearly_keeping_month_and_day() {
        let next = next_date(midnight("20240301"), "20240228", "y").unwrap();
        assert_eq!(next, "20250228");
    }

    #[test]
    fn yearly_rule_always_moves_past_start_even_when_start_is_in_future() {
        let next = next_date(midnight("20200101"), "20240601", "y").unwrap();
        assert_eq!(next, "20250601");
    }

    #[test]
    fn yearly_rule_skips_whole_years_until_not_before_now() {
        let next = next_date(midnight("20240115"), "20100115", "y").unwrap();
        assert_eq!(next, "20240115");

        let next = next_date(midnight("20240116"), "20100115", "y").unwrap();
        assert_eq!(next, "20250115");
    }

    #[test]
    fn yearly_rule_rolls_leap_day_forward_into_march() {
        let next = next_date(midnight("20240301"), "20240229", "y").unwrap();
        assert_eq!(next, "20250301");

        let next = next_date(midnight("20280101"), "20240229", "y").unwrap();
        assert_eq!(next, "20280301");
    }

    #[test]
    fn can_advance_by_day_interval() {
        // 0104, 0107, 0110: the first step not before Jan 10 midnight
        let next = next_date(midnight("20240110"), "20240101", "d 3").unwrap();
        assert_eq!(next, "20240110");

        let next = next_date(midnight("20240111"), "20240101", "d 3").unwrap();
        assert_eq!(next, "20240113");
    }

    #[test]
    fn day_rule_returns_smallest_multiple_not_before_now() {
        let start = parse_date("20231215").unwrap();
        let now = midnight("20240220");
        for days in [1u32, 2, 5, 7, 30, 61, 365, 400] {
            let next = next_occurrence(now, start, RepeatRule::Days(days)).unwrap();
            let elapsed = (next - start).num_days();
            assert_eq!(elapsed % i64::from(days), 0, "interval {}", days);
            assert!(elapsed >= i64::from(days));
            assert!(next.and_time(NaiveTime::MIN) >= now);
            let previous = next - Days::new(u64::from(days));
            assert!(previous == start || previous.and_time(NaiveTime::MIN) < now);
        }
    }

    #[test]
    fn day_rule_moves_past_today_when_now_is_later_in_the_day() {
        let now = midnight("20240110") + chrono::Duration::hours(9);
        let next = next_date(now, "20240109", "d 1").unwrap();
        assert_eq!(next, "20240111");
    }

    #[test]
    fn can_cross_month_and_leap_day_boundaries() {
        let next = next_date(midnight("20240201"), "20240228", "d 1").unwrap();
        assert_eq!(next, "20240229");

        let next = next_date(midnight("20230201"), "20230228", "d 1").unwrap();
        assert_eq!(next, "20230301");
    }

    #[test]
    fn can_check_date_before_rule() {
        assert_eq!(
            next_date(midnight("20240101"), "bad", ""),
            Err(NextDateError::MalformedDate("bad".to_string()))
        );
        assert_eq!(
            next_date(midnight("20240101"), "20240101", ""),
            Err(NextDateError::MissingRule)
        );
    }
}
