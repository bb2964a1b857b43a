//! Recurrence resolver.
//!
//! # Responsibility
//! - Compute the next (and previous) scheduled date of an occasion relative to
//!   a caller-provided day.
//!
//! # Invariants
//! - Pure: no I/O, no clock reads.
//! - Feb 29 resolves to Feb 28 in non-leap years.
//! - Yearly occasions only use the stored month/day; the stored year is
//!   informational (birth year, wedding year).

use crate::model::date::PartialDate;
use crate::model::occasion::{Occasion, OccasionId, Recurrence};
use chrono::{Datelike, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stored occasion date is not a calendar-valid combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateError {
    pub occasion_id: OccasionId,
    pub date: PartialDate,
}

impl Display for InvalidDateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "occasion {} has invalid date `{}`",
            self.occasion_id, self.date
        )
    }
}

impl Error for InvalidDateError {}

/// Returns the next scheduled date of `occasion` on or after `as_of`.
///
/// For `Recurrence::Once` the stored date is returned as-is, even when it lies
/// before `as_of`; callers compare it against `as_of` to detect overdue items.
///
/// # Errors
/// - `InvalidDateError` when the stored month/day (or full date for one-shot
///   occasions) does not exist on the calendar.
pub fn next_occurrence(occasion: &Occasion, as_of: NaiveDate) -> Result<NaiveDate, InvalidDateError> {
    match occasion.recurrence {
        Recurrence::Yearly => {
            validate_month_day(occasion)?;
            let this_year = date_in_year(&occasion.date, as_of.year())
                .ok_or_else(|| invalid(occasion))?;
            if this_year >= as_of {
                return Ok(this_year);
            }
            date_in_year(&occasion.date, as_of.year() + 1).ok_or_else(|| invalid(occasion))
        }
        Recurrence::Once => occasion.date.to_full_date().ok_or_else(|| invalid(occasion)),
    }
}

/// Returns the latest scheduled date strictly before `as_of`, if any.
///
/// # Errors
/// - Same conditions as `next_occurrence`.
pub fn previous_occurrence(
    occasion: &Occasion,
    as_of: NaiveDate,
) -> Result<Option<NaiveDate>, InvalidDateError> {
    match occasion.recurrence {
        Recurrence::Yearly => {
            validate_month_day(occasion)?;
            let this_year = date_in_year(&occasion.date, as_of.year())
                .ok_or_else(|| invalid(occasion))?;
            if this_year < as_of {
                return Ok(Some(this_year));
            }
            date_in_year(&occasion.date, as_of.year() - 1)
                .map(Some)
                .ok_or_else(|| invalid(occasion))
        }
        Recurrence::Once => {
            let scheduled = occasion.date.to_full_date().ok_or_else(|| invalid(occasion))?;
            Ok((scheduled < as_of).then_some(scheduled))
        }
    }
}

/// Places month/day in `year`, applying the leap-day policy.
fn date_in_year(date: &PartialDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, date.month, date.day).or_else(|| {
        if date.is_leap_day() {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

/// Checks that the stored date of `occasion` exists on the calendar.
///
/// Yearly occasions need a valid month/day (Feb 29 included); one-shot
/// occasions need a full, valid date.
pub fn validate_month_day(occasion: &Occasion) -> Result<(), InvalidDateError> {
    let valid = match occasion.recurrence {
        Recurrence::Yearly => occasion.date.is_valid_month_day(),
        Recurrence::Once => occasion.date.to_full_date().is_some(),
    };
    if valid {
        Ok(())
    } else {
        Err(invalid(occasion))
    }
}

fn invalid(occasion: &Occasion) -> InvalidDateError {
    InvalidDateError {
        occasion_id: occasion.id,
        date: occasion.date,
    }
}

#[cfg(test)]
mod tests {
    use super::{next_occurrence, previous_occurrence, validate_month_day};
    use crate::model::date::PartialDate;
    use crate::model::occasion::{Occasion, OccasionKind};
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn yearly(month: u32, day: u32) -> Occasion {
        Occasion::yearly(
            Uuid::new_v4(),
            OccasionKind::Anniversary,
            "anniversary",
            PartialDate::month_day(month, day),
        )
    }

    #[test]
    fn passed_date_rolls_to_next_year() {
        let birthday = Occasion::birthday(Uuid::new_v4(), PartialDate::month_day(3, 1));
        assert_eq!(
            next_occurrence(&birthday, day(2025, 3, 15)).unwrap(),
            day(2026, 3, 1)
        );
    }

    #[test]
    fn same_day_counts_as_next_occurrence() {
        let occasion = yearly(7, 4);
        assert_eq!(next_occurrence(&occasion, day(2025, 7, 4)).unwrap(), day(2025, 7, 4));
    }

    #[test]
    fn leap_day_falls_back_to_feb_28() {
        let occasion = yearly(2, 29);
        assert_eq!(next_occurrence(&occasion, day(2025, 1, 10)).unwrap(), day(2025, 2, 28));
        assert_eq!(next_occurrence(&occasion, day(2027, 3, 1)).unwrap(), day(2028, 2, 29));
    }

    #[test]
    fn invalid_month_day_is_an_error() {
        let occasion = yearly(2, 30);
        let err = next_occurrence(&occasion, day(2025, 1, 1)).unwrap_err();
        assert_eq!(err.occasion_id, occasion.id);
        assert!(previous_occurrence(&yearly(13, 1), day(2025, 1, 1)).is_err());
    }

    #[test]
    fn validate_month_day_checks_by_recurrence() {
        assert!(validate_month_day(&yearly(2, 29)).is_ok());
        assert!(validate_month_day(&yearly(4, 31)).is_err());

        let mut reminder = Occasion::reminder(Uuid::new_v4(), "renew passport", day(2025, 2, 28));
        assert!(validate_month_day(&reminder).is_ok());
        reminder.date = PartialDate::month_day(2, 28);
        assert!(validate_month_day(&reminder).is_err());
    }

    #[test]
    fn next_occurrence_stays_within_a_year() {
        let mut as_of = day(2023, 1, 1);
        let end = day(2025, 1, 1);
        let samples = [(1, 1), (2, 28), (2, 29), (6, 30), (12, 31)];
        while as_of < end {
            for (month, d) in samples {
                let next = next_occurrence(&yearly(month, d), as_of).unwrap();
                assert!(next >= as_of);
                assert!(next <= as_of + Duration::days(366));
            }
            as_of += Duration::days(13);
        }
    }

    #[test]
    fn previous_occurrence_is_strictly_before() {
        let occasion = yearly(3, 1);
        assert_eq!(
            previous_occurrence(&occasion, day(2025, 3, 1)).unwrap(),
            Some(day(2024, 3, 1))
        );
        assert_eq!(
            previous_occurrence(&occasion, day(2025, 3, 2)).unwrap(),
            Some(day(2025, 3, 1))
        );
    }

    #[test]
    fn one_shot_reminder_resolves_to_its_date() {
        let reminder = Occasion::reminder(Uuid::new_v4(), "send photos", day(2025, 5, 10));
        assert_eq!(next_occurrence(&reminder, day(2025, 6, 1)).unwrap(), day(2025, 5, 10));
        assert_eq!(
            previous_occurrence(&reminder, day(2025, 6, 1)).unwrap(),
            Some(day(2025, 5, 10))
        );
        assert_eq!(previous_occurrence(&reminder, day(2025, 5, 10)).unwrap(), None);
    }
}
