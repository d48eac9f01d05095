// 📅 Season Classifier - map an observation date to its season label
//
// A season is either a calendar year ("2023") or a fiscal year that
// straddles New Year ("2022-2023"). Labels are zero-padded so that
// string order is chronological order.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ============================================================================
// PERIOD
// ============================================================================

/// First and last month (1-12, inclusive) of a season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub first_month: u32,
    pub last_month: u32,
}

impl Default for Period {
    fn default() -> Self {
        Period {
            first_month: 1,
            last_month: 12,
        }
    }
}

impl Period {
    pub fn new(first_month: u32, last_month: u32) -> CoreResult<Self> {
        if !(1..=12).contains(&first_month) || !(1..=12).contains(&last_month) {
            return Err(CoreError::InvalidPeriod {
                first: first_month,
                last: last_month,
            });
        }
        Ok(Period {
            first_month,
            last_month,
        })
    }

    /// True when a season spans the calendar-year boundary
    pub fn spans_new_year(&self) -> bool {
        self.first_month > self.last_month
    }

    /// Season label for a date
    ///
    /// Example:
    /// ```
    /// use inat_season::Period;
    /// use chrono::NaiveDate;
    ///
    /// let southern = Period::new(9, 8).unwrap();
    /// let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    /// assert_eq!(southern.classify(date), "2022-2023");
    /// ```
    pub fn classify(&self, date: NaiveDate) -> String {
        if !self.spans_new_year() {
            return format!("{:04}", date.year());
        }

        let start = if date.month() >= self.first_month {
            date.year()
        } else {
            date.year() - 1
        };
        format!("{:04}-{:04}", start, start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_year_label() {
        let period = Period::default();
        assert_eq!(period.classify(date(2023, 3, 1)), "2023");
        assert_eq!(period.classify(date(2023, 12, 31)), "2023");
        assert_eq!(period.classify(date(987, 1, 1)), "0987");
    }

    #[test]
    fn test_fiscal_year_label() {
        let period = Period::new(9, 8).unwrap();
        assert_eq!(period.classify(date(2023, 3, 1)), "2022-2023");
        assert_eq!(period.classify(date(2023, 10, 1)), "2023-2024");
        assert_eq!(period.classify(date(2023, 9, 1)), "2023-2024");
        assert_eq!(period.classify(date(2023, 8, 31)), "2022-2023");
    }

    #[test]
    fn test_partial_calendar_period_still_uses_year() {
        // Spring-to-autumn season never crosses New Year
        let period = Period::new(3, 10).unwrap();
        assert!(!period.spans_new_year());
        assert_eq!(period.classify(date(2021, 1, 15)), "2021");
    }

    #[test]
    fn test_labels_sort_chronologically() {
        let period = Period::new(7, 6).unwrap();
        let mut labels = vec![
            period.classify(date(2010, 8, 1)),
            period.classify(date(2009, 1, 1)),
            period.classify(date(2010, 2, 1)),
        ];
        labels.sort();
        assert_eq!(labels, vec!["2008-2009", "2009-2010", "2010-2011"]);
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert_eq!(
            Period::new(0, 12),
            Err(CoreError::InvalidPeriod { first: 0, last: 12 })
        );
        assert!(Period::new(1, 13).is_err());
    }
}
