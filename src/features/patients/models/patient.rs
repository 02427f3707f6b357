use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Database model for patient
#[derive(Debug, Clone, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    /// Pending one-time code; cleared after one successful verification
    pub otp: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Demographics plus the freshly generated code for a (re-)registration
#[derive(Debug, Clone)]
pub struct PatientRegistration {
    pub name: String,
    pub email: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub otp: String,
}

/// Calendar age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Age {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years, {} months, {} days",
            self.years, self.months, self.days
        )
    }
}

impl Age {
    /// Age on `today` for someone born on `born`. Whole months are counted
    /// with month-end clamping (Jan 31 + 1 month = Feb 28/29), the remainder
    /// is in days. A future birth date yields zero.
    pub fn between(born: NaiveDate, today: NaiveDate) -> Self {
        if today <= born {
            return Self::default();
        }

        let month_index = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
        let mut total_months = (month_index(today) - month_index(born)).max(0) as u32;

        let anchor_for = |months: u32| born.checked_add_months(Months::new(months));
        while total_months > 0 && anchor_for(total_months).map_or(true, |anchor| anchor > today) {
            total_months -= 1;
        }

        let anchor = anchor_for(total_months).unwrap_or(born);
        let days = (today - anchor).num_days().max(0) as u32;

        Self {
            years: total_months / 12,
            months: total_months % 12,
            days,
        }
    }
}

impl Patient {
    pub fn age_on(&self, today: NaiveDate) -> Age {
        Age::between(self.date_of_birth, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_exact_birthday() {
        let age = Age::between(date(1990, 5, 17), date(2025, 5, 17));
        assert_eq!(
            age,
            Age {
                years: 35,
                months: 0,
                days: 0
            }
        );
    }

    #[test]
    fn test_age_day_before_birthday() {
        let age = Age::between(date(1990, 5, 17), date(2025, 5, 16));
        assert_eq!(age.years, 34);
        assert_eq!(age.months, 11);
        // April 17 -> May 16
        assert_eq!(age.days, 29);
    }

    #[test]
    fn test_age_borrows_real_month_length() {
        // Jan 31 + 1 month clamps to Feb 29 in a leap year, then one more day
        let age = Age::between(date(2000, 1, 31), date(2000, 3, 1));
        assert_eq!(
            age,
            Age {
                years: 0,
                months: 1,
                days: 1
            }
        );
    }

    #[test]
    fn test_age_future_birth_date_is_zero() {
        assert_eq!(Age::between(date(2030, 1, 1), date(2025, 1, 1)), Age::default());
    }

    #[test]
    fn test_age_display() {
        let age = Age {
            years: 3,
            months: 2,
            days: 1,
        };
        assert_eq!(age.to_string(), "3 years, 2 months, 1 days");
    }
}
