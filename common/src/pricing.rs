use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

pub const MIN_DURATION_DAYS: u32 = 3;
pub const MAX_DURATION_DAYS: u32 = 60;

/// A storage duration in days, always within
/// [`MIN_DURATION_DAYS`, `MAX_DURATION_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DurationDays(u32);

impl DurationDays {
    pub fn new(days: u32) -> Result<Self> {
        if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&days) {
            return Err(MarketError::validation(format!(
                "duration must be between {MIN_DURATION_DAYS} and {MAX_DURATION_DAYS} days, got {days}"
            )));
        }
        Ok(DurationDays(days))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_chrono(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl TryFrom<u32> for DurationDays {
    type Error = MarketError;

    fn try_from(days: u32) -> Result<Self> {
        DurationDays::new(days)
    }
}

impl From<DurationDays> for u32 {
    fn from(d: DurationDays) -> u32 {
        d.0
    }
}

impl fmt::Display for DurationDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Total storage price: daily base price times duration.
///
/// Fails only if the product does not fit in a `u64`.
pub fn compute_total(base_price: u64, duration: DurationDays) -> Result<u64> {
    base_price
        .checked_mul(u64::from(duration.get()))
        .ok_or_else(|| MarketError::validation("total price overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bounds_are_inclusive() {
        assert!(DurationDays::new(2).is_err());
        assert_eq!(DurationDays::new(3).unwrap().get(), 3);
        assert_eq!(DurationDays::new(60).unwrap().get(), 60);
        assert!(matches!(
            DurationDays::new(61),
            Err(MarketError::Validation(_))
        ));
    }

    #[test]
    fn total_is_rate_times_days() {
        let week = DurationDays::new(7).unwrap();
        assert_eq!(compute_total(5000, week).unwrap(), 35_000);
        assert_eq!(compute_total(0, week).unwrap(), 0);
    }

    #[test]
    fn total_is_linear_in_duration() {
        for base in [0u64, 1, 3800, 4500, 5000, 1_000_000] {
            let at_min = compute_total(base, DurationDays::new(MIN_DURATION_DAYS).unwrap()).unwrap();
            for days in MIN_DURATION_DAYS..=MAX_DURATION_DAYS {
                let total = compute_total(base, DurationDays::new(days).unwrap()).unwrap();
                assert_eq!(total, base * u64::from(days));
                assert_eq!(total - at_min, base * u64::from(days - MIN_DURATION_DAYS));
            }
        }
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let days = DurationDays::new(60).unwrap();
        assert!(matches!(
            compute_total(u64::MAX, days),
            Err(MarketError::Validation(_))
        ));
    }

    #[test]
    fn deserialize_rejects_out_of_range() {
        let ok: DurationDays = serde_json::from_str("14").unwrap();
        assert_eq!(ok.get(), 14);
        assert!(serde_json::from_str::<DurationDays>("90").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "14");
    }
}
