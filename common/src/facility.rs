use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::identity::UserId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub String);

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cold-storage location offering rentable capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub address: String,
    pub city: String,
    /// The facility operator, the only one who may approve or reject
    /// bookings against it.
    pub operator: UserId,
    pub total_capacity: u32,
    pub available_capacity: u32,
    /// Price per day.
    pub base_price: u64,
    /// 0.0 to 5.0.
    pub rating: f32,
    pub features: BTreeSet<String>,
}

impl Facility {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MarketError::validation("facility name is required"));
        }
        if self.available_capacity > self.total_capacity {
            return Err(MarketError::validation(format!(
                "available capacity {} exceeds total capacity {}",
                self.available_capacity, self.total_capacity
            )));
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(MarketError::validation(format!(
                "rating must be between 0 and 5, got {}",
                self.rating
            )));
        }
        Ok(())
    }

    pub fn is_operated_by(&self, user: &UserId) -> bool {
        self.operator == *user
    }
}

/// Facility search: case-insensitive substring on name or city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityFilter {
    #[serde(default)]
    pub query: Option<String>,
}

impl FacilityFilter {
    pub fn matches(&self, facility: &Facility) -> bool {
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let needle = query.to_lowercase();
        facility.name.to_lowercase().contains(&needle)
            || facility.city.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility() -> Facility {
        Facility {
            id: FacilityId("r2".into()),
            name: "Bukuru Cold Hub".into(),
            address: "Old Airport Junction".into(),
            city: "Jos South".into(),
            operator: UserId("op".into()),
            total_capacity: 800,
            available_capacity: 120,
            base_price: 4500,
            rating: 4.5,
            features: ["Generator".to_string(), "Loading Bay".to_string()].into(),
        }
    }

    #[test]
    fn capacity_invariant() {
        let mut f = facility();
        assert!(f.validate().is_ok());
        f.available_capacity = 801;
        assert!(matches!(f.validate(), Err(MarketError::Validation(_))));
    }

    #[test]
    fn rating_and_name_required() {
        let mut f = facility();
        f.rating = 5.5;
        assert!(f.validate().is_err());
        let mut f = facility();
        f.name = "  ".into();
        assert!(f.validate().is_err());
    }

    #[test]
    fn filter_matches_name_or_city() {
        let f = facility();
        let by = |q: &str| FacilityFilter {
            query: Some(q.into()),
        };
        assert!(FacilityFilter::default().matches(&f));
        assert!(by("bukuru").matches(&f));
        assert!(by("JOS SOUTH").matches(&f));
        assert!(by("   ").matches(&f));
        assert!(!by("Barkin").matches(&f));
        // Address is not searched.
        assert!(!by("airport").matches(&f));
    }
}
