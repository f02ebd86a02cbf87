use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::identity::UserId;

/// Unique livestock identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LivestockId(pub String);

impl fmt::Display for LivestockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Cattle,
    Goat,
    Sheep,
    Pig,
    Poultry,
    Other(String),
}

impl Species {
    pub fn name(&self) -> &str {
        match self {
            Species::Cattle => "Cattle",
            Species::Goat => "Goat",
            Species::Sheep => "Sheep",
            Species::Pig => "Pig",
            Species::Poultry => "Poultry",
            Species::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivestockStatus {
    Available,
    Sold,
    InStorage,
}

/// A farmer-owned inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestockUnit {
    pub id: LivestockId,
    pub owner: UserId,
    pub species: Species,
    pub breed: String,
    /// Kilograms, always > 0.
    pub weight_kg: f64,
    pub health_status: String,
    pub price: u64,
    /// Always >= 1.
    pub quantity: u32,
    pub status: LivestockStatus,
    /// Monotonic listing order, higher is newer.
    pub listed_seq: u64,
}

/// Livestock as entered on the "add stock" form, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLivestock {
    pub species: Species,
    #[serde(default)]
    pub breed: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub health_status: String,
    /// Signed so that a negative entry is reported instead of wrapping.
    pub price: i64,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl NewLivestock {
    /// Check the form and fill the defaults: breed "Standard", health
    /// "A+", quantity 1.
    pub(crate) fn into_unit(
        self,
        id: LivestockId,
        owner: UserId,
        listed_seq: u64,
    ) -> Result<LivestockUnit> {
        if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
            return Err(MarketError::validation(format!(
                "weight must be greater than 0 kg, got {}",
                self.weight_kg
            )));
        }
        let price = u64::try_from(self.price).map_err(|_| {
            MarketError::validation(format!("price must not be negative, got {}", self.price))
        })?;
        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(MarketError::validation("quantity must be at least 1"));
        }
        if let Species::Other(name) = &self.species {
            if name.trim().is_empty() {
                return Err(MarketError::validation("livestock type is required"));
            }
        }
        let breed = non_blank_or(self.breed, "Standard");
        let health_status = non_blank_or(self.health_status, "A+");

        Ok(LivestockUnit {
            id,
            owner,
            species: self.species,
            breed,
            weight_kg: self.weight_kg,
            health_status,
            price,
            quantity,
            status: LivestockStatus::Available,
            listed_seq,
        })
    }
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Inventory filter. The query matches type name or breed, case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivestockFilter {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub status: Option<LivestockStatus>,
}

impl LivestockFilter {
    pub fn by_status(status: LivestockStatus) -> Self {
        LivestockFilter {
            query: None,
            status: Some(status),
        }
    }

    pub fn matches(&self, unit: &LivestockUnit) -> bool {
        if self.status.is_some_and(|s| s != unit.status) {
            return false;
        }
        match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                unit.species.name().to_lowercase().contains(&needle)
                    || unit.breed.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Inventory ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivestockSort {
    /// Newest listing first.
    #[default]
    Recent,
    /// Highest price first.
    Price,
    /// Heaviest first.
    Weight,
    /// Type name, A to Z.
    Type,
}

impl LivestockSort {
    fn compare(self, a: &LivestockUnit, b: &LivestockUnit) -> Ordering {
        match self {
            LivestockSort::Recent => b.listed_seq.cmp(&a.listed_seq),
            LivestockSort::Price => b.price.cmp(&a.price),
            LivestockSort::Weight => b.weight_kg.total_cmp(&a.weight_kg),
            LivestockSort::Type => a.species.name().cmp(b.species.name()),
        }
    }
}

/// Filter then sort. The sort is stable, so applying the same query to its
/// own output returns it unchanged.
pub fn query_livestock<'a, I>(
    units: I,
    filter: &LivestockFilter,
    sort: LivestockSort,
) -> Vec<&'a LivestockUnit>
where
    I: IntoIterator<Item = &'a LivestockUnit>,
{
    let mut out: Vec<&LivestockUnit> = units.into_iter().filter(|u| filter.matches(u)).collect();
    out.sort_by(|a, b| sort.compare(a, b));
    out
}
