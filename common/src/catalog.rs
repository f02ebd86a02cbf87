use rand::Rng;

use crate::error::{MarketError, Result};
use crate::facility::{Facility, FacilityFilter, FacilityId};
use crate::identity::{random_id, UserId};
use crate::livestock::{
    query_livestock, LivestockFilter, LivestockId, LivestockSort, LivestockStatus, LivestockUnit,
    NewLivestock,
};

/// Facility and livestock registry for one session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    facilities: Vec<Facility>,
    livestock: Vec<LivestockUnit>,
    next_seq: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a facility after checking its invariants. Ids must be unique.
    pub fn register_facility(&mut self, facility: Facility) -> Result<()> {
        facility.validate()?;
        if self.facility(&facility.id).is_some() {
            return Err(MarketError::validation(format!(
                "facility {} already registered",
                facility.id
            )));
        }
        self.facilities.push(facility);
        Ok(())
    }

    pub fn facility(&self, id: &FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == *id)
    }

    pub fn list_facilities(&self, filter: &FacilityFilter) -> Vec<&Facility> {
        self.facilities.iter().filter(|f| filter.matches(f)).collect()
    }

    /// Facilities run by `operator`.
    pub fn operated_by<'a>(&'a self, operator: &'a UserId) -> impl Iterator<Item = &'a Facility> {
        self.facilities.iter().filter(move |f| f.is_operated_by(operator))
    }

    pub fn livestock(&self, id: &LivestockId) -> Option<&LivestockUnit> {
        self.livestock.iter().find(|u| u.id == *id)
    }

    /// One owner's inventory, filtered then sorted.
    pub fn list_livestock(
        &self,
        owner: &UserId,
        filter: &LivestockFilter,
        sort: LivestockSort,
    ) -> Vec<&LivestockUnit> {
        query_livestock(
            self.livestock.iter().filter(|u| u.owner == *owner),
            filter,
            sort,
        )
    }

    /// Validate and list a new unit under a fresh id with status
    /// `available`.
    pub fn add_livestock(&mut self, owner: &UserId, new: NewLivestock) -> Result<LivestockUnit> {
        self.add_livestock_with(&mut rand::thread_rng(), owner, new)
    }

    pub fn add_livestock_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        owner: &UserId,
        new: NewLivestock,
    ) -> Result<LivestockUnit> {
        let id = loop {
            let candidate = LivestockId(random_id(rng));
            if self.livestock(&candidate).is_none() {
                break candidate;
            }
        };
        let unit = new.into_unit(id, owner.clone(), self.next_seq + 1)?;
        self.next_seq += 1;
        self.livestock.push(unit.clone());
        Ok(unit)
    }

    /// Change a unit's status. Only the owner may do so.
    pub fn update_livestock_status(
        &mut self,
        owner: &UserId,
        id: &LivestockId,
        status: LivestockStatus,
    ) -> Result<LivestockUnit> {
        let unit = self
            .livestock
            .iter_mut()
            .find(|u| u.id == *id)
            .ok_or_else(|| MarketError::not_found("livestock", id.0.clone()))?;
        if unit.owner != *owner {
            return Err(MarketError::Forbidden(format!(
                "livestock {id} belongs to another farmer"
            )));
        }
        unit.status = status;
        Ok(unit.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::livestock::Species;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn facility(id: &str, name: &str, city: &str) -> Facility {
        Facility {
            id: FacilityId(id.into()),
            name: name.into(),
            address: "Station Road".into(),
            city: city.into(),
            operator: UserId("op".into()),
            total_capacity: 500,
            available_capacity: 300,
            base_price: 3800,
            rating: 4.2,
            features: Default::default(),
        }
    }

    fn stock(species: Species, weight_kg: f64, price: i64) -> NewLivestock {
        NewLivestock {
            species,
            breed: String::new(),
            weight_kg,
            health_status: String::new(),
            price,
            quantity: None,
        }
    }

    #[test]
    fn register_rejects_duplicates_and_bad_capacity() {
        let mut c = Catalog::new();
        c.register_facility(facility("r1", "Jos North Premium Storage", "Jos")).unwrap();
        assert!(c.register_facility(facility("r1", "Again", "Jos")).is_err());

        let mut bad = facility("r2", "Bukuru Cold Hub", "Jos South");
        bad.available_capacity = bad.total_capacity + 1;
        assert!(c.register_facility(bad).is_err());
        assert_eq!(c.list_facilities(&FacilityFilter::default()).len(), 1);
    }

    #[test]
    fn list_facilities_by_query() {
        let mut c = Catalog::new();
        c.register_facility(facility("r1", "Jos North Premium Storage", "Jos")).unwrap();
        c.register_facility(facility("r3", "Barkin Ladi Agro-Cool", "Barkin Ladi")).unwrap();
        let filter = FacilityFilter {
            query: Some("ladi".into()),
        };
        let hits = c.list_facilities(&filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, FacilityId("r3".into()));
    }

    #[test]
    fn add_assigns_unique_ids_and_defaults() {
        let mut c = Catalog::new();
        let mut rng = StdRng::seed_from_u64(42);
        let owner = UserId("f1".into());
        let a = c.add_livestock_with(&mut rng, &owner, stock(Species::Cattle, 450.0, 250_000)).unwrap();
        let b = c.add_livestock_with(&mut rng, &owner, stock(Species::Goat, 35.0, 45_000)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, LivestockStatus::Available);
        assert!(b.listed_seq > a.listed_seq);

        let recent = c.list_livestock(&owner, &LivestockFilter::default(), LivestockSort::Recent);
        assert_eq!(recent[0].id, b.id);
    }

    #[test]
    fn invalid_add_does_not_consume_sequence() {
        let mut c = Catalog::new();
        let owner = UserId("f1".into());
        assert!(c.add_livestock(&owner, stock(Species::Cattle, -3.0, 10)).is_err());
        let ok = c.add_livestock(&owner, stock(Species::Cattle, 3.0, 10)).unwrap();
        assert_eq!(ok.listed_seq, 1);
    }

    #[test]
    fn listing_is_per_owner() {
        let mut c = Catalog::new();
        let musa = UserId("musa".into());
        let grace = UserId("grace".into());
        c.add_livestock(&musa, stock(Species::Cattle, 450.0, 1)).unwrap();
        c.add_livestock(&grace, stock(Species::Goat, 35.0, 1)).unwrap();
        let mine = c.list_livestock(&musa, &LivestockFilter::default(), LivestockSort::Recent);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].owner, musa);
    }

    #[test]
    fn update_status() {
        let mut c = Catalog::new();
        let owner = UserId("f1".into());
        let unit = c.add_livestock(&owner, stock(Species::Goat, 35.0, 45_000)).unwrap();

        let updated = c
            .update_livestock_status(&owner, &unit.id, LivestockStatus::InStorage)
            .unwrap();
        assert_eq!(updated.status, LivestockStatus::InStorage);

        let stored = c.list_livestock(
            &owner,
            &LivestockFilter::by_status(LivestockStatus::InStorage),
            LivestockSort::Recent,
        );
        assert_eq!(stored.len(), 1);

        assert!(matches!(
            c.update_livestock_status(&owner, &LivestockId("nope".into()), LivestockStatus::Sold),
            Err(MarketError::NotFound { .. })
        ));
        assert!(matches!(
            c.update_livestock_status(&UserId("other".into()), &unit.id, LivestockStatus::Sold),
            Err(MarketError::Forbidden(_))
        ));
    }
}
