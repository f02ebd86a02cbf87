//! Demo data seeded into every fresh session.
//!
//! Farmers start with two head of stock; cold-room owners start with a
//! facility of their own and two incoming requests against it.

use chrono::NaiveDate;

use crate::booking::{Booking, BookingId, BookingStatus};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::facility::{Facility, FacilityId};
use crate::identity::{User, UserId, UserRole, UserStatus};
use crate::livestock::{LivestockStatus, NewLivestock, Species};
use crate::market::Marketplace;
use crate::pricing::{compute_total, DurationDays};

#[allow(clippy::too_many_arguments)]
fn facility(
    id: &str,
    name: &str,
    address: &str,
    city: &str,
    operator: UserId,
    capacity: (u32, u32),
    base_price: u64,
    rating: f32,
    features: &[&str],
) -> Facility {
    Facility {
        id: FacilityId(id.into()),
        name: name.into(),
        address: address.into(),
        city: city.into(),
        operator,
        total_capacity: capacity.0,
        available_capacity: capacity.1,
        base_price,
        rating,
        features: features.iter().map(|f| f.to_string()).collect(),
    }
}

/// The public storage directory every farmer can browse.
pub fn public_facilities() -> Vec<Facility> {
    vec![
        facility(
            "r1",
            "Jos North Premium Storage",
            "12 Zaria Road",
            "Jos",
            UserId("op-jos-north".into()),
            (1000, 450),
            5000,
            4.8,
            &["Solar Backup", "CCTV", "Insured"],
        ),
        facility(
            "r2",
            "Bukuru Cold Hub",
            "Old Airport Junction",
            "Jos South",
            UserId("op-bukuru".into()),
            (800, 120),
            4500,
            4.5,
            &["Generator", "Loading Bay"],
        ),
        facility(
            "r3",
            "Barkin Ladi Agro-Cool",
            "Station Road",
            "Barkin Ladi",
            UserId("op-barkin-ladi".into()),
            (500, 300),
            3800,
            4.2,
            &["Near Market", "Clean Certification"],
        ),
    ]
}

fn platform_user(
    id: &str,
    name: (&str, &str),
    email: &str,
    role: UserRole,
    status: UserStatus,
) -> User {
    User {
        id: UserId(id.into()),
        email: email.into(),
        phone: "08012345678".into(),
        role,
        status,
        first_name: Some(name.0.into()),
        last_name: Some(name.1.into()),
    }
}

/// Accounts shown on the admin user-management screen.
pub fn platform_users() -> Vec<User> {
    vec![
        platform_user(
            "u1",
            ("John", "Musa"),
            "john@farm.com",
            UserRole::Farmer,
            UserStatus::Active,
        ),
        platform_user(
            "u2",
            ("Bukuru", "Cold Hub"),
            "contact@bukuru.com",
            UserRole::ColdRoomOwner,
            UserStatus::Active,
        ),
        platform_user(
            "u3",
            ("Sarah", "Bitrus"),
            "sarah@gmail.com",
            UserRole::Farmer,
            UserStatus::Pending,
        ),
        platform_user(
            "u4",
            ("Zaria Road", "Storage"),
            "info@zariastorage.com",
            UserRole::ColdRoomOwner,
            UserStatus::Suspended,
        ),
    ]
}

fn seeded_booking(
    id: &str,
    farmer: (&str, &str),
    facility: &Facility,
    item_name: &str,
    start: NaiveDate,
    days: u32,
) -> Result<Booking> {
    let duration = DurationDays::new(days)?;
    Ok(Booking {
        id: BookingId(id.into()),
        farmer: UserId(farmer.0.into()),
        farmer_name: farmer.1.into(),
        facility: facility.id.clone(),
        facility_name: facility.name.clone(),
        item_name: item_name.into(),
        start_date: start,
        end_date: start + duration.as_chrono(),
        status: BookingStatus::Pending,
        total_price: compute_total(facility.base_price, duration)?,
        duration_days: duration,
        version: 0,
    })
}

/// Build the in-memory marketplace for `user`'s session.
pub fn seed_marketplace(user: &User) -> Result<Marketplace> {
    let mut catalog = Catalog::new();
    for f in public_facilities() {
        catalog.register_facility(f)?;
    }

    let mut own_facility = None;
    match user.role {
        UserRole::Farmer => {
            catalog.add_livestock(
                &user.id,
                NewLivestock {
                    species: Species::Cattle,
                    breed: "Brahman".into(),
                    weight_kg: 450.0,
                    health_status: "A+".into(),
                    price: 250_000,
                    quantity: Some(4),
                },
            )?;
            let goats = catalog.add_livestock(
                &user.id,
                NewLivestock {
                    species: Species::Goat,
                    breed: "Boer".into(),
                    weight_kg: 35.0,
                    health_status: "B+".into(),
                    price: 45_000,
                    quantity: Some(12),
                },
            )?;
            catalog.update_livestock_status(&user.id, &goats.id, LivestockStatus::InStorage)?;
        }
        UserRole::ColdRoomOwner => {
            let f = facility(
                "r-own",
                "Bukuru Premium",
                "Bukuru Express Way",
                "Jos South",
                user.id.clone(),
                (600, 350),
                4500,
                4.6,
                &["Generator", "CCTV"],
            );
            catalog.register_facility(f.clone())?;
            own_facility = Some(f);
        }
        UserRole::Admin | UserRole::SuperAdmin | UserRole::Retailer => {}
    }

    let mut market = Marketplace::new(catalog);
    if let Some(f) = own_facility {
        let start = |m, d| NaiveDate::from_ymd_opt(2024, m, d);
        if let (Some(first), Some(second)) = (start(10, 12), start(10, 15)) {
            market.insert_booking(seeded_booking(
                "b1",
                ("farmer-musa", "Musa Ibrahim"),
                &f,
                "Cattle (4 Units)",
                first,
                7,
            )?);
            market.insert_booking(seeded_booking(
                "b2",
                ("farmer-grace", "Grace Bitrus"),
                &f,
                "Broiler Batch #1",
                second,
                14,
            )?);
        }
    }
    Ok(market)
}
