use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of generated identifiers.
pub const ID_LEN: usize = 9;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Draw a fresh lowercase base-36 identifier.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// A user's identity, as handed out by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a user can have on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Farmer,
    ColdRoomOwner,
    Admin,
    SuperAdmin,
    Retailer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Active,
    Suspended,
    Deleted,
}

/// Which bookings a role is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    /// Bookings the user created.
    Own,
    /// Bookings against facilities the user operates.
    OperatedFacilities,
    All,
    None,
}

/// Dashboard sections, per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavItem {
    Overview,
    Livestock,
    FindStorage,
    Bookings,
    Finance,
    Facility,
    Users,
    Approvals,
    Settings,
    Audit,
    Marketplace,
}

impl UserRole {
    pub fn all() -> &'static [UserRole] {
        &[
            UserRole::Farmer,
            UserRole::ColdRoomOwner,
            UserRole::Admin,
            UserRole::SuperAdmin,
            UserRole::Retailer,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Farmer => "FARMER",
            UserRole::ColdRoomOwner => "COLD_ROOM_OWNER",
            UserRole::Admin => "ADMIN",
            UserRole::SuperAdmin => "SUPER_ADMIN",
            UserRole::Retailer => "RETAILER",
        }
    }

    pub fn parse(s: &str) -> Option<UserRole> {
        UserRole::all().iter().copied().find(|r| r.as_str() == s)
    }

    pub fn booking_scope(self) -> BookingScope {
        match self {
            UserRole::Farmer => BookingScope::Own,
            UserRole::ColdRoomOwner => BookingScope::OperatedFacilities,
            UserRole::Admin | UserRole::SuperAdmin => BookingScope::All,
            UserRole::Retailer => BookingScope::None,
        }
    }

    pub fn nav_items(self) -> &'static [NavItem] {
        use NavItem::*;
        match self {
            UserRole::Farmer => &[Overview, Livestock, FindStorage, Bookings],
            UserRole::ColdRoomOwner => &[Overview, Bookings, Finance, Facility],
            UserRole::Admin => &[Overview, Users, Approvals, Settings],
            UserRole::SuperAdmin => &[Overview, Users, Approvals, Settings, Audit],
            UserRole::Retailer => &[Overview, Marketplace],
        }
    }

    pub fn can_book_storage(self) -> bool {
        match self {
            UserRole::Farmer => true,
            UserRole::ColdRoomOwner
            | UserRole::Admin
            | UserRole::SuperAdmin
            | UserRole::Retailer => false,
        }
    }

    pub fn can_manage_bookings(self) -> bool {
        match self {
            UserRole::ColdRoomOwner => true,
            UserRole::Farmer | UserRole::Admin | UserRole::SuperAdmin | UserRole::Retailer => false,
        }
    }

    pub fn can_administer(self) -> bool {
        match self {
            UserRole::Admin | UserRole::SuperAdmin => true,
            UserRole::Farmer | UserRole::ColdRoomOwner | UserRole::Retailer => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Pending => "PENDING",
            UserStatus::Active => "ACTIVE",
            UserStatus::Suspended => "SUSPENDED",
            UserStatus::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<UserStatus> {
        [
            UserStatus::Pending,
            UserStatus::Active,
            UserStatus::Suspended,
            UserStatus::Deleted,
        ]
        .into_iter()
        .find(|st| st.as_str() == s)
    }
}

/// An authenticated platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Flat key/value form of a [`User`], the only thing that survives a reload.
pub type UserRecord = BTreeMap<String, String>;

const KEY_ID: &str = "id";
const KEY_EMAIL: &str = "email";
const KEY_PHONE: &str = "phone";
const KEY_ROLE: &str = "role";
const KEY_STATUS: &str = "status";
const KEY_FIRST_NAME: &str = "firstName";
const KEY_LAST_NAME: &str = "lastName";

impl User {
    /// "First Last", falling back to "Demo User" for missing parts.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("Demo");
        let last = self.last_name.as_deref().unwrap_or("User");
        format!("{first} {last}")
    }

    pub fn to_record(&self) -> UserRecord {
        let mut record = UserRecord::new();
        record.insert(KEY_ID.into(), self.id.0.clone());
        record.insert(KEY_EMAIL.into(), self.email.clone());
        record.insert(KEY_PHONE.into(), self.phone.clone());
        record.insert(KEY_ROLE.into(), self.role.as_str().into());
        record.insert(KEY_STATUS.into(), self.status.as_str().into());
        if let Some(first) = &self.first_name {
            record.insert(KEY_FIRST_NAME.into(), first.clone());
        }
        if let Some(last) = &self.last_name {
            record.insert(KEY_LAST_NAME.into(), last.clone());
        }
        record
    }

    /// Rebuild a user from a stored record. Returns `None` when a required
    /// key is missing or a role/status value is unknown.
    pub fn from_record(record: &UserRecord) -> Option<User> {
        Some(User {
            id: UserId(record.get(KEY_ID)?.clone()),
            email: record.get(KEY_EMAIL)?.clone(),
            phone: record.get(KEY_PHONE)?.clone(),
            role: UserRole::parse(record.get(KEY_ROLE)?)?,
            status: UserStatus::parse(record.get(KEY_STATUS)?)?,
            first_name: record.get(KEY_FIRST_NAME).cloned(),
            last_name: record.get(KEY_LAST_NAME).cloned(),
        })
    }
}

/// Admin user search: case-insensitive substring on name or email, exact role.
pub fn filter_users<'a>(users: &'a [User], query: &str, role: Option<UserRole>) -> Vec<&'a User> {
    let needle = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| role.is_none_or(|r| u.role == r))
        .filter(|u| {
            needle.is_empty()
                || u.display_name().to_lowercase().contains(&needle)
                || u.email.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn user(id: &str, role: UserRole, first: &str, email: &str) -> User {
        User {
            id: UserId(id.into()),
            email: email.into(),
            phone: "08012345678".into(),
            role,
            status: UserStatus::Active,
            first_name: Some(first.into()),
            last_name: None,
        }
    }

    #[test]
    fn random_ids_are_base36() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = random_id(&mut rng);
        assert_eq!(id.len(), ID_LEN);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn record_roundtrip_keeps_optional_names() {
        let mut u = user("u1", UserRole::ColdRoomOwner, "Grace", "grace@coldhub.com");
        assert_eq!(User::from_record(&u.to_record()), Some(u.clone()));

        u.first_name = None;
        let record = u.to_record();
        assert!(!record.contains_key("firstName"));
        assert_eq!(User::from_record(&record), Some(u));
    }

    #[test]
    fn partial_record_yields_no_user() {
        let mut record = user("u1", UserRole::Farmer, "Musa", "m@farm.com").to_record();
        record.insert("role".into(), "WIZARD".into());
        assert_eq!(User::from_record(&record), None);

        record.remove("role");
        assert_eq!(User::from_record(&record), None);
    }

    #[test]
    fn role_serializes_screaming_snake() {
        let json = serde_json::to_string(&UserRole::ColdRoomOwner).unwrap();
        assert_eq!(json, "\"COLD_ROOM_OWNER\"");
        for role in UserRole::all() {
            assert_eq!(UserRole::parse(role.as_str()), Some(*role));
        }
    }

    #[test]
    fn display_name_falls_back() {
        let mut u = user("u1", UserRole::Farmer, "Musa", "m@farm.com");
        u.last_name = Some("Ibrahim".into());
        assert_eq!(u.display_name(), "Musa Ibrahim");
        u.first_name = None;
        u.last_name = None;
        assert_eq!(u.display_name(), "Demo User");
    }

    #[test]
    fn role_dispatch() {
        assert_eq!(UserRole::Farmer.booking_scope(), BookingScope::Own);
        assert_eq!(
            UserRole::ColdRoomOwner.booking_scope(),
            BookingScope::OperatedFacilities
        );
        assert_eq!(UserRole::Retailer.booking_scope(), BookingScope::None);
        assert!(UserRole::SuperAdmin.nav_items().contains(&NavItem::Audit));
        assert!(!UserRole::Admin.nav_items().contains(&NavItem::Audit));
        assert!(UserRole::Farmer.can_book_storage());
        assert!(!UserRole::Farmer.can_manage_bookings());
        assert!(UserRole::Admin.can_administer());
    }

    #[test]
    fn filter_users_by_query_and_role() {
        let users = vec![
            user("1", UserRole::Farmer, "John", "john@farm.com"),
            user("2", UserRole::ColdRoomOwner, "Bukuru", "owner@coldhub.com"),
            user("3", UserRole::Farmer, "Sarah", "sarah@harvest.ng"),
        ];

        let farmers = filter_users(&users, "", Some(UserRole::Farmer));
        assert_eq!(farmers.len(), 2);

        let hits = filter_users(&users, "HARVEST", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, UserId("3".into()));

        assert!(filter_users(&users, "john", Some(UserRole::ColdRoomOwner)).is_empty());
    }
}
