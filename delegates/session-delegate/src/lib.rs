//! Session provider for the cold-storage marketplace.
//!
//! Authentication is simulated: any credentials are accepted, and two demo
//! addresses unlock the admin roles. The signed-in user is written through
//! a [`SessionStore`] so that it survives a restart; nothing else is.

mod store;

pub use store::{FileStore, MemoryStore, SessionStore};

use serde::{Deserialize, Serialize};

use coldroom_common::identity::{random_id, User, UserId, UserRole, UserStatus};

pub const DEMO_ADMIN_PASSWORD: &str = "Password@123";
pub const DEMO_SUPER_ADMIN_EMAIL: &str = "superadmin@yeezafarm.com";
pub const DEMO_ADMIN_EMAIL: &str = "admin@yeezafarm.com";

const FALLBACK_EMAIL: &str = "user@yeeza.com";
const FALLBACK_PHONE: &str = "08012345678";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

/// Which sign-up flow the user came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationTrack {
    Farmer,
    ColdRoom,
}

impl RegistrationTrack {
    pub fn role(self) -> UserRole {
        match self {
            RegistrationTrack::Farmer => UserRole::Farmer,
            RegistrationTrack::ColdRoom => UserRole::ColdRoomOwner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub track: RegistrationTrack,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Requests that can be sent to the session delegate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionRequest {
    Login(Credentials),
    Register(Registration),
    CurrentUser,
    Logout,
}

/// Responses from the session delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionResponse {
    User(User),
    SignedOut,
    /// The request itself was unusable.
    Error(String),
    /// The session store failed; the signed-in user is unchanged.
    StoreFailed(String),
}

/// Holds the signed-in user and keeps the store in step with it.
pub struct SessionDelegate {
    store: Box<dyn SessionStore + Send>,
    user: Option<User>,
}

impl SessionDelegate {
    /// Start a delegate, restoring any user left in `store`.
    pub fn restore(store: Box<dyn SessionStore + Send>) -> Self {
        let user = store.load().as_ref().and_then(User::from_record);
        if let Some(u) = &user {
            tracing::info!(user = %u.id, role = %u.role, "restored session");
        }
        SessionDelegate { store, user }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn handle_request(&mut self, request: SessionRequest) -> SessionResponse {
        match request {
            SessionRequest::Login(credentials) => self.login(credentials),
            SessionRequest::Register(registration) => self.register(registration),
            SessionRequest::CurrentUser => match &self.user {
                Some(u) => SessionResponse::User(u.clone()),
                None => SessionResponse::SignedOut,
            },
            SessionRequest::Logout => self.logout(),
        }
    }

    fn login(&mut self, credentials: Credentials) -> SessionResponse {
        let role = demo_role(&credentials);
        let (first, last) = match role {
            UserRole::SuperAdmin => (Some("Super"), Some("Admin")),
            UserRole::Admin => (Some("System"), Some("Admin")),
            UserRole::Farmer
            | UserRole::ColdRoomOwner
            | UserRole::Retailer => (None, None),
        };
        let user = User {
            id: UserId(random_id(&mut rand::thread_rng())),
            email: non_blank_or(credentials.email, FALLBACK_EMAIL),
            phone: non_blank_or(credentials.phone, FALLBACK_PHONE),
            role,
            status: UserStatus::Active,
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        };
        self.sign_in(user)
    }

    fn register(&mut self, registration: Registration) -> SessionResponse {
        if registration.email.trim().is_empty() {
            return SessionResponse::Error("email is required".into());
        }
        let optional = |s: String| Some(s).filter(|s| !s.trim().is_empty());
        let user = User {
            id: UserId(random_id(&mut rand::thread_rng())),
            email: registration.email,
            phone: non_blank_or(registration.phone, FALLBACK_PHONE),
            role: registration.track.role(),
            status: UserStatus::Active,
            first_name: optional(registration.first_name),
            last_name: optional(registration.last_name),
        };
        self.sign_in(user)
    }

    fn sign_in(&mut self, user: User) -> SessionResponse {
        if let Err(e) = self.store.save(&user.to_record()) {
            tracing::error!("failed to persist session: {e}");
            return SessionResponse::StoreFailed(format!("could not save session: {e}"));
        }
        tracing::info!(user = %user.id, role = %user.role, "signed in");
        self.user = Some(user.clone());
        SessionResponse::User(user)
    }

    fn logout(&mut self) -> SessionResponse {
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear stored session: {e}");
        }
        if let Some(u) = self.user.take() {
            tracing::info!(user = %u.id, "signed out");
        }
        SessionResponse::SignedOut
    }
}

/// Role granted by the demo login rules.
pub fn demo_role(credentials: &Credentials) -> UserRole {
    if credentials.password == DEMO_ADMIN_PASSWORD {
        if credentials.email == DEMO_SUPER_ADMIN_EMAIL {
            return UserRole::SuperAdmin;
        }
        if credentials.email == DEMO_ADMIN_EMAIL {
            return UserRole::Admin;
        }
    }
    UserRole::Farmer
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
