use std::sync::Arc;
use std::time::Duration;

use coldroom_common::booking::today;
use coldroom_common::catalog::Catalog;
use coldroom_common::demo::{public_facilities, seed_marketplace};
use coldroom_common::identity::User;
use coldroom_common::market::Marketplace;
use coldroom_common::{MarketError, Result};
use coldroom_session_delegate::{SessionDelegate, SessionRequest, SessionResponse};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::payment::{run_payment_applier, PaymentGateway, PaymentRunner};

/// Everything one running node owns: the session, its marketplace, and the
/// payment tasks acting on it.
pub struct AppState {
    pub market: Arc<Mutex<Marketplace>>,
    pub session: Mutex<SessionDelegate>,
    pub payments: PaymentRunner,
    seed_demo: bool,
}

impl AppState {
    /// Build the state and spawn its payment applier. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        session: SessionDelegate,
        gateway: Arc<dyn PaymentGateway>,
        seed_demo: bool,
    ) -> Arc<Self> {
        let market = fresh_market(session.current_user(), seed_demo);
        let market = Arc::new(Mutex::new(market));
        let (tx, rx) = mpsc::unbounded_channel();
        let payments = PaymentRunner::new(gateway, tx);
        tokio::spawn(run_payment_applier(market.clone(), payments.clone(), rx));

        Arc::new(AppState {
            market,
            session: Mutex::new(session),
            payments,
            seed_demo,
        })
    }

    pub async fn current_user(&self) -> Result<User> {
        self.session
            .lock()
            .await
            .current_user()
            .cloned()
            .ok_or(MarketError::Unauthorized)
    }

    /// Forward a request to the session delegate. Signing in or out resets
    /// the marketplace for the new session.
    pub async fn session_request(&self, request: SessionRequest) -> Result<Option<User>> {
        let changes_session = !matches!(request, SessionRequest::CurrentUser);
        let response = self.session.lock().await.handle_request(request);
        let user = match response {
            SessionResponse::User(u) => Some(u),
            SessionResponse::SignedOut => None,
            SessionResponse::Error(msg) => return Err(MarketError::Validation(msg)),
            SessionResponse::StoreFailed(msg) => return Err(MarketError::Storage(msg)),
        };
        if changes_session {
            self.payments.cancel_all();
            *self.market.lock().await = fresh_market(user.as_ref(), self.seed_demo);
        }
        Ok(user)
    }
}

fn fresh_market(user: Option<&User>, seed_demo: bool) -> Marketplace {
    let Some(user) = user else {
        return Marketplace::default();
    };
    if seed_demo {
        match seed_marketplace(user) {
            Ok(market) => return market,
            Err(e) => error!("demo seed failed, starting empty: {e}"),
        }
    }
    let mut catalog = Catalog::new();
    for facility in public_facilities() {
        if let Err(e) = catalog.register_facility(facility) {
            error!("skipping facility: {e}");
        }
    }
    Marketplace::new(catalog)
}

/// Periodically complete approved bookings whose storage period is over.
pub async fn run_settlement(market: Arc<Mutex<Marketplace>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if market.lock().await.settle_completed(today()) {
            info!("settled finished bookings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::SimulatedGateway;
    use coldroom_common::identity::{UserRecord, UserRole};
    use coldroom_common::market::BookingFilter;
    use coldroom_session_delegate::{
        Credentials, MemoryStore, Registration, RegistrationTrack, SessionStore,
    };

    fn state(seed_demo: bool) -> Arc<AppState> {
        AppState::spawn(
            SessionDelegate::restore(Box::new(MemoryStore::new())),
            Arc::new(SimulatedGateway::new(Duration::from_millis(5))),
            seed_demo,
        )
    }

    #[tokio::test]
    async fn no_user_until_login() {
        let s = state(true);
        assert_eq!(s.current_user().await, Err(MarketError::Unauthorized));
        let user = s
            .session_request(SessionRequest::Login(Credentials::default()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Farmer);
        assert_eq!(s.current_user().await.unwrap(), user);
    }

    #[tokio::test]
    async fn switching_sessions_reseeds_market() {
        let s = state(true);
        s.session_request(SessionRequest::Register(Registration {
            track: RegistrationTrack::ColdRoom,
            email: "owner@coldhub.com".into(),
            phone: String::new(),
            password: String::new(),
            first_name: "Grace".into(),
            last_name: String::new(),
        }))
        .await
        .unwrap();
        let owner = s.current_user().await.unwrap();
        assert_eq!(
            s.market
                .lock()
                .await
                .list_bookings(&owner, &BookingFilter::default())
                .len(),
            2
        );

        s.session_request(SessionRequest::Logout).await.unwrap();
        assert!(s
            .market
            .lock()
            .await
            .list_bookings(&owner, &BookingFilter::default())
            .is_empty());
    }

    #[tokio::test]
    async fn unseeded_session_has_directory_only() {
        let s = state(false);
        let farmer = s
            .session_request(SessionRequest::Login(Credentials::default()))
            .await
            .unwrap()
            .unwrap();
        let market = s.market.lock().await;
        assert_eq!(market.catalog.list_facilities(&Default::default()).len(), 3);
        assert!(market
            .catalog
            .list_livestock(&farmer.id, &Default::default(), Default::default())
            .is_empty());
    }

    #[tokio::test]
    async fn session_errors_become_validation_errors() {
        let s = state(true);
        let err = s
            .session_request(SessionRequest::Register(Registration {
                track: RegistrationTrack::Farmer,
                email: String::new(),
                phone: String::new(),
                password: String::new(),
                first_name: String::new(),
                last_name: String::new(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn load(&self) -> Option<UserRecord> {
            None
        }

        fn save(&mut self, _record: &UserRecord) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }

        fn clear(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failures_are_not_validation_errors() {
        let s = AppState::spawn(
            SessionDelegate::restore(Box::new(FailingStore)),
            Arc::new(SimulatedGateway::new(Duration::from_millis(5))),
            true,
        );
        let err = s
            .session_request(SessionRequest::Login(Credentials::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Storage(msg) if msg.contains("disk full")));
        assert_eq!(s.current_user().await, Err(MarketError::Unauthorized));
    }
}
