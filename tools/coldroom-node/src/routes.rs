use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use coldroom_common::booking::{today, Booking, BookingId, BookingStatus};
use coldroom_common::currency::format_amount;
use coldroom_common::demo::platform_users;
use coldroom_common::facility::{Facility, FacilityFilter, FacilityId};
use coldroom_common::identity::{filter_users, NavItem, User, UserRole};
use coldroom_common::livestock::{
    LivestockFilter, LivestockId, LivestockSort, LivestockStatus, LivestockUnit, NewLivestock,
};
use coldroom_common::market::BookingFilter;
use coldroom_common::MarketError;
use coldroom_session_delegate::{Credentials, Registration, SessionRequest};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiError;
use crate::payment::PaymentState;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/session", get(session_handler))
        .route("/session/login", post(login_handler))
        .route("/session/register", post(register_handler))
        .route("/session/logout", post(logout_handler))
        .route("/facilities", get(facilities_handler))
        .route(
            "/livestock",
            get(list_livestock_handler).post(add_livestock_handler),
        )
        .route("/livestock/{id}/status", post(livestock_status_handler))
        .route(
            "/bookings",
            get(list_bookings_handler).post(create_booking_handler),
        )
        .route(
            "/bookings/{id}/pay",
            get(payment_state_handler)
                .post(pay_handler)
                .delete(cancel_payment_handler),
        )
        .route("/bookings/{id}/approve", post(approve_handler))
        .route("/bookings/{id}/reject", post(reject_handler))
        .route("/admin/users", get(users_handler))
        .layer(cors)
        .with_state(state)
}

// ── Session ──

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub display_name: String,
    pub nav: Vec<NavItem>,
}

impl From<User> for SessionView {
    fn from(user: User) -> Self {
        SessionView {
            display_name: user.display_name(),
            nav: user.role.nav_items().to_vec(),
            user,
        }
    }
}

async fn session_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.current_user().await?.into()))
}

async fn sign_in(state: &AppState, request: SessionRequest) -> ApiResult<Json<SessionView>> {
    let user = state
        .session_request(request)
        .await?
        .ok_or(MarketError::Unauthorized)?;
    Ok(Json(user.into()))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<SessionView>> {
    sign_in(&state, SessionRequest::Login(credentials)).await
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<Registration>,
) -> ApiResult<Json<SessionView>> {
    sign_in(&state, SessionRequest::Register(registration)).await
}

async fn logout_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.session_request(SessionRequest::Logout).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Catalog ──

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

async fn facilities_handler(
    State(state): State<Arc<AppState>>,
    Query(search): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Facility>>> {
    state.current_user().await?;
    let filter = FacilityFilter { query: search.q };
    let market = state.market.lock().await;
    Ok(Json(
        market
            .catalog
            .list_facilities(&filter)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct LivestockQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<LivestockStatus>,
    #[serde(default)]
    pub sort: Option<LivestockSort>,
}

async fn list_livestock_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LivestockQuery>,
) -> ApiResult<Json<Vec<LivestockUnit>>> {
    let user = state.current_user().await?;
    let filter = LivestockFilter {
        query: query.q,
        status: query.status,
    };
    let market = state.market.lock().await;
    let units = market
        .catalog
        .list_livestock(&user.id, &filter, query.sort.unwrap_or_default());
    Ok(Json(units.into_iter().cloned().collect()))
}

fn require_livestock_owner(user: &User) -> Result<(), MarketError> {
    if user.role.nav_items().contains(&NavItem::Livestock) {
        Ok(())
    } else {
        Err(MarketError::Forbidden(format!(
            "{} accounts do not keep livestock",
            user.role
        )))
    }
}

async fn add_livestock_handler(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewLivestock>,
) -> ApiResult<(StatusCode, Json<LivestockUnit>)> {
    let user = state.current_user().await?;
    require_livestock_owner(&user)?;
    let unit = state.market.lock().await.catalog.add_livestock(&user.id, new)?;
    info!(livestock = %unit.id, species = unit.species.name(), "livestock listed");
    Ok((StatusCode::CREATED, Json(unit)))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: LivestockStatus,
}

async fn livestock_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<LivestockUnit>> {
    let user = state.current_user().await?;
    let unit = state.market.lock().await.catalog.update_livestock_status(
        &user.id,
        &LivestockId(id),
        change.status,
    )?;
    Ok(Json(unit))
}

// ── Bookings ──

/// A booking with its total formatted for display.
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub total_display: String,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        BookingView {
            total_display: format_amount(booking.total_price),
            booking,
        }
    }
}

async fn list_bookings_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookingFilter>,
) -> ApiResult<Json<Vec<BookingView>>> {
    let user = state.current_user().await?;
    let market = state.market.lock().await;
    Ok(Json(
        market
            .list_bookings(&user, &filter)
            .into_iter()
            .cloned()
            .map(BookingView::from)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateBooking {
    pub facility_id: FacilityId,
    #[serde(default)]
    pub item_name: String,
    pub duration_days: u32,
}

async fn create_booking_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBooking>,
) -> ApiResult<(StatusCode, Json<BookingView>)> {
    let user = state.current_user().await?;
    let booking = state.market.lock().await.create_booking(
        &user,
        &req.facility_id,
        &req.item_name,
        req.duration_days,
        today(),
    )?;
    info!(
        booking = %booking.id,
        facility = %booking.facility,
        total = booking.total_price,
        "booking requested"
    );
    Ok((StatusCode::CREATED, Json(booking.into())))
}

async fn pay_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<PaymentState>)> {
    let user = state.current_user().await?;
    let id = BookingId(id);
    {
        let market = state.market.lock().await;
        let amount = market.ensure_payer(&user, &id)?.total_price;
        state.payments.start(id.clone(), amount)?;
    }
    Ok((StatusCode::ACCEPTED, Json(state.payments.state(&id))))
}

#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub cancelled: bool,
}

async fn cancel_payment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResult>> {
    let user = state.current_user().await?;
    let id = BookingId(id);
    state.market.lock().await.ensure_payer(&user, &id)?;
    Ok(Json(CancelResult {
        cancelled: state.payments.cancel(&id),
    }))
}

async fn payment_state_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PaymentState>> {
    let user = state.current_user().await?;
    let id = BookingId(id);
    state.market.lock().await.visible_booking(&user, &id)?;
    Ok(Json(state.payments.state(&id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct Decision {
    /// The status the caller last saw.
    #[serde(default)]
    pub expected: Option<BookingStatus>,
}

async fn approve_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(decision): Query<Decision>,
) -> ApiResult<Json<BookingView>> {
    let user = state.current_user().await?;
    let booking = state
        .market
        .lock()
        .await
        .approve(&user, &BookingId(id), decision.expected)?;
    info!(booking = %booking.id, "booking approved");
    Ok(Json(booking.into()))
}

async fn reject_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(decision): Query<Decision>,
) -> ApiResult<Json<BookingView>> {
    let user = state.current_user().await?;
    let booking = state
        .market
        .lock()
        .await
        .reject(&user, &BookingId(id), decision.expected)?;
    info!(booking = %booking.id, "booking rejected");
    Ok(Json(booking.into()))
}

// ── Admin ──

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

async fn users_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let user = state.current_user().await?;
    if !user.role.can_administer() {
        let msg = format!("{} accounts cannot manage users", user.role);
        return Err(MarketError::Forbidden(msg).into());
    }
    let users = platform_users();
    let found = filter_users(&users, query.q.as_deref().unwrap_or(""), query.role);
    Ok(Json(found.into_iter().cloned().collect()))
}
