//! Statistics endpoints

use axum::{extract::State, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Booking statistics response
#[derive(Serialize, ToSchema)]
pub struct BookingStatsResponse {
    /// Total number of bookings
    pub total: i64,
    /// Bookings per status
    pub by_status: Vec<StatEntry>,
    /// Active bookings past their end date
    pub overdue: i64,
    /// Revenue of completed bookings
    pub completed_revenue: Decimal,
    /// Revenue of approved and active bookings
    pub expected_revenue: Decimal,
    pub equipment_total: i64,
    /// Equipment currently held by a booking
    pub equipment_checked_out: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    /// Label
    pub label: String,
    /// Value
    pub value: i64,
}

/// Get booking statistics
#[utoipa::path(
    get,
    path = "/stats/bookings",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Booking statistics", body = BookingStatsResponse),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn get_booking_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BookingStatsResponse>> {
    claims.require_staff()?;

    let stats = state.services.stats.booking_statistics(Utc::now()).await?;
    Ok(Json(stats))
}
