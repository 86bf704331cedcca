//! Booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{BookingDetails, BookingQuery, BookingStatus, CreateBooking, DateRange, UpdateBooking},
        lifecycle::{CancelBooking, CheckInBooking},
    },
};

use super::AuthenticatedUser;

/// Conflict check query
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ConflictQuery {
    pub equipment_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Booking to ignore, e.g. the one being rescheduled
    pub exclude_booking_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConflictResponse {
    pub has_conflict: bool,
    /// Ids of the overlapping open bookings
    pub conflicting_bookings: Vec<i32>,
}

/// List bookings (customers only see their own)
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(BookingQuery),
    responses(
        (status = 200, description = "List of bookings", body = Vec<BookingDetails>)
    )
)]
pub async fn list_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<BookingQuery>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    if !claims.is_staff() {
        query.user_id = Some(claims.user_id);
    }

    let now = Utc::now();
    let bookings = state.services.bookings.list(&query).await?;
    Ok(Json(bookings.into_iter().map(|b| b.details(now)).collect()))
}

/// Request a booking
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Booking created", body = BookingDetails),
        (status = 400, description = "Invalid dates or rates"),
        (status = 403, description = "Rates or another user's booking need staff rights"),
        (status = 404, description = "Equipment or user not found"),
        (status = 409, description = "Equipment already booked for these dates")
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<BookingDetails>)> {
    let user_id = data.user_id.unwrap_or(claims.user_id);
    claims.require_self_or_staff(user_id)?;
    if data.rates.is_some() {
        claims.require_staff()?;
    }

    let booking = state.services.bookings.create_booking(user_id, data).await?;
    Ok((StatusCode::CREATED, Json(booking.details(Utc::now()))))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = BookingDetails),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookingDetails>> {
    let booking = state.services.bookings.get(id).await?;
    claims.require_self_or_staff(booking.user_id)?;

    Ok(Json(booking.details(Utc::now())))
}

/// Change dates, rates or notes
#[utoipa::path(
    put,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = UpdateBooking,
    responses(
        (status = 200, description = "Booking updated", body = BookingDetails),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Conflict or booking no longer modifiable")
    )
)]
pub async fn update_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBooking>,
) -> AppResult<Json<BookingDetails>> {
    if !claims.is_staff() {
        if data.changes_rates() {
            return Err(AppError::Authorization(
                "Staff rights required to set booking rates".to_string(),
            ));
        }
        let booking = state.services.bookings.get(id).await?;
        claims.require_self_or_staff(booking.user_id)?;
        if booking.status != BookingStatus::Pending {
            return Err(AppError::Authorization(
                "Only pending bookings can be modified by their owner".to_string(),
            ));
        }
    }

    let booking = state.services.bookings.update_booking(id, data).await?;
    Ok(Json(booking.details(Utc::now())))
}

/// Check whether a date range is free on an equipment
#[utoipa::path(
    get,
    path = "/bookings/conflicts",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(ConflictQuery),
    responses(
        (status = 200, description = "Conflict check result", body = ConflictResponse),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn check_conflicts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ConflictQuery>,
) -> AppResult<Json<ConflictResponse>> {
    let range = DateRange::new(query.start_date, query.end_date)?;
    let conflicts = state
        .services
        .bookings
        .conflicts(query.equipment_id, range, query.exclude_booking_id)
        .await?;

    Ok(Json(ConflictResponse {
        has_conflict: !conflicts.is_empty(),
        conflicting_bookings: conflicts.into_iter().map(|b| b.id).collect(),
    }))
}

/// Active bookings past their end date
#[utoipa::path(
    get,
    path = "/bookings/overdue",
    tag = "bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue bookings", body = Vec<BookingDetails>),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookingDetails>>> {
    claims.require_staff()?;

    let now = Utc::now();
    let bookings = state.services.bookings.list_overdue(now).await?;
    Ok(Json(bookings.into_iter().map(|b| b.details(now)).collect()))
}

/// Approve a pending booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/approve",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking approved", body = BookingDetails),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Invalid transition or conflicting booking")
    )
)]
pub async fn approve_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookingDetails>> {
    claims.require_staff()?;

    let booking = state.services.bookings.approve(id, claims.user_id).await?;
    Ok(Json(booking.details(Utc::now())))
}

/// Cancel a booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body(content = CancelBooking, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingDetails),
        (status = 403, description = "Customers may only cancel their own pending bookings"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already closed")
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    body: Option<Json<CancelBooking>>,
) -> AppResult<Json<BookingDetails>> {
    let data = body.map(|Json(data)| data).unwrap_or_default();
    data.validate()?;

    if !claims.is_staff() {
        let booking = state.services.bookings.get(id).await?;
        claims.require_self_or_staff(booking.user_id)?;
        if booking.status != BookingStatus::Pending {
            return Err(AppError::Authorization(
                "Only pending bookings can be cancelled by their owner".to_string(),
            ));
        }
    }

    let booking = state
        .services
        .bookings
        .cancel(id, claims.user_id, data.reason)
        .await?;
    Ok(Json(booking.details(Utc::now())))
}

/// Hand an approved booking's equipment over to the customer
#[utoipa::path(
    post,
    path = "/bookings/{id}/check-out",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Equipment checked out", body = BookingDetails),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking is not approved")
    )
)]
pub async fn check_out_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookingDetails>> {
    claims.require_staff()?;

    let booking = state.services.bookings.check_out(id, claims.user_id).await?;
    Ok(Json(booking.details(Utc::now())))
}

/// Record the return of the equipment
#[utoipa::path(
    post,
    path = "/bookings/{id}/check-in",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Booking ID")),
    request_body = CheckInBooking,
    responses(
        (status = 200, description = "Equipment checked in", body = BookingDetails),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking is not active")
    )
)]
pub async fn check_in_booking(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CheckInBooking>,
) -> AppResult<Json<BookingDetails>> {
    claims.require_staff()?;

    let booking = state
        .services
        .bookings
        .check_in(id, claims.user_id, data.condition)
        .await?;
    Ok(Json(booking.details(Utc::now())))
}
