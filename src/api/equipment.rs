//! Equipment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        booking::{BookingDetails, DateRange},
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
    },
    services::predictions::AvailabilityForecast,
};

use super::AuthenticatedUser;

/// Date range query for availability forecasts
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// First rental day
    pub start_date: NaiveDate,
    /// Return day (exclusive)
    pub end_date: NaiveDate,
}

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of equipment", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.equipment.list().await?;
    Ok(Json(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// Create equipment
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Staff rights required")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    claims.require_staff()?;

    let created = state.services.equipment.create(&data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    claims.require_staff()?;

    let updated = state.services.equipment.update(id, &data).await?;
    Ok(Json(updated))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "Equipment has open bookings")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bookings of an equipment item
#[utoipa::path(
    get,
    path = "/equipment/{id}/bookings",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Bookings of the equipment", body = Vec<BookingDetails>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    claims.require_staff()?;

    let now = Utc::now();
    let bookings = state.services.equipment.bookings(id).await?;
    Ok(Json(bookings.into_iter().map(|b| b.details(now)).collect()))
}

/// Availability forecast for a date range
#[utoipa::path(
    get,
    path = "/equipment/{id}/availability",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID"), AvailabilityQuery),
    responses(
        (status = 200, description = "Availability forecast", body = AvailabilityForecast),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityForecast>> {
    let range = DateRange::new(query.start_date, query.end_date)?;
    let forecast = state.services.predictions.availability(id, range).await?;
    Ok(Json(forecast))
}

/// Available equipment from related categories
#[utoipa::path(
    get,
    path = "/equipment/{id}/suggestions",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Suggested equipment", body = Vec<Equipment>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_suggestions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Equipment>>> {
    let suggestions = state.services.predictions.suggestions(id).await?;
    Ok(Json(suggestions))
}
