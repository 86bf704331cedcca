//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        booking::{BookingDetails, BookingQuery},
        user::{CreateUser, User},
    },
};

use super::AuthenticatedUser;

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin rights required"),
        (status = 409, description = "Login already exists")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_admin()?;

    let created = state.services.auth.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Insufficient rights"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    claims.require_self_or_staff(id)?;

    let user = state.services.auth.get_user(id).await?;
    Ok(Json(user))
}

/// Bookings made by a user
#[utoipa::path(
    get,
    path = "/users/{id}/bookings",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Bookings of the user", body = Vec<BookingDetails>),
        (status = 403, description = "Insufficient rights"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_bookings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    claims.require_self_or_staff(id)?;
    state.services.auth.get_user(id).await?;

    let now = Utc::now();
    let bookings = state
        .services
        .bookings
        .list(&BookingQuery {
            user_id: Some(id),
            ..Default::default()
        })
        .await?;

    Ok(Json(bookings.into_iter().map(|b| b.details(now)).collect()))
}
