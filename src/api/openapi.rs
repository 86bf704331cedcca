//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, bookings, equipment, health, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cinerent API",
        version = "1.0.0",
        description = "Film equipment rental REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Users
        users::create_user,
        users::get_user,
        users::get_user_bookings,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::get_equipment_bookings,
        equipment::get_availability,
        equipment::get_suggestions,
        // Bookings
        bookings::list_bookings,
        bookings::create_booking,
        bookings::get_booking,
        bookings::update_booking,
        bookings::check_conflicts,
        bookings::list_overdue,
        bookings::approve_booking,
        bookings::cancel_booking,
        bookings::check_out_booking,
        bookings::check_in_booking,
        // Stats
        stats::get_booking_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Users
            crate::models::user::User,
            crate::models::user::UserRole,
            crate::models::user::CreateUser,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            equipment::AvailabilityQuery,
            crate::services::predictions::AvailabilityForecast,
            // Bookings
            crate::models::booking::Booking,
            crate::models::booking::BookingDetails,
            crate::models::booking::BookingStatus,
            crate::models::booking::ReturnCondition,
            crate::models::booking::Rates,
            crate::models::booking::CreateBooking,
            crate::models::booking::UpdateBooking,
            crate::models::booking::BookingQuery,
            crate::models::lifecycle::CancelBooking,
            crate::models::lifecycle::CheckInBooking,
            bookings::ConflictQuery,
            bookings::ConflictResponse,
            // Stats
            stats::BookingStatsResponse,
            stats::StatEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "equipment", description = "Equipment catalog and availability"),
        (name = "bookings", description = "Booking lifecycle"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
