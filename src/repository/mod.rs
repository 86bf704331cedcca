//! Repository layer for database operations

pub mod bookings;
pub mod equipment;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingQuery, DateRange, NewBooking},
        equipment::{CreateEquipment, Equipment, EquipmentStatus, UpdateEquipment},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;

/// Persistence operations used by the services.
///
/// Implementations must reject any insert or save that would leave two
/// blocking bookings with overlapping ranges on the same equipment, failing
/// with [`AppError::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Check the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn user_get_by_id(&self, id: i32) -> AppResult<User>;
    async fn user_get_by_login(&self, login: &str) -> AppResult<Option<User>>;
    async fn user_create(&self, user: &NewUser) -> AppResult<User>;

    async fn equipment_list(&self) -> AppResult<Vec<Equipment>>;
    async fn equipment_get(&self, id: i32) -> AppResult<Equipment>;
    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment>;
    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment>;
    async fn equipment_delete(&self, id: i32) -> AppResult<()>;

    async fn booking_get(&self, id: i32) -> AppResult<Booking>;
    /// Bookings matching the filter, newest first
    async fn booking_list(&self, query: &BookingQuery) -> AppResult<Vec<Booking>>;
    /// Blocking bookings on `equipment_id` overlapping `range`
    async fn bookings_overlapping(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Booking>>;
    async fn booking_insert(&self, booking: &NewBooking) -> AppResult<Booking>;
    /// Persist a modified booking and, in the same unit of work, the new
    /// status of its equipment
    async fn booking_save(
        &self,
        booking: &Booking,
        equipment_status: Option<EquipmentStatus>,
    ) -> AppResult<Booking>;
}

pub type SharedStore = Arc<dyn Store>;

/// PostgreSQL-backed store holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub equipment: equipment::EquipmentRepository,
    pub bookings: bookings::BookingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            bookings: bookings::BookingsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Map PostgreSQL constraint violations to domain errors
pub(crate) fn map_constraint_error(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            // exclusion_violation: overlapping open bookings
            Some("23P01") => {
                return AppError::Conflict(format!(
                    "{} overlaps an existing booking for this equipment",
                    what
                ))
            }
            // unique_violation
            Some("23505") => return AppError::Conflict(format!("{} already exists", what)),
            // foreign_key_violation
            Some("23503") => {
                return AppError::Conflict(format!("{} is still referenced", what))
            }
            _ => {}
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl Store for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn user_get_by_id(&self, id: i32) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    async fn user_get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        self.users.get_by_login(login).await
    }

    async fn user_create(&self, user: &NewUser) -> AppResult<User> {
        self.users.create(user).await
    }

    async fn equipment_list(&self) -> AppResult<Vec<Equipment>> {
        self.equipment.list().await
    }

    async fn equipment_get(&self, id: i32) -> AppResult<Equipment> {
        self.equipment.get_by_id(id).await
    }

    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        self.equipment.create(data).await
    }

    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        self.equipment.update(id, data).await
    }

    async fn equipment_delete(&self, id: i32) -> AppResult<()> {
        self.equipment.delete(id).await
    }

    async fn booking_get(&self, id: i32) -> AppResult<Booking> {
        self.bookings.get_by_id(id).await
    }

    async fn booking_list(&self, query: &BookingQuery) -> AppResult<Vec<Booking>> {
        self.bookings.list(query).await
    }

    async fn bookings_overlapping(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Booking>> {
        self.bookings.overlapping(equipment_id, range, exclude).await
    }

    async fn booking_insert(&self, booking: &NewBooking) -> AppResult<Booking> {
        self.bookings.insert(booking).await
    }

    async fn booking_save(
        &self,
        booking: &Booking,
        equipment_status: Option<EquipmentStatus>,
    ) -> AppResult<Booking> {
        self.bookings.save(booking, equipment_status).await
    }
}
