//! Bookings repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use super::map_constraint_error;
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingQuery, BookingStatus, DateRange, NewBooking},
        equipment::EquipmentStatus,
    },
};

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
    }

    /// List bookings matching the optional filters
    pub async fn list(&self, query: &BookingQuery) -> AppResult<Vec<Booking>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM bookings WHERE TRUE");

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(equipment_id) = query.equipment_id {
            builder.push(" AND equipment_id = ").push_bind(equipment_id);
        }
        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows = builder
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Open bookings on the equipment whose `[start, end)` range overlaps `range`
    pub async fn overlapping(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE equipment_id = $1
              AND status IN ('pending', 'approved', 'active')
              AND start_date < $3
              AND end_date > $2
              AND ($4::int IS NULL OR id <> $4)
            ORDER BY start_date
            "#,
        )
        .bind(equipment_id)
        .bind(range.start)
        .bind(range.end)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a new pending booking
    pub async fn insert(&self, booking: &NewBooking) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
                (equipment_id, user_id, start_date, end_date, status,
                 daily_rate, weekly_rate, monthly_rate, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(booking.equipment_id)
        .bind(booking.user_id)
        .bind(booking.range.start)
        .bind(booking.range.end)
        .bind(BookingStatus::Pending)
        .bind(booking.rates.daily_rate)
        .bind(booking.rates.weekly_rate)
        .bind(booking.rates.monthly_rate)
        .bind(&booking.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Booking"))
    }

    /// Write back a booking and optionally its equipment status in one transaction
    pub async fn save(
        &self,
        booking: &Booking,
        equipment_status: Option<EquipmentStatus>,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET
                start_date = $2, end_date = $3, status = $4,
                daily_rate = $5, weekly_rate = $6, monthly_rate = $7, notes = $8,
                approved_by = $9, approved_at = $10,
                cancelled_by = $11, cancelled_at = $12, cancellation_reason = $13,
                checked_out_by = $14, check_out_date = $15,
                checked_in_by = $16, check_in_date = $17, return_condition = $18,
                updated_at = $19
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.status)
        .bind(booking.daily_rate)
        .bind(booking.weekly_rate)
        .bind(booking.monthly_rate)
        .bind(&booking.notes)
        .bind(booking.approved_by)
        .bind(booking.approved_at)
        .bind(booking.cancelled_by)
        .bind(booking.cancelled_at)
        .bind(&booking.cancellation_reason)
        .bind(booking.checked_out_by)
        .bind(booking.check_out_date)
        .bind(booking.checked_in_by)
        .bind(booking.check_in_date)
        .bind(booking.return_condition)
        .bind(booking.updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Booking"))?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking.id)))?;

        if let Some(status) = equipment_status {
            sqlx::query("UPDATE equipment SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status)
                .bind(booking.equipment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(saved)
    }
}
