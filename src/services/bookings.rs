//! Booking lifecycle service: creation, conflict resolution and transitions

use chrono::{DateTime, Utc};
use validator::Validate;

use super::locks::EquipmentLocks;
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingQuery, BookingStatus, CreateBooking, DateRange, NewBooking, UpdateBooking},
        equipment::EquipmentStatus,
        lifecycle::BookingEvent,
        ReturnCondition,
    },
    repository::SharedStore,
};

#[derive(Clone)]
pub struct BookingsService {
    store: SharedStore,
    locks: EquipmentLocks,
}

impl BookingsService {
    pub fn new(store: SharedStore, locks: EquipmentLocks) -> Self {
        Self { store, locks }
    }

    pub async fn get(&self, id: i32) -> AppResult<Booking> {
        self.store.booking_get(id).await
    }

    pub async fn list(&self, query: &BookingQuery) -> AppResult<Vec<Booking>> {
        self.store.booking_list(query).await
    }

    /// Open bookings on the equipment overlapping `range`, minus `exclude`
    pub async fn conflicts(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Booking>> {
        self.store.bookings_overlapping(equipment_id, range, exclude).await
    }

    /// Whether an open booking on the equipment overlaps `range`
    pub async fn has_conflict(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<bool> {
        Ok(!self.conflicts(equipment_id, range, exclude).await?.is_empty())
    }

    async fn ensure_no_conflict(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<()> {
        let conflicts = self.conflicts(equipment_id, range, exclude).await?;
        if let Some(existing) = conflicts.first() {
            tracing::warn!(
                equipment_id,
                conflicting_booking = existing.id,
                "Booking request overlaps an open booking"
            );
            return Err(AppError::Conflict(format!(
                "Equipment {} is already booked from {} to {} (booking {})",
                equipment_id, existing.start_date, existing.end_date, existing.id
            )));
        }
        Ok(())
    }

    /// Create a pending booking for `user_id`
    pub async fn create_booking(&self, user_id: i32, data: CreateBooking) -> AppResult<Booking> {
        data.validate()?;
        let range = DateRange::new(data.start_date, data.end_date)?;

        self.store.user_get_by_id(user_id).await?;
        let equipment = self.store.equipment_get(data.equipment_id).await?;
        if !equipment.status.is_bookable() {
            return Err(AppError::Conflict(format!(
                "Equipment {} is not available for booking ({})",
                equipment.id, equipment.status
            )));
        }

        let rates = data.rates.unwrap_or_else(|| equipment.rates());
        rates.validate()?;

        let _guard = self.locks.acquire(equipment.id).await;
        self.ensure_no_conflict(equipment.id, range, None).await?;

        let booking = self
            .store
            .booking_insert(&NewBooking {
                equipment_id: equipment.id,
                user_id,
                range,
                rates,
                notes: data.notes,
            })
            .await?;

        tracing::info!(
            booking_id = booking.id,
            equipment_id = booking.equipment_id,
            user_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// Change dates, rates or notes of a booking that is not yet checked out
    pub async fn update_booking(&self, id: i32, data: UpdateBooking) -> AppResult<Booking> {
        data.validate()?;

        let equipment_id = self.store.booking_get(id).await?.equipment_id;
        let _guard = self.locks.acquire(equipment_id).await;

        let mut booking = self.store.booking_get(id).await?;
        if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Approved) {
            return Err(AppError::InvalidTransition(format!(
                "cannot modify a {} booking",
                booking.status
            )));
        }

        let range = DateRange::new(
            data.start_date.unwrap_or(booking.start_date),
            data.end_date.unwrap_or(booking.end_date),
        )?;
        booking.start_date = range.start;
        booking.end_date = range.end;
        if let Some(rate) = data.daily_rate {
            booking.daily_rate = rate;
        }
        if let Some(rate) = data.weekly_rate {
            booking.weekly_rate = rate;
        }
        if let Some(rate) = data.monthly_rate {
            booking.monthly_rate = rate;
        }
        if data.notes.is_some() {
            booking.notes = data.notes;
        }
        booking.rates().validate()?;

        self.ensure_no_conflict(equipment_id, range, Some(id)).await?;

        booking.updated_at = Utc::now();
        let saved = self.store.booking_save(&booking, None).await?;
        tracing::info!(booking_id = id, equipment_id, "Booking updated");
        Ok(saved)
    }

    pub async fn approve(&self, id: i32, actor: i32) -> AppResult<Booking> {
        self.transition(id, BookingEvent::Approve { actor }).await
    }

    pub async fn cancel(&self, id: i32, actor: i32, reason: Option<String>) -> AppResult<Booking> {
        self.transition(id, BookingEvent::Cancel { actor, reason }).await
    }

    pub async fn check_out(&self, id: i32, actor: i32) -> AppResult<Booking> {
        self.transition(id, BookingEvent::CheckOut { actor }).await
    }

    pub async fn check_in(&self, id: i32, actor: i32, condition: ReturnCondition) -> AppResult<Booking> {
        self.transition(id, BookingEvent::CheckIn { actor, condition }).await
    }

    async fn transition(&self, id: i32, event: BookingEvent) -> AppResult<Booking> {
        let equipment_id = self.store.booking_get(id).await?.equipment_id;
        let _guard = self.locks.acquire(equipment_id).await;

        let mut booking = self.store.booking_get(id).await?;
        let previous = booking.status;
        booking.apply(&event, Utc::now())?;

        if let BookingEvent::Approve { .. } = event {
            let equipment = self.store.equipment_get(equipment_id).await?;
            if !equipment.status.is_bookable() {
                return Err(AppError::Conflict(format!(
                    "Equipment {} is not available ({})",
                    equipment_id, equipment.status
                )));
            }
            self.ensure_no_conflict(equipment_id, booking.range(), Some(id)).await?;
        }

        let equipment_status = self.equipment_status_after(&booking, previous, &event).await?;
        let saved = self.store.booking_save(&booking, equipment_status).await?;

        tracing::info!(
            booking_id = id,
            equipment_id,
            actor = event.actor(),
            from = %previous,
            to = %saved.status,
            "Booking {}",
            event.name()
        );
        Ok(saved)
    }

    /// Equipment status to write together with the transition, if any
    async fn equipment_status_after(
        &self,
        booking: &Booking,
        previous: BookingStatus,
        event: &BookingEvent,
    ) -> AppResult<Option<EquipmentStatus>> {
        match event {
            BookingEvent::Approve { .. } | BookingEvent::CheckOut { .. } => {
                Ok(Some(EquipmentStatus::CheckedOut))
            }
            BookingEvent::CheckIn { .. } => {
                if self.held_by_other(booking).await? {
                    Ok(Some(EquipmentStatus::CheckedOut))
                } else {
                    Ok(Some(EquipmentStatus::Available))
                }
            }
            BookingEvent::Cancel { .. } => {
                if !previous.holds_equipment() {
                    return Ok(None);
                }
                let equipment = self.store.equipment_get(booking.equipment_id).await?;
                if equipment.status != EquipmentStatus::CheckedOut {
                    return Ok(None);
                }
                let still_held = self.held_by_other(booking).await?;
                Ok((!still_held).then_some(EquipmentStatus::Available))
            }
        }
    }

    /// Whether another approved or active booking holds the same equipment
    async fn held_by_other(&self, booking: &Booking) -> AppResult<bool> {
        let others = self
            .store
            .booking_list(&BookingQuery {
                equipment_id: Some(booking.equipment_id),
                ..Default::default()
            })
            .await?;
        Ok(others
            .iter()
            .any(|b| b.id != booking.id && b.status.holds_equipment()))
    }

    /// Active bookings past their end date, most overdue first
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Booking>> {
        let mut overdue: Vec<Booking> = self
            .store
            .booking_list(&BookingQuery {
                status: Some(BookingStatus::Active),
                ..Default::default()
            })
            .await?
            .into_iter()
            .filter(|b| b.is_overdue(now))
            .collect();
        overdue.sort_by_key(|b| (b.end_date, b.id));
        Ok(overdue)
    }
}
