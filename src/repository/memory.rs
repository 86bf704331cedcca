//! In-process store used by the `memory` backend and by tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingQuery, BookingStatus, DateRange, NewBooking},
        equipment::{CreateEquipment, Equipment, EquipmentStatus, UpdateEquipment},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    equipment: BTreeMap<i32, Equipment>,
    bookings: BTreeMap<i32, Booking>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Same guarantee as the exclusion constraint on the bookings table
    fn ensure_no_overlap(&self, equipment_id: i32, range: &DateRange, exclude: Option<i32>) -> AppResult<()> {
        let clash = self.bookings.values().any(|b| {
            b.equipment_id == equipment_id && Some(b.id) != exclude && b.blocks(range)
        });
        if clash {
            return Err(AppError::Conflict(
                "Booking overlaps an existing booking for this equipment".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store keeping every table in memory behind a single lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn user_get_by_id(&self, id: i32) -> AppResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn user_get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }

    async fn user_create(&self, user: &NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.login == user.login) {
            return Err(AppError::Conflict(format!("User '{}' already exists", user.login)));
        }
        let record = User {
            id: tables.next_id(),
            login: user.login.clone(),
            password_hash: user.password_hash.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn equipment_list(&self) -> AppResult<Vec<Equipment>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Equipment> = tables.equipment.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn equipment_get(&self, id: i32) -> AppResult<Equipment> {
        self.tables
            .read()
            .await
            .equipment
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = Equipment {
            id: tables.next_id(),
            name: data.name.clone(),
            category: data.category.clone(),
            status: EquipmentStatus::Available,
            daily_rate: data.daily_rate,
            weekly_rate: data.weekly_rate,
            monthly_rate: data.monthly_rate,
            serial_number: data.serial_number.clone(),
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.equipment.insert(record.id, record.clone());
        Ok(record)
    }

    async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tables = self.tables.write().await;
        let record = tables
            .equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;
        data.apply_to(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn equipment_delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.bookings.values().any(|b| b.equipment_id == id) {
            return Err(AppError::Conflict(format!("Equipment {} is still referenced", id)));
        }
        tables
            .equipment
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn booking_get(&self, id: i32) -> AppResult<Booking> {
        self.tables
            .read()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
    }

    async fn booking_list(&self, query: &BookingQuery) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn bookings_overlapping(
        &self,
        equipment_id: i32,
        range: DateRange,
        exclude: Option<i32>,
    ) -> AppResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.equipment_id == equipment_id && Some(b.id) != exclude && b.blocks(&range))
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_date);
        Ok(rows)
    }

    async fn booking_insert(&self, booking: &NewBooking) -> AppResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.equipment.contains_key(&booking.equipment_id) {
            return Err(AppError::NotFound(format!("Equipment {} not found", booking.equipment_id)));
        }
        tables.ensure_no_overlap(booking.equipment_id, &booking.range, None)?;

        let now = Utc::now();
        let record = Booking {
            id: tables.next_id(),
            equipment_id: booking.equipment_id,
            user_id: booking.user_id,
            start_date: booking.range.start,
            end_date: booking.range.end,
            status: BookingStatus::Pending,
            daily_rate: booking.rates.daily_rate,
            weekly_rate: booking.rates.weekly_rate,
            monthly_rate: booking.rates.monthly_rate,
            notes: booking.notes.clone(),
            approved_by: None,
            approved_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            checked_out_by: None,
            check_out_date: None,
            checked_in_by: None,
            check_in_date: None,
            return_condition: None,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.insert(record.id, record.clone());
        Ok(record)
    }

    async fn booking_save(
        &self,
        booking: &Booking,
        equipment_status: Option<EquipmentStatus>,
    ) -> AppResult<Booking> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&booking.id) {
            return Err(AppError::NotFound(format!("Booking with id {} not found", booking.id)));
        }
        if booking.status.is_blocking() {
            tables.ensure_no_overlap(booking.equipment_id, &booking.range(), Some(booking.id))?;
        }

        if let Some(status) = equipment_status {
            let equipment = tables.equipment.get_mut(&booking.equipment_id).ok_or_else(|| {
                AppError::NotFound(format!("Equipment {} not found", booking.equipment_id))
            })?;
            equipment.status = status;
            equipment.updated_at = Utc::now();
        }

        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }
}
