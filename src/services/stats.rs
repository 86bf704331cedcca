//! Statistics service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    api::stats::{BookingStatsResponse, StatEntry},
    error::AppResult,
    models::{
        booking::{BookingQuery, BookingStatus},
        equipment::EquipmentStatus,
    },
    repository::SharedStore,
};

#[derive(Clone)]
pub struct StatsService {
    store: SharedStore,
}

impl StatsService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Booking counts, revenue and equipment usage as of `now`
    pub async fn booking_statistics(&self, now: DateTime<Utc>) -> AppResult<BookingStatsResponse> {
        let bookings = self.store.booking_list(&BookingQuery::default()).await?;
        let equipment = self.store.equipment_list().await?;

        let by_status = BookingStatus::ALL
            .iter()
            .map(|status| StatEntry {
                label: status.to_string(),
                value: bookings.iter().filter(|b| b.status == *status).count() as i64,
            })
            .collect();

        let mut completed_revenue = Decimal::ZERO;
        let mut expected_revenue = Decimal::ZERO;
        let mut overdue = 0;
        for booking in &bookings {
            match booking.status {
                BookingStatus::Completed => completed_revenue += booking.total_cost(),
                BookingStatus::Approved | BookingStatus::Active => {
                    expected_revenue += booking.total_cost()
                }
                _ => {}
            }
            if booking.is_overdue(now) {
                overdue += 1;
            }
        }

        Ok(BookingStatsResponse {
            total: bookings.len() as i64,
            by_status,
            overdue,
            completed_revenue,
            expected_revenue,
            equipment_total: equipment.len() as i64,
            equipment_checked_out: equipment
                .iter()
                .filter(|e| e.status == EquipmentStatus::CheckedOut)
                .count() as i64,
        })
    }
}
