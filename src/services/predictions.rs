//! Availability forecasting and related-equipment suggestions

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::{PredictionsConfig, StatusWeights},
    error::AppResult,
    models::{
        booking::DateRange,
        equipment::{Equipment, EquipmentStatus},
    },
    repository::SharedStore,
};

/// Availability forecast for an equipment over a date range
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityForecast {
    pub equipment_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub available: bool,
    /// Ids of open bookings overlapping the range
    pub conflicts: Vec<i32>,
    /// Seasonal demand multiplier for the start date
    pub demand: f64,
    /// Likelihood in [0, 1] that the equipment can be rented as requested
    pub score: f64,
}

#[derive(Clone)]
pub struct PredictionService {
    store: SharedStore,
    rules: Arc<PredictionsConfig>,
}

impl PredictionService {
    pub fn new(store: SharedStore, rules: Arc<PredictionsConfig>) -> Self {
        Self { store, rules }
    }

    pub async fn availability(&self, equipment_id: i32, range: DateRange) -> AppResult<AvailabilityForecast> {
        let equipment = self.store.equipment_get(equipment_id).await?;
        let conflicts: Vec<i32> = self
            .store
            .bookings_overlapping(equipment_id, range, None)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        let demand = demand_multiplier(&self.rules, range.start);
        let (available, score) = if conflicts.is_empty() {
            let window = Duration::days(self.rules.pressure_window_days.max(0));
            let widened = DateRange {
                start: range.start - window,
                end: range.end + window,
            };
            let nearby = self
                .store
                .bookings_overlapping(equipment_id, widened, None)
                .await?
                .len();
            let weight = status_weight(&self.rules.status_weights, equipment.status);
            (
                equipment.status.is_bookable(),
                score(weight, demand, self.rules.booking_pressure, nearby),
            )
        } else {
            (false, 0.0)
        };

        tracing::debug!(equipment_id, available, score, demand, "Availability forecast");

        Ok(AvailabilityForecast {
            equipment_id,
            start_date: range.start,
            end_date: range.end,
            available,
            conflicts,
            demand,
            score,
        })
    }

    /// Available equipment from categories related to the given one
    pub async fn suggestions(&self, equipment_id: i32) -> AppResult<Vec<Equipment>> {
        let equipment = self.store.equipment_get(equipment_id).await?;
        let Some(related) = self.rules.category_relations.get(&equipment.category) else {
            return Ok(Vec::new());
        };

        let mut candidates: Vec<(usize, Equipment)> = self
            .store
            .equipment_list()
            .await?
            .into_iter()
            .filter(|e| e.id != equipment_id && e.status == EquipmentStatus::Available)
            .filter_map(|e| {
                related
                    .iter()
                    .position(|c| *c == e.category)
                    .map(|rank| (rank, e))
            })
            .collect();

        candidates.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.name.cmp(&b.name)));

        Ok(candidates
            .into_iter()
            .take(self.rules.max_suggestions)
            .map(|(_, e)| e)
            .collect())
    }
}

/// Monthly multiplier times weekday multiplier for `date`; missing entries count as 1.0
pub fn demand_multiplier(rules: &PredictionsConfig, date: NaiveDate) -> f64 {
    let monthly = rules
        .monthly_demand
        .get(date.month0() as usize)
        .copied()
        .unwrap_or(1.0);
    let weekday = rules
        .weekday_demand
        .get(date.weekday().num_days_from_monday() as usize)
        .copied()
        .unwrap_or(1.0);
    monthly * weekday
}

pub fn status_weight(weights: &StatusWeights, status: EquipmentStatus) -> f64 {
    match status {
        EquipmentStatus::Available => weights.available,
        EquipmentStatus::CheckedOut => weights.checked_out,
        EquipmentStatus::Maintenance => weights.maintenance,
        EquipmentStatus::Retired => weights.retired,
    }
}

/// Clamped to [0, 1]. A non-positive demand is treated as neutral.
pub fn score(weight: f64, demand: f64, pressure: f64, nearby: usize) -> f64 {
    let demand = if demand > 0.0 { demand } else { 1.0 };
    (weight / demand - pressure * nearby as f64).clamp(0.0, 1.0)
}
