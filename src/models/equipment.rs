//! Equipment model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::booking::Rates;

/// Rental state of an equipment item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "equipment_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentStatus {
    Available,
    CheckedOut,
    Maintenance,
    Retired,
}

impl EquipmentStatus {
    /// Whether new bookings may be taken for equipment in this state
    pub fn is_bookable(self) -> bool {
        matches!(self, EquipmentStatus::Available | EquipmentStatus::CheckedOut)
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::CheckedOut => "checked-out",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::Retired => "retired",
        };
        write!(f, "{}", label)
    }
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    /// Category slug (camera, lens, lighting, audio, ...)
    pub category: String,
    pub status: EquipmentStatus,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Default rental rates copied onto new bookings
    pub fn rates(&self) -> Rates {
        Rates {
            daily_rate: self.daily_rate,
            weekly_rate: self.weekly_rate,
            monthly_rate: self.monthly_rate,
        }
    }
}

/// Create equipment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "Category must be 1 to 64 characters"))]
    pub category: String,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

/// Update equipment request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Category must be 1 to 64 characters"))]
    pub category: Option<String>,
    pub status: Option<EquipmentStatus>,
    pub daily_rate: Option<Decimal>,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

impl UpdateEquipment {
    /// Apply the provided fields onto an existing record
    pub fn apply_to(&self, equipment: &mut Equipment) {
        if let Some(ref name) = self.name {
            equipment.name = name.clone();
        }
        if let Some(ref category) = self.category {
            equipment.category = category.clone();
        }
        if let Some(status) = self.status {
            equipment.status = status;
        }
        if let Some(rate) = self.daily_rate {
            equipment.daily_rate = rate;
        }
        if self.weekly_rate.is_some() {
            equipment.weekly_rate = self.weekly_rate;
        }
        if self.monthly_rate.is_some() {
            equipment.monthly_rate = self.monthly_rate;
        }
        if self.serial_number.is_some() {
            equipment.serial_number = self.serial_number.clone();
        }
        if self.notes.is_some() {
            equipment.notes = self.notes.clone();
        }
    }
}
