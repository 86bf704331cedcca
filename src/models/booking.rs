//! Booking model: rental period, rates and derived cost

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

const SECONDS_PER_DAY: i64 = 86_400;

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// No further transition is permitted from a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether a booking in this state reserves its date range
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Approved | BookingStatus::Active
        )
    }

    /// Whether the equipment is held (checked out) on behalf of this booking
    pub fn holds_equipment(self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Active)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// Condition of the equipment reported at check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "return_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Excellent,
    Good,
    Fair,
    Damaged,
}

/// Half-open calendar range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting empty or inverted ones
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::Validation(format!(
                "end_date ({}) must be after start_date ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of rental days
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && e1 > s2`
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Rental rates for a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rates {
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
}

impl Rates {
    /// Rates with only a daily price
    pub fn daily(daily_rate: Decimal) -> Self {
        Self {
            daily_rate,
            weekly_rate: None,
            monthly_rate: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let negative = |rate: Option<Decimal>| rate.map_or(false, |r| r < Decimal::ZERO);

        if negative(Some(self.daily_rate)) {
            return Err(AppError::Validation("daily_rate must not be negative".to_string()));
        }
        if negative(self.weekly_rate) {
            return Err(AppError::Validation("weekly_rate must not be negative".to_string()));
        }
        if negative(self.monthly_rate) {
            return Err(AppError::Validation("monthly_rate must not be negative".to_string()));
        }

        let too_precise = [Some(self.daily_rate), self.weekly_rate, self.monthly_rate]
            .into_iter()
            .flatten()
            .any(|rate| rate.normalize().scale() > 2);
        if too_precise {
            return Err(AppError::Validation(
                "rates must have at most two decimal places".to_string(),
            ));
        }
        Ok(())
    }

    /// Price of a rental lasting `days` days.
    ///
    /// Whole months (30 days) are billed at the monthly rate when one is set,
    /// otherwise whole weeks at the weekly rate; the remainder is billed daily.
    pub fn cost_for_days(&self, days: i64) -> Decimal {
        match (self.monthly_rate, self.weekly_rate) {
            (Some(monthly), _) if days >= 30 => {
                Decimal::from(days / 30) * monthly + Decimal::from(days % 30) * self.daily_rate
            }
            (_, Some(weekly)) if days >= 7 => {
                Decimal::from(days / 7) * weekly + Decimal::from(days % 7) * self.daily_rate
            }
            _ => Decimal::from(days) * self.daily_rate,
        }
    }
}

/// Booking record as persisted.
///
/// `total_cost` is not stored: it is always derived from the date range and
/// the rates, see [`Booking::total_cost`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<i32>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub checked_out_by: Option<i32>,
    pub check_out_date: Option<DateTime<Utc>>,
    pub checked_in_by: Option<i32>,
    pub check_in_date: Option<DateTime<Utc>>,
    pub return_condition: Option<ReturnCondition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn rates(&self) -> Rates {
        Rates {
            daily_rate: self.daily_rate,
            weekly_rate: self.weekly_rate,
            monthly_rate: self.monthly_rate,
        }
    }

    pub fn duration_days(&self) -> i64 {
        self.range().days()
    }

    pub fn total_cost(&self) -> Decimal {
        self.rates().cost_for_days(self.duration_days())
    }

    /// Whether this booking reserves `range` on its equipment
    pub fn blocks(&self, range: &DateRange) -> bool {
        self.status.is_blocking() && self.range().overlaps(range)
    }

    fn due_at(&self) -> DateTime<Utc> {
        self.end_date.and_time(NaiveTime::MIN).and_utc()
    }

    /// An active booking whose end date has passed without a check-in
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Active && self.due_at() < now
    }

    /// Whole days past the end date, rounding partial days up
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_overdue(now) {
            return 0;
        }
        let seconds = (now - self.due_at()).num_seconds();
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }

    /// Attach the derived fields for display
    pub fn details(self, now: DateTime<Utc>) -> BookingDetails {
        BookingDetails {
            duration_days: self.duration_days(),
            total_cost: self.total_cost(),
            is_overdue: self.is_overdue(now),
            days_overdue: self.days_overdue(now),
            booking: self,
        }
    }
}

/// Fields of a booking about to be inserted
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub equipment_id: i32,
    pub user_id: i32,
    pub range: DateRange,
    pub rates: Rates,
    pub notes: Option<String>,
}

/// Booking with derived values
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub duration_days: i64,
    pub total_cost: Decimal,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

/// Create booking request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBooking {
    pub equipment_id: i32,
    /// Booking owner; staff only, defaults to the caller
    pub user_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Staff only; defaults to the equipment's rates when omitted
    pub rates: Option<Rates>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Update booking request (dates, rates, notes)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBooking {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub daily_rate: Option<Decimal>,
    /// Absent leaves the rate unchanged, `null` removes it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, nullable)]
    pub weekly_rate: Option<Option<Decimal>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, nullable)]
    pub monthly_rate: Option<Option<Decimal>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl UpdateBooking {
    /// Whether the request touches any of the prices
    pub fn changes_rates(&self) -> bool {
        self.daily_rate.is_some() || self.weekly_rate.is_some() || self.monthly_rate.is_some()
    }
}

/// Booking list filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    pub status: Option<BookingStatus>,
    pub equipment_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl BookingQuery {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.equipment_id.map_or(true, |id| booking.equipment_id == id)
            && self.user_id.map_or(true, |id| booking.user_id == id)
    }
}
