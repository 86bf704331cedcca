//! Booking status transitions

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::booking::{Booking, BookingStatus, ReturnCondition};
use crate::error::{AppError, AppResult};

/// An event applied to a booking by an actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Approve { actor: i32 },
    Cancel { actor: i32, reason: Option<String> },
    CheckOut { actor: i32 },
    CheckIn { actor: i32, condition: ReturnCondition },
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::Approve { .. } => "approve",
            BookingEvent::Cancel { .. } => "cancel",
            BookingEvent::CheckOut { .. } => "check-out",
            BookingEvent::CheckIn { .. } => "check-in",
        }
    }

    pub fn actor(&self) -> i32 {
        match self {
            BookingEvent::Approve { actor }
            | BookingEvent::Cancel { actor, .. }
            | BookingEvent::CheckOut { actor }
            | BookingEvent::CheckIn { actor, .. } => *actor,
        }
    }
}

/// Target state for `event` applied in state `from`
pub fn next_status(from: BookingStatus, event: &BookingEvent) -> AppResult<BookingStatus> {
    if from.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "cannot {} a {} booking",
            event.name(),
            from
        )));
    }

    let to = match (from, event) {
        (BookingStatus::Pending, BookingEvent::Approve { .. }) => BookingStatus::Approved,
        (_, BookingEvent::Cancel { .. }) => BookingStatus::Cancelled,
        (BookingStatus::Approved, BookingEvent::CheckOut { .. }) => BookingStatus::Active,
        (BookingStatus::Active, BookingEvent::CheckIn { .. }) => BookingStatus::Completed,
        _ => {
            return Err(AppError::InvalidTransition(format!(
                "cannot {} a {} booking",
                event.name(),
                from
            )))
        }
    };
    Ok(to)
}

impl Booking {
    /// Move the booking to its next state and record who did it and when.
    ///
    /// Leaves the booking untouched on error.
    pub fn apply(&mut self, event: &BookingEvent, now: DateTime<Utc>) -> AppResult<()> {
        let to = next_status(self.status, event)?;

        match event {
            BookingEvent::Approve { actor } => {
                self.approved_by = Some(*actor);
                self.approved_at = Some(now);
            }
            BookingEvent::Cancel { actor, reason } => {
                self.cancelled_by = Some(*actor);
                self.cancelled_at = Some(now);
                self.cancellation_reason = reason.clone();
            }
            BookingEvent::CheckOut { actor } => {
                self.checked_out_by = Some(*actor);
                self.check_out_date = Some(now);
            }
            BookingEvent::CheckIn { actor, condition } => {
                self.checked_in_by = Some(*actor);
                self.check_in_date = Some(now);
                self.return_condition = Some(*condition);
            }
        }

        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

/// Cancel request body
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CancelBooking {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Check-in request body
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckInBooking {
    pub condition: ReturnCondition,
}
