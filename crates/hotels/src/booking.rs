//! Time slots and the reservations that hold them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use innkeep_core::{DomainError, DomainResult, GuestId, ReservationId, ServiceId, SlotId};

/// A bookable window for a service, flagged once reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTime {
    pub id: SlotId,
    pub service_id: ServiceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_reserved: bool,
}

impl AvailableTime {
    pub fn new(service_id: ServiceId, start_time: DateTime<Utc>, length: Duration) -> Self {
        Self {
            id: SlotId::new(),
            service_id,
            start_time,
            end_time: start_time + length,
            is_reserved: false,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.end_time <= self.start_time {
            return Err(DomainError::validation("end_time: must be after start_time"));
        }
        Ok(())
    }

    /// Admin display: `"<service> from <start> to <end>"`.
    pub fn describe(&self, service_name: &str) -> String {
        format!("{service_name} from {} to {}", self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub guest_id: GuestId,
    pub service_id: ServiceId,
    pub reservation_date: DateTime<Utc>,
    pub reserved_for: SlotId,
}

impl Reservation {
    pub fn new(guest_id: GuestId, service_id: ServiceId, reserved_for: SlotId, now: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            guest_id,
            service_id,
            reservation_date: now,
            reserved_for,
        }
    }
}
