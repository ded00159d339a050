//! Requests for in-room services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use innkeep_core::{DomainError, GuestId, RoomServiceId, RoomServiceRequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Pending,
    Completed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Completed => "Completed",
        }
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(RequestStatus::Pending),
            "Completed" => Ok(RequestStatus::Completed),
            other => Err(DomainError::validation(format!(
                "status: '{other}' is not one of Pending, Completed"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomServiceRequest {
    pub id: RoomServiceRequestId,
    pub guest_id: GuestId,
    pub room_service_id: RoomServiceId,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
}

impl RoomServiceRequest {
    pub fn new(guest_id: GuestId, room_service_id: RoomServiceId, now: DateTime<Utc>) -> Self {
        Self {
            id: RoomServiceRequestId::new(),
            guest_id,
            room_service_id,
            request_date: now,
            status: RequestStatus::Pending,
        }
    }
}
