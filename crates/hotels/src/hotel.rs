//! Hotels and what they offer.

use serde::{Deserialize, Serialize};

use innkeep_core::{DomainResult, HotelId, Money, RoomServiceId, ServiceId};

use crate::validate;

pub const NAME_MAX: usize = 255;
pub const LOCATION_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub description: String,
    pub location: String,
}

impl Hotel {
    pub fn new(name: String, description: String, location: String) -> DomainResult<Self> {
        let hotel = Self {
            id: HotelId::new(),
            name,
            description,
            location,
        };
        hotel.validate()?;
        Ok(hotel)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::text("name", &self.name, NAME_MAX)?;
        validate::text("location", &self.location, LOCATION_MAX)
    }
}

impl core::fmt::Display for Hotel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A bookable offering (spa, restaurant table, ...) billed per hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub hotel_id: HotelId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub available: bool,
}

impl Service {
    pub fn new(hotel_id: HotelId, name: String, description: String, price: Money) -> DomainResult<Self> {
        let service = Self {
            id: ServiceId::new(),
            hotel_id,
            name,
            description,
            price,
            available: true,
        };
        service.validate()?;
        Ok(service)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::text("name", &self.name, NAME_MAX)
    }
}

impl core::fmt::Display for Service {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// An in-room service a hotel offers (cleaning, breakfast, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomService {
    pub id: RoomServiceId,
    pub hotel_id: HotelId,
    pub name: String,
}

impl RoomService {
    pub fn new(hotel_id: HotelId, name: String) -> DomainResult<Self> {
        let rs = Self {
            id: RoomServiceId::new(),
            hotel_id,
            name,
        };
        rs.validate()?;
        Ok(rs)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::text("name", &self.name, NAME_MAX)
    }
}
