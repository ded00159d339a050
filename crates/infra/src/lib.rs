//! Infrastructure layer: persistence for the hotel domain.

pub mod store;

pub use store::{
    BookingLedger, GuestAccounts, HotelDirectory, InMemoryStore, MembershipRegistry, PostgresStore,
    RoomServiceDesk, Store, StoreError, StoreResult,
};
