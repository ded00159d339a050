//! Postgres-backed store.
//!
//! The schema lives in [`SCHEMA`] and is applied idempotently by
//! [`PostgresStore::migrate`]. Referential actions are declared in the schema,
//! so deletes cascade the same way the in-memory store does.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `InvalidReference` |
//! | Database (check constraint violation) | `23514` | `Backend` |
//! | Anything else | N/A | `Backend` |

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use innkeep_core::{
    GuestId, HotelId, MembershipId, Money, ReservationId, RoomServiceId, RoomServiceRequestId,
    ServiceId, SlotId,
};
use innkeep_hotels::{
    AvailableTime, Guest, Hotel, Membership, Reservation, RoomService, RoomServiceRequest, Service,
};

use super::{
    BookingLedger, GuestAccounts, HotelDirectory, MembershipRegistry,
    RoomServiceDesk, StoreError, StoreResult,
};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hotels (
    id          UUID PRIMARY KEY,
    name        VARCHAR(255) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    location    VARCHAR(255) NOT NULL
);

CREATE TABLE IF NOT EXISTS guests (
    id             UUID PRIMARY KEY,
    email          VARCHAR(254) NOT NULL,
    private_number VARCHAR(20) NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,
    bank_card      VARCHAR(16),
    is_staff       BOOLEAN NOT NULL DEFAULT FALSE,
    is_user        BOOLEAN NOT NULL DEFAULT TRUE,
    hotel_id       UUID REFERENCES hotels (id) ON DELETE SET NULL,
    date_joined    TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS guests_email_key ON guests (lower(email));

CREATE TABLE IF NOT EXISTS memberships (
    id             UUID PRIMARY KEY,
    hotel_id       UUID NOT NULL REFERENCES hotels (id) ON DELETE CASCADE,
    private_number VARCHAR(20) NOT NULL UNIQUE,
    email          VARCHAR(254) NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS memberships_email_key ON memberships (lower(email));

CREATE TABLE IF NOT EXISTS services (
    id          UUID PRIMARY KEY,
    hotel_id    UUID NOT NULL REFERENCES hotels (id) ON DELETE CASCADE,
    name        VARCHAR(255) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
    available   BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS available_times (
    id          UUID PRIMARY KEY,
    service_id  UUID NOT NULL REFERENCES services (id) ON DELETE CASCADE,
    start_time  TIMESTAMPTZ NOT NULL,
    end_time    TIMESTAMPTZ NOT NULL,
    is_reserved BOOLEAN NOT NULL DEFAULT FALSE,
    CHECK (end_time > start_time)
);
CREATE INDEX IF NOT EXISTS available_times_service_start ON available_times (service_id, start_time);

CREATE TABLE IF NOT EXISTS reservations (
    id               UUID PRIMARY KEY,
    guest_id         UUID NOT NULL REFERENCES guests (id) ON DELETE CASCADE,
    service_id       UUID NOT NULL REFERENCES services (id) ON DELETE CASCADE,
    reservation_date TIMESTAMPTZ NOT NULL,
    reserved_for     UUID NOT NULL REFERENCES available_times (id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS room_services (
    id       UUID PRIMARY KEY,
    hotel_id UUID NOT NULL REFERENCES hotels (id) ON DELETE CASCADE,
    name     VARCHAR(255) NOT NULL
);

CREATE TABLE IF NOT EXISTS room_service_requests (
    id              UUID PRIMARY KEY,
    guest_id        UUID NOT NULL REFERENCES guests (id) ON DELETE CASCADE,
    room_service_id UUID NOT NULL REFERENCES room_services (id) ON DELETE CASCADE,
    request_date    TIMESTAMPTZ NOT NULL,
    status          VARCHAR(20) NOT NULL DEFAULT 'Pending'
                    CHECK (status IN ('Pending', 'Completed'))
);

CREATE TABLE IF NOT EXISTS revoked_tokens (
    jti        UUID PRIMARY KEY,
    expires_at TIMESTAMPTZ NOT NULL
);
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create any missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::InvalidReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        other => StoreError::Backend(format!("{} failed: {}", operation, other)),
    }
}

fn affected(result: sqlx::postgres::PgQueryResult) -> StoreResult<()> {
    if result.rows_affected() == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column {name}: {e}")))
}

fn cents_from_db(cents: i64) -> StoreResult<Money> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Backend(format!("negative price in database: {cents}")))
}

fn cents_to_db(money: Money) -> StoreResult<i64> {
    i64::try_from(money.cents()).map_err(|_| StoreError::Backend("price out of range".into()))
}

fn hotel_from_row(row: &PgRow) -> StoreResult<Hotel> {
    Ok(Hotel {
        id: HotelId::from_uuid(col(row, "id")?),
        name: col(row, "name")?,
        description: col(row, "description")?,
        location: col(row, "location")?,
    })
}

fn service_from_row(row: &PgRow) -> StoreResult<Service> {
    Ok(Service {
        id: ServiceId::from_uuid(col(row, "id")?),
        hotel_id: HotelId::from_uuid(col(row, "hotel_id")?),
        name: col(row, "name")?,
        description: col(row, "description")?,
        price: cents_from_db(col(row, "price_cents")?)?,
        available: col(row, "available")?,
    })
}

fn room_service_from_row(row: &PgRow) -> StoreResult<RoomService> {
    Ok(RoomService {
        id: RoomServiceId::from_uuid(col(row, "id")?),
        hotel_id: HotelId::from_uuid(col(row, "hotel_id")?),
        name: col(row, "name")?,
    })
}

fn membership_from_row(row: &PgRow) -> StoreResult<Membership> {
    Ok(Membership {
        id: MembershipId::from_uuid(col(row, "id")?),
        hotel_id: HotelId::from_uuid(col(row, "hotel_id")?),
        private_number: col(row, "private_number")?,
        email: col(row, "email")?,
    })
}

fn guest_from_row(row: &PgRow) -> StoreResult<Guest> {
    let hotel: Option<Uuid> = col(row, "hotel_id")?;
    Ok(Guest {
        id: GuestId::from_uuid(col(row, "id")?),
        email: col(row, "email")?,
        private_number: col(row, "private_number")?,
        password_hash: col(row, "password_hash")?,
        bank_card: col(row, "bank_card")?,
        is_staff: col(row, "is_staff")?,
        is_user: col(row, "is_user")?,
        hotel_id: hotel.map(HotelId::from_uuid),
        date_joined: col(row, "date_joined")?,
    })
}

fn slot_from_row(row: &PgRow) -> StoreResult<AvailableTime> {
    Ok(AvailableTime {
        id: SlotId::from_uuid(col(row, "id")?),
        service_id: ServiceId::from_uuid(col(row, "service_id")?),
        start_time: col(row, "start_time")?,
        end_time: col(row, "end_time")?,
        is_reserved: col(row, "is_reserved")?,
    })
}

fn reservation_from_row(row: &PgRow) -> StoreResult<Reservation> {
    Ok(Reservation {
        id: ReservationId::from_uuid(col(row, "id")?),
        guest_id: GuestId::from_uuid(col(row, "guest_id")?),
        service_id: ServiceId::from_uuid(col(row, "service_id")?),
        reservation_date: col(row, "reservation_date")?,
        reserved_for: SlotId::from_uuid(col(row, "reserved_for")?),
    })
}

fn request_from_row(row: &PgRow) -> StoreResult<RoomServiceRequest> {
    let status: String = col(row, "status")?;
    Ok(RoomServiceRequest {
        id: RoomServiceRequestId::from_uuid(col(row, "id")?),
        guest_id: GuestId::from_uuid(col(row, "guest_id")?),
        room_service_id: RoomServiceId::from_uuid(col(row, "room_service_id")?),
        request_date: col(row, "request_date")?,
        status: status
            .parse()
            .map_err(|e| StoreError::Backend(format!("bad status in database: {e}")))?,
    })
}

fn rows<T>(rows: Vec<PgRow>, map: fn(&PgRow) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.iter().map(map).collect()
}

const GUEST_COLUMNS: &str =
    "id, email, private_number, password_hash, bank_card, is_staff, is_user, hotel_id, date_joined";

#[async_trait]
impl HotelDirectory for PostgresStore {
    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>> {
        let found = sqlx::query("SELECT id, name, description, location FROM hotels ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_hotels", e))?;
        rows(found, hotel_from_row)
    }

    async fn get_hotel(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        sqlx::query("SELECT id, name, description, location FROM hotels WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_hotel", e))?
            .as_ref()
            .map(hotel_from_row)
            .transpose()
    }

    async fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        sqlx::query("INSERT INTO hotels (id, name, description, location) VALUES ($1, $2, $3, $4)")
            .bind(hotel.id.as_uuid())
            .bind(&hotel.name)
            .bind(&hotel.description)
            .bind(&hotel.location)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_hotel", e))?;
        Ok(())
    }

    async fn update_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        let result = sqlx::query("UPDATE hotels SET name = $2, description = $3, location = $4 WHERE id = $1")
            .bind(hotel.id.as_uuid())
            .bind(&hotel.name)
            .bind(&hotel.description)
            .bind(&hotel.location)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_hotel", e))?;
        affected(result)
    }

    #[instrument(skip(self), fields(hotel_id = %id), err)]
    async fn delete_hotel(&self, id: HotelId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM hotels WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_hotel", e))?;
        affected(result)
    }

    async fn list_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<Service>> {
        let found = sqlx::query(
            r#"
            SELECT id, hotel_id, name, description, price_cents, available
            FROM services
            WHERE $1::uuid IS NULL OR hotel_id = $1
            ORDER BY id
            "#,
        )
        .bind(hotel.map(|h| *h.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_services", e))?;
        rows(found, service_from_row)
    }

    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<Service>> {
        sqlx::query(
            "SELECT id, hotel_id, name, description, price_cents, available FROM services WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_service", e))?
        .as_ref()
        .map(service_from_row)
        .transpose()
    }

    async fn insert_service(&self, service: Service) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO services (id, hotel_id, name, description, price_cents, available)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(service.id.as_uuid())
        .bind(service.hotel_id.as_uuid())
        .bind(&service.name)
        .bind(&service.description)
        .bind(cents_to_db(service.price)?)
        .bind(service.available)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_service", e))?;
        Ok(())
    }

    async fn update_service(&self, service: Service) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET hotel_id = $2, name = $3, description = $4, price_cents = $5, available = $6
            WHERE id = $1
            "#,
        )
        .bind(service.id.as_uuid())
        .bind(service.hotel_id.as_uuid())
        .bind(&service.name)
        .bind(&service.description)
        .bind(cents_to_db(service.price)?)
        .bind(service.available)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_service", e))?;
        affected(result)
    }

    async fn delete_service(&self, id: ServiceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_service", e))?;
        affected(result)
    }

    async fn list_room_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<RoomService>> {
        let found = sqlx::query(
            "SELECT id, hotel_id, name FROM room_services WHERE $1::uuid IS NULL OR hotel_id = $1 ORDER BY id",
        )
        .bind(hotel.map(|h| *h.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_room_services", e))?;
        rows(found, room_service_from_row)
    }

    async fn get_room_service(&self, id: RoomServiceId) -> StoreResult<Option<RoomService>> {
        sqlx::query("SELECT id, hotel_id, name FROM room_services WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_room_service", e))?
            .as_ref()
            .map(room_service_from_row)
            .transpose()
    }

    async fn insert_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        sqlx::query("INSERT INTO room_services (id, hotel_id, name) VALUES ($1, $2, $3)")
            .bind(room_service.id.as_uuid())
            .bind(room_service.hotel_id.as_uuid())
            .bind(&room_service.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_room_service", e))?;
        Ok(())
    }

    async fn update_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        let result = sqlx::query("UPDATE room_services SET hotel_id = $2, name = $3 WHERE id = $1")
            .bind(room_service.id.as_uuid())
            .bind(room_service.hotel_id.as_uuid())
            .bind(&room_service.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_room_service", e))?;
        affected(result)
    }

    async fn delete_room_service(&self, id: RoomServiceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM room_services WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_room_service", e))?;
        affected(result)
    }
}

#[async_trait]
impl MembershipRegistry for PostgresStore {
    async fn list_memberships(&self) -> StoreResult<Vec<Membership>> {
        let found = sqlx::query("SELECT id, hotel_id, private_number, email FROM memberships ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_memberships", e))?;
        rows(found, membership_from_row)
    }

    async fn get_membership(&self, id: MembershipId) -> StoreResult<Option<Membership>> {
        sqlx::query("SELECT id, hotel_id, private_number, email FROM memberships WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_membership", e))?
            .as_ref()
            .map(membership_from_row)
            .transpose()
    }

    async fn insert_membership(&self, membership: Membership) -> StoreResult<()> {
        sqlx::query("INSERT INTO memberships (id, hotel_id, private_number, email) VALUES ($1, $2, $3, $4)")
            .bind(membership.id.as_uuid())
            .bind(membership.hotel_id.as_uuid())
            .bind(&membership.private_number)
            .bind(&membership.email)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_membership", e))?;
        Ok(())
    }

    async fn update_membership(&self, membership: Membership) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE memberships SET hotel_id = $2, private_number = $3, email = $4 WHERE id = $1",
        )
        .bind(membership.id.as_uuid())
        .bind(membership.hotel_id.as_uuid())
        .bind(&membership.private_number)
        .bind(&membership.email)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_membership", e))?;
        affected(result)
    }

    async fn delete_membership(&self, id: MembershipId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_membership", e))?;
        affected(result)
    }

    async fn is_member(&self, hotel: HotelId, private_number: &str) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM memberships WHERE hotel_id = $1 AND private_number = $2) AS member",
        )
        .bind(hotel.as_uuid())
        .bind(private_number)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_member", e))?;
        col(&row, "member")
    }

    async fn find_membership(&self, private_number: &str, email: &str) -> StoreResult<Option<Membership>> {
        sqlx::query(
            r#"
            SELECT id, hotel_id, private_number, email
            FROM memberships
            WHERE private_number = $1 AND lower(email) = lower($2)
            "#,
        )
        .bind(private_number)
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_membership", e))?
        .as_ref()
        .map(membership_from_row)
        .transpose()
    }
}

#[async_trait]
impl GuestAccounts for PostgresStore {
    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        let found = sqlx::query(&format!("SELECT {GUEST_COLUMNS} FROM guests ORDER BY date_joined, id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_guests", e))?;
        rows(found, guest_from_row)
    }

    async fn get_guest(&self, id: GuestId) -> StoreResult<Option<Guest>> {
        sqlx::query(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_guest", e))?
            .as_ref()
            .map(guest_from_row)
            .transpose()
    }

    async fn guest_by_email(&self, email: &str) -> StoreResult<Option<Guest>> {
        sqlx::query(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE lower(email) = lower($1)"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("guest_by_email", e))?
            .as_ref()
            .map(guest_from_row)
            .transpose()
    }

    async fn guest_by_private_number(&self, private_number: &str) -> StoreResult<Option<Guest>> {
        sqlx::query(&format!("SELECT {GUEST_COLUMNS} FROM guests WHERE private_number = $1"))
            .bind(private_number)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("guest_by_private_number", e))?
            .as_ref()
            .map(guest_from_row)
            .transpose()
    }

    async fn insert_guest(&self, guest: Guest) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO guests ({GUEST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(guest.id.as_uuid())
        .bind(&guest.email)
        .bind(&guest.private_number)
        .bind(&guest.password_hash)
        .bind(&guest.bank_card)
        .bind(guest.is_staff)
        .bind(guest.is_user)
        .bind(guest.hotel_id.map(|h| *h.as_uuid()))
        .bind(guest.date_joined)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_guest", e))?;
        Ok(())
    }

    async fn update_guest(&self, guest: Guest) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE guests
            SET email = $2, private_number = $3, password_hash = $4, bank_card = $5,
                is_staff = $6, is_user = $7, hotel_id = $8, date_joined = $9
            WHERE id = $1
            "#,
        )
        .bind(guest.id.as_uuid())
        .bind(&guest.email)
        .bind(&guest.private_number)
        .bind(&guest.password_hash)
        .bind(&guest.bank_card)
        .bind(guest.is_staff)
        .bind(guest.is_user)
        .bind(guest.hotel_id.map(|h| *h.as_uuid()))
        .bind(guest.date_joined)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_guest", e))?;
        affected(result)
    }

    async fn delete_guest(&self, id: GuestId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_guest", e))?;
        affected(result)
    }

    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("prune_revoked_tokens", e))?;
        sqlx::query("INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING")
            .bind(jti)
            .bind(expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("revoke_token", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1) AS revoked")
            .bind(jti)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_token_revoked", e))?;
        col(&row, "revoked")
    }
}

#[async_trait]
impl BookingLedger for PostgresStore {
    async fn list_slots(&self, service: Option<ServiceId>) -> StoreResult<Vec<AvailableTime>> {
        let found = sqlx::query(
            r#"
            SELECT id, service_id, start_time, end_time, is_reserved
            FROM available_times
            WHERE $1::uuid IS NULL OR service_id = $1
            ORDER BY start_time, id
            "#,
        )
        .bind(service.map(|s| *s.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_slots", e))?;
        rows(found, slot_from_row)
    }

    async fn get_slot(&self, id: SlotId) -> StoreResult<Option<AvailableTime>> {
        sqlx::query("SELECT id, service_id, start_time, end_time, is_reserved FROM available_times WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_slot", e))?
            .as_ref()
            .map(slot_from_row)
            .transpose()
    }

    async fn insert_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO available_times (id, service_id, start_time, end_time, is_reserved)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(slot.id.as_uuid())
        .bind(slot.service_id.as_uuid())
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.is_reserved)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_slot", e))?;
        Ok(())
    }

    async fn update_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE available_times
            SET service_id = $2, start_time = $3, end_time = $4, is_reserved = $5
            WHERE id = $1
            "#,
        )
        .bind(slot.id.as_uuid())
        .bind(slot.service_id.as_uuid())
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.is_reserved)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_slot", e))?;
        affected(result)
    }

    async fn delete_slot(&self, id: SlotId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM available_times WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_slot", e))?;
        affected(result)
    }

    async fn list_reservations(&self, guest: Option<GuestId>) -> StoreResult<Vec<Reservation>> {
        let found = sqlx::query(
            r#"
            SELECT id, guest_id, service_id, reservation_date, reserved_for
            FROM reservations
            WHERE $1::uuid IS NULL OR guest_id = $1
            ORDER BY reservation_date DESC, id DESC
            "#,
        )
        .bind(guest.map(|g| *g.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_reservations", e))?;
        rows(found, reservation_from_row)
    }

    async fn get_reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        sqlx::query(
            "SELECT id, guest_id, service_id, reservation_date, reserved_for FROM reservations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_reservation", e))?
        .as_ref()
        .map(reservation_from_row)
        .transpose()
    }

    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (id, guest_id, service_id, reservation_date, reserved_for)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.guest_id.as_uuid())
        .bind(reservation.service_id.as_uuid())
        .bind(reservation.reservation_date)
        .bind(reservation.reserved_for.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_reservation", e))?;
        Ok(())
    }

    async fn update_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET guest_id = $2, service_id = $3, reservation_date = $4, reserved_for = $5
            WHERE id = $1
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.guest_id.as_uuid())
        .bind(reservation.service_id.as_uuid())
        .bind(reservation.reservation_date)
        .bind(reservation.reserved_for.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_reservation", e))?;
        affected(result)
    }

    async fn delete_reservation(&self, id: ReservationId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_reservation", e))?;
        affected(result)
    }

    async fn reserved_starts(
        &self,
        service: ServiceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<HashSet<DateTime<Utc>>> {
        let found = sqlx::query(
            r#"
            SELECT t.start_time
            FROM reservations r
            JOIN available_times t ON t.id = r.reserved_for
            WHERE r.service_id = $1 AND t.start_time >= $2 AND t.start_time < $3
            "#,
        )
        .bind(service.as_uuid())
        .bind(from)
        .bind(until)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reserved_starts", e))?;
        found.iter().map(|row| col(row, "start_time")).collect()
    }

    /// Locks the service row for the whole transaction so concurrent bookings
    /// of the same service serialize.
    #[instrument(skip(self, starts), fields(guest_id = %guest, service_id = %service, count = starts.len()), err)]
    async fn book(
        &self,
        guest: GuestId,
        service: ServiceId,
        starts: &[DateTime<Utc>],
        slot_length: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(Reservation, AvailableTime)>> {
        let mut tx = self.begin().await?;

        let locked = sqlx::query("SELECT id FROM services WHERE id = $1 FOR UPDATE")
            .bind(service.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_service", e))?;
        if locked.is_none() {
            return Err(StoreError::InvalidReference(format!("service {service}")));
        }

        let taken = sqlx::query(
            r#"
            SELECT t.start_time
            FROM reservations r
            JOIN available_times t ON t.id = r.reserved_for
            WHERE r.service_id = $1 AND t.start_time = ANY($2)
            ORDER BY t.start_time
            "#,
        )
        .bind(service.as_uuid())
        .bind(starts)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_conflicts", e))?;
        if !taken.is_empty() {
            let clashes = taken
                .iter()
                .map(|row| col::<DateTime<Utc>>(row, "start_time"))
                .collect::<StoreResult<Vec<_>>>()?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::SlotsTaken(clashes));
        }

        let mut booked = Vec::with_capacity(starts.len());
        for start in starts {
            let end = *start + slot_length;
            let existing = sqlx::query(
                r#"
                SELECT id, service_id, start_time, end_time, is_reserved
                FROM available_times
                WHERE service_id = $1 AND start_time = $2 AND end_time = $3
                ORDER BY id
                LIMIT 1
                "#,
            )
            .bind(service.as_uuid())
            .bind(*start)
            .bind(end)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("find_slot", e))?;

            let mut slot = match existing {
                Some(row) => slot_from_row(&row)?,
                None => {
                    let slot = AvailableTime::new(service, *start, slot_length);
                    sqlx::query(
                        r#"
                        INSERT INTO available_times (id, service_id, start_time, end_time, is_reserved)
                        VALUES ($1, $2, $3, $4, FALSE)
                        "#,
                    )
                    .bind(slot.id.as_uuid())
                    .bind(service.as_uuid())
                    .bind(slot.start_time)
                    .bind(slot.end_time)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("insert_slot", e))?;
                    slot
                }
            };

            sqlx::query("UPDATE available_times SET is_reserved = TRUE WHERE id = $1")
                .bind(slot.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("mark_reserved", e))?;
            slot.is_reserved = true;

            let reservation = Reservation::new(guest, service, slot.id, now);
            sqlx::query(
                r#"
                INSERT INTO reservations (id, guest_id, service_id, reservation_date, reserved_for)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(reservation.id.as_uuid())
            .bind(guest.as_uuid())
            .bind(service.as_uuid())
            .bind(now)
            .bind(slot.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_reservation", e))?;

            booked.push((reservation, slot));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(booked)
    }
}

#[async_trait]
impl RoomServiceDesk for PostgresStore {
    async fn list_requests(&self, guest: Option<GuestId>) -> StoreResult<Vec<RoomServiceRequest>> {
        let found = sqlx::query(
            r#"
            SELECT id, guest_id, room_service_id, request_date, status
            FROM room_service_requests
            WHERE $1::uuid IS NULL OR guest_id = $1
            ORDER BY request_date DESC, id DESC
            "#,
        )
        .bind(guest.map(|g| *g.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_requests", e))?;
        rows(found, request_from_row)
    }

    async fn get_request(&self, id: RoomServiceRequestId) -> StoreResult<Option<RoomServiceRequest>> {
        sqlx::query(
            "SELECT id, guest_id, room_service_id, request_date, status FROM room_service_requests WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_request", e))?
        .as_ref()
        .map(request_from_row)
        .transpose()
    }

    async fn insert_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO room_service_requests (id, guest_id, room_service_id, request_date, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.guest_id.as_uuid())
        .bind(request.room_service_id.as_uuid())
        .bind(request.request_date)
        .bind(request.status.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_request", e))?;
        Ok(())
    }

    async fn update_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE room_service_requests
            SET guest_id = $2, room_service_id = $3, request_date = $4, status = $5
            WHERE id = $1
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.guest_id.as_uuid())
        .bind(request.room_service_id.as_uuid())
        .bind(request.request_date)
        .bind(request.status.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_request", e))?;
        affected(result)
    }

    async fn delete_request(&self, id: RoomServiceRequestId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM room_service_requests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_request", e))?;
        affected(result)
    }
}
