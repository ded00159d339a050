use std::sync::Arc;

use chrono::{DateTime, Utc};

use innkeep_auth::Hs256Jwt;
use innkeep_core::{Clock, SystemClock};
use innkeep_hotels::BookingPolicy;
use innkeep_infra::{InMemoryStore, PostgresStore, Store};

use crate::config::{AppConfig, StorageConfig};

/// Everything handlers need, shared behind an `Arc` as a request extension.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<Hs256Jwt>,
    pub policy: BookingPolicy,
    pub clock: Arc<dyn Clock>,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, jwt: Arc<Hs256Jwt>, policy: BookingPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            jwt,
            policy,
            clock,
        }
    }

    /// In-memory wiring with an injectable clock (dev/test).
    pub fn in_memory(jwt_secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(Hs256Jwt::new(
                jwt_secret.as_bytes(),
                chrono::Duration::minutes(crate::config::DEFAULT_JWT_TTL_MINUTES),
            )),
            BookingPolicy::default(),
            clock,
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn Store> = match &config.storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory stores");
            Arc::new(InMemoryStore::new())
        }
        StorageConfig::Postgres { database_url } => {
            let store = PostgresStore::connect(database_url).await?;
            store.migrate().await?;
            tracing::info!("using postgres stores");
            Arc::new(store)
        }
    };

    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.jwt_ttl));
    let policy = BookingPolicy {
        utc_offset_minutes: config.utc_offset_minutes,
        ..BookingPolicy::default()
    };

    Ok(AppServices::new(store, jwt, policy, Arc::new(SystemClock)))
}
