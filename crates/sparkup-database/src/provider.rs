//! Store backend selection.

use std::sync::Arc;

use tracing::info;

use sparkup_core::config::{DatabaseConfig, DatabaseProvider};
use sparkup_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::migration::run_migrations;
use crate::repositories::{MembershipRepository, MessageRepository, RoomRepository};
use crate::store::{MembershipStore, MessageStore, RoomStore};

/// The three store handles the chat core needs, backed by one provider.
#[derive(Clone)]
pub struct ChatStores {
    /// Room lifecycle and listing.
    pub rooms: Arc<dyn RoomStore>,
    /// Membership and profile lookups.
    pub members: Arc<dyn MembershipStore>,
    /// Message persistence and read tracking.
    pub messages: Arc<dyn MessageStore>,
    pool: Option<DatabasePool>,
}

impl std::fmt::Debug for ChatStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStores")
            .field("postgres", &self.pool.is_some())
            .finish()
    }
}

impl ChatStores {
    /// Connect to the configured backend, running migrations if enabled.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            DatabaseProvider::Postgres => {
                info!("Initializing PostgreSQL chat store");
                let db = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(db.pool()).await?;
                }
                Ok(Self::postgres(db))
            }
            #[cfg(feature = "memory-store")]
            DatabaseProvider::Memory => {
                info!("Initializing in-memory chat store");
                Ok(Self::from_memory(Arc::new(crate::memory::MemoryChatStore::new())))
            }
            #[cfg(not(feature = "memory-store"))]
            DatabaseProvider::Memory => Err(sparkup_core::error::AppError::configuration(
                "The in-memory store requires the 'memory-store' feature",
            )),
        }
    }

    /// Build PostgreSQL repositories over an open pool.
    pub fn postgres(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            rooms: Arc::new(RoomRepository::new(pool.clone())),
            members: Arc::new(MembershipRepository::new(pool.clone())),
            messages: Arc::new(MessageRepository::new(pool)),
            pool: Some(db),
        }
    }

    /// Use one in-memory store for all three handles.
    #[cfg(feature = "memory-store")]
    pub fn from_memory(store: Arc<crate::memory::MemoryChatStore>) -> Self {
        Self {
            rooms: store.clone(),
            members: store.clone(),
            messages: store,
            pool: None,
        }
    }

    /// Check the backend is reachable. The in-memory store always is.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(db) => db.health_check().await,
            None => Ok(true),
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Some(db) = &self.pool {
            db.close().await;
        }
    }
}

