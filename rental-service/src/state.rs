//! Application state management

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::database::create_pool;
use crate::error::Result;
use crate::listing::{ListingStore, PgListingStore, QueryPlanner};

/// Shared state handed to every handler
///
/// Generic over the store so handlers can be exercised against
/// [`InMemoryListingStore`](crate::listing::InMemoryListingStore).
pub struct AppState<S = PgListingStore> {
    config: Arc<Config>,
    planner: Arc<QueryPlanner<S>>,
    shutdown: CancellationToken,
}

// Manual impl: `S` itself need not be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            planner: Arc::clone(&self.planner),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<S: ListingStore> AppState<S> {
    /// Wrap `store` in a planner configured from `config.listings`
    pub fn new(config: Config, store: S) -> Self {
        let planner = QueryPlanner::new(store, &config.listings);
        Self {
            config: Arc::new(config),
            planner: Arc::new(planner),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn planner(&self) -> &QueryPlanner<S> {
        &self.planner
    }

    /// Root token cancelled when the service starts shutting down
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Token for a single request; cancelled with the service
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

impl AppState<PgListingStore> {
    /// Connect to PostgreSQL (with retries) and build the production state
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = create_pool(&config.database, config.listings.query_timeout()).await?;
        Ok(Self::new(config, PgListingStore::new(pool)))
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.planner.store().close().await;
    }
}
