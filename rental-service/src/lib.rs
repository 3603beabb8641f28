//! # rental-service
//!
//! Read-only HTTP API over a PostgreSQL catalogue of rental listings.
//!
//! ## Features
//!
//! - **Listing query engine**: price range, id set and proximity filters with a
//!   total-match count computed in the same statement as the page
//! - **Deterministic paging**: every sort order ends on the rental id
//! - **Cancellation**: in-flight queries abort on graceful shutdown
//! - **Health checks**: liveness and readiness probes
//!
//! ## Example
//!
//! ```rust,no_run
//! use rental_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let state = AppState::<PgListingStore>::connect(config.clone()).await?;
//!     let shutdown = state.shutdown_token().clone();
//!
//!     Server::new(config)
//!         .serve(router(state.clone()), shutdown)
//!         .await?;
//!
//!     state.close().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod ids;
pub mod listing;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub mod prelude {
    pub use crate::api::{router, ListRentalsParams, ListRentalsResponse};
    pub use crate::config::{Config, CorsMode, DatabaseConfig, ListingsConfig, MiddlewareConfig};
    pub use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{MakeTypedRequestId, RequestId};
    pub use crate::listing::{
        DistanceUnit, GeoPoint, InMemoryListingStore, ListPage, ListingStore, PgListingStore,
        QueryError, QueryPlanner, Rental, RentalFilter, RentalId, SortKey,
    };
    pub use crate::observability::init_tracing;
    pub use crate::server::Server;
    pub use crate::state::AppState;

    pub use tokio_util::sync::CancellationToken;
}
