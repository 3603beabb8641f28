//! Listing store trait and implementations
//!
//! Stores use RPITIT (Return Position Impl Trait In Traits) so the planner can
//! stay generic without `async_trait`.
//!
//! - [`PgListingStore`]: PostgreSQL, one statement per list query
//! - [`InMemoryListingStore`]: fixed snapshot with identical predicate semantics
//!
//! # Example
//!
//! ```rust,ignore
//! use rental_service::listing::{ListingStore, PgListingStore, RentalId};
//!
//! let store = PgListingStore::new(pool);
//! if let Some(rental) = store.get_by_id(RentalId::new(7)).await? {
//!     println!("{} at {}/day", rental.name, rental.price.day);
//! }
//! ```

use std::future::Future;

use super::model::{Rental, RentalId};
use super::plan::{QueryPage, QueryPlan};
use crate::error::DatabaseError;

mod memory;
mod postgres;

pub use memory::InMemoryListingStore;
pub use postgres::PgListingStore;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, DatabaseError>;

/// Read access to the rental catalogue
pub trait ListingStore: Send + Sync {
    /// Find a rental by id
    ///
    /// Returns `Ok(None)` when no rental (with an owner) has this id.
    fn get_by_id(&self, id: RentalId)
        -> impl Future<Output = StoreResult<Option<Rental>>> + Send;

    /// Count every match of `plan.predicates` and return the window of them
    /// selected by `plan.order` and `plan.window`
    ///
    /// The count and the page must come from the same snapshot.
    fn query(&self, plan: &QueryPlan) -> impl Future<Output = StoreResult<QueryPage>> + Send;

    /// Cheap round trip used by the readiness probe
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
