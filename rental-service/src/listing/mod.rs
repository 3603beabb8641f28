//! Listing query engine
//!
//! Turns a [`RentalFilter`] into a correctly counted, deterministically ordered
//! page of [`Rental`]s. The [`QueryPlanner`] validates and plans; a
//! [`ListingStore`] executes the plan.

mod error;
mod filter;
mod geo;
mod model;
mod plan;
mod planner;
mod store;

pub use error::QueryError;
pub use filter::{RentalFilter, SortKey};
pub use geo::{
    haversine_distance, latitude_band, DistanceUnit, GeoPoint, EARTH_RADIUS_KM,
    EARTH_RADIUS_MILES,
};
pub use model::{Location, Owner, ParseRentalIdError, Price, Rental, RentalId};
pub use plan::{Pagination, Predicate, QueryPage, QueryPlan, SortOrder};
pub use planner::{ListPage, QueryPlanner};
pub use store::{InMemoryListingStore, ListingStore, PgListingStore, StoreResult};
