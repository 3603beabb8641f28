//! Query plans handed from the planner to a listing store
//!
//! A [`QueryPlan`] is the store-facing form of a validated filter: a conjunction
//! of [`Predicate`]s, a total [`SortOrder`], and a [`Pagination`] window. Stores
//! count matches before applying the window and page after sorting.
//!
//! # Example
//!
//! ```rust
//! use rental_service::listing::{Pagination, Predicate, QueryPlan, SortOrder};
//!
//! let plan = QueryPlan::new(
//!     vec![Predicate::PriceRange { min: 60, max: 150 }],
//!     SortOrder::PriceThenId,
//!     Pagination::new(0, 2),
//! );
//! assert_eq!(plan.window.limit, 2);
//! ```

use super::geo::{haversine_distance, DistanceUnit, GeoPoint};
use super::model::{Rental, RentalId};

/// Total order applied to matches before paging
///
/// Every order ends on the rental id, so two rentals never compare equal and
/// consecutive windows neither skip nor repeat rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// `id ASC`
    #[default]
    Id,
    /// `price_day ASC, id ASC`
    PriceThenId,
}

impl SortOrder {
    /// Ascending sort columns, most significant first
    #[must_use]
    pub const fn keys(self) -> &'static [&'static str] {
        match self {
            Self::Id => &["id"],
            Self::PriceThenId => &["price_day", "id"],
        }
    }

    /// Compare two rentals under this order
    #[must_use]
    pub fn compare(self, a: &Rental, b: &Rental) -> std::cmp::Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::PriceThenId => a
                .price
                .day
                .cmp(&b.price.day)
                .then_with(|| a.id.cmp(&b.id)),
        }
    }
}

/// Pagination window applied after counting and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u32,
    /// Maximum number of results to return
    pub limit: u32,
}

impl Pagination {
    #[must_use]
    pub const fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    /// Window over the first `limit` results
    #[must_use]
    pub const fn first_page(limit: u32) -> Self {
        Self { offset: 0, limit }
    }

    /// The window that follows this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first_page(20)
    }
}

/// A single restriction on the set of matching rentals
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `min <= price_day <= max`; empty when `min > max`
    PriceRange { min: i32, max: i32 },
    /// Id is one of the listed ids
    IdIn(Vec<RentalId>),
    /// Haversine distance from `center` is at most `radius`
    Within {
        center: GeoPoint,
        radius: f64,
        unit: DistanceUnit,
    },
}

impl Predicate {
    /// Evaluate the predicate against a single rental
    #[must_use]
    pub fn matches(&self, rental: &Rental) -> bool {
        match self {
            Self::PriceRange { min, max } => (*min..=*max).contains(&rental.price.day),
            Self::IdIn(ids) => ids.contains(&rental.id),
            Self::Within {
                center,
                radius,
                unit,
            } => {
                let at = GeoPoint::new(rental.location.lat, rental.location.lng);
                haversine_distance(*center, at, *unit) <= *radius
            }
        }
    }
}

/// Everything a store needs to answer one list request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Conjunction of restrictions
    pub predicates: Vec<Predicate>,
    pub order: SortOrder,
    pub window: Pagination,
}

impl QueryPlan {
    #[must_use]
    pub fn new(predicates: Vec<Predicate>, order: SortOrder, window: Pagination) -> Self {
        Self {
            predicates,
            order,
            window,
        }
    }

    /// Whether `rental` satisfies every predicate
    #[must_use]
    pub fn matches(&self, rental: &Rental) -> bool {
        self.predicates.iter().all(|p| p.matches(rental))
    }
}

/// One window of results plus the count of all matches
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPage {
    pub rentals: Vec<Rental>,
    /// Matches before the window was applied
    pub total: u64,
}
