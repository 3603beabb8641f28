//! Structured listing filter built by the request adapter

use std::str::FromStr;

use super::error::QueryError;
use super::geo::GeoPoint;
use super::model::RentalId;
use super::plan::{Pagination, SortOrder};

/// Requested ordering of list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Ascending rental id
    #[default]
    Default,
    /// Ascending daily price, ties broken by id
    Price,
}

impl SortKey {
    /// The total order a store applies for this key
    #[must_use]
    pub const fn order(self) -> SortOrder {
        match self {
            Self::Default => SortOrder::Id,
            Self::Price => SortOrder::PriceThenId,
        }
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Default),
            "price" => Ok(Self::Price),
            other => Err(QueryError::validation(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

/// One list request's worth of restrictions
///
/// `price_min > price_max` is accepted and matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalFilter {
    pub price_min: i32,
    pub price_max: i32,
    pub limit: u32,
    pub offset: u32,
    /// Restrict to these ids when non-empty
    pub ids: Vec<RentalId>,
    /// Restrict to the proximity radius around this point
    pub near: Option<GeoPoint>,
    pub sort: SortKey,
}

impl Default for RentalFilter {
    fn default() -> Self {
        Self {
            price_min: 0,
            price_max: i32::MAX,
            limit: Pagination::default().limit,
            offset: 0,
            ids: Vec::new(),
            near: None,
            sort: SortKey::Default,
        }
    }
}

impl RentalFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_price_range(mut self, min: i32, max: i32) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    #[must_use]
    pub fn with_window(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = RentalId>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn near(mut self, point: GeoPoint) -> Self {
        self.near = Some(point);
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// The pagination window this filter asks for
    #[must_use]
    pub const fn window(&self) -> Pagination {
        Pagination::new(self.offset, self.limit)
    }

    /// Reject filters the store cannot evaluate
    pub fn validate(&self) -> Result<(), QueryError> {
        if let Some(point) = &self.near {
            point.validate().map_err(QueryError::Validation)?;
        }
        Ok(())
    }
}
