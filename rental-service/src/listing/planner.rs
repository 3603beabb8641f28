//! Query planner: validate a filter, plan it, run it against a store

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::error::QueryError;
use super::filter::RentalFilter;
use super::geo::DistanceUnit;
use super::model::{Rental, RentalId};
use super::plan::{Predicate, QueryPlan};
use super::store::{ListingStore, StoreResult};
use crate::config::ListingsConfig;
use crate::error::{DatabaseError, DatabaseOperation};

/// One page of list results with the count of all matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage {
    pub total: u64,
    pub rentals: Vec<Rental>,
}

/// Translates [`RentalFilter`]s into [`QueryPlan`]s and executes them
///
/// Holds no mutable state; share it behind an `Arc`.
#[derive(Debug)]
pub struct QueryPlanner<S> {
    store: S,
    proximity_radius: f64,
    distance_unit: DistanceUnit,
    query_timeout: Duration,
}

impl<S: ListingStore> QueryPlanner<S> {
    pub fn new(store: S, config: &ListingsConfig) -> Self {
        Self {
            store,
            proximity_radius: config.proximity_radius,
            distance_unit: config.distance_unit,
            query_timeout: config.query_timeout(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate `filter` and build the plan a store executes
    ///
    /// The price range is always present; the id set and proximity predicates
    /// only when the filter asks for them.
    pub fn plan(&self, filter: &RentalFilter) -> Result<QueryPlan, QueryError> {
        filter.validate()?;

        let mut predicates = vec![Predicate::PriceRange {
            min: filter.price_min,
            max: filter.price_max,
        }];
        if !filter.ids.is_empty() {
            predicates.push(Predicate::IdIn(filter.ids.clone()));
        }
        if let Some(center) = filter.near {
            predicates.push(Predicate::Within {
                center,
                radius: self.proximity_radius,
                unit: self.distance_unit,
            });
        }

        Ok(QueryPlan::new(predicates, filter.sort.order(), filter.window()))
    }

    /// Fetch a single rental; `Ok(None)` when it does not exist
    #[tracing::instrument(skip(self, id, cancel), fields(rental_id = %id))]
    pub async fn get(
        &self,
        id: RentalId,
        cancel: &CancellationToken,
    ) -> Result<Option<Rental>, QueryError> {
        let rental = self.run(self.store.get_by_id(id), cancel).await?;
        tracing::debug!(found = rental.is_some(), "rental lookup finished");
        Ok(rental)
    }

    /// List the rentals matching `filter` along with the total match count
    #[tracing::instrument(
        skip(self, filter, cancel),
        fields(
            limit = filter.limit,
            offset = filter.offset,
            sort = ?filter.sort,
            near = filter.near.is_some(),
            ids = filter.ids.len(),
        )
    )]
    pub async fn list(
        &self,
        filter: &RentalFilter,
        cancel: &CancellationToken,
    ) -> Result<ListPage, QueryError> {
        let plan = self.plan(filter)?;
        let page = self.run(self.store.query(&plan), cancel).await?;

        tracing::debug!(
            total = page.total,
            returned = page.rentals.len(),
            "rental list finished"
        );

        Ok(ListPage {
            total: page.total,
            rentals: page.rentals,
        })
    }

    /// Race a store call against cancellation and the per-query timeout
    async fn run<T>(
        &self,
        call: impl Future<Output = StoreResult<T>>,
        cancel: &CancellationToken,
    ) -> Result<T, QueryError> {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!("listing query canceled");
                Err(QueryError::Canceled)
            }
            outcome = tokio::time::timeout(self.query_timeout, call) => match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => {
                    tracing::error!(
                        operation = %err.operation,
                        kind = %err.kind,
                        context = ?err.context,
                        "listing store failed: {}",
                        err.message
                    );
                    Err(QueryError::Internal(err))
                }
                Err(_) => {
                    tracing::warn!(timeout = ?self.query_timeout, "listing query timed out");
                    Err(QueryError::Internal(DatabaseError::timeout(
                        DatabaseOperation::Query,
                        format!("listing query exceeded {:?}", self.query_timeout),
                    )))
                }
            },
        }
    }
}
