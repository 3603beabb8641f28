//! In-memory listing store
//!
//! Holds an immutable snapshot of rentals. Used by tests and local fixtures;
//! predicate, count and ordering semantics match [`super::PgListingStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ListingStore, StoreResult};
use crate::listing::model::{Rental, RentalId};
use crate::listing::plan::{QueryPage, QueryPlan};

/// Snapshot store keyed by rental id
///
/// Cloning is cheap; clones share the snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    rentals: Arc<BTreeMap<RentalId, Rental>>,
}

impl InMemoryListingStore {
    /// Build a store from `rentals`; a later rental replaces an earlier one with the same id
    pub fn new(rentals: impl IntoIterator<Item = Rental>) -> Self {
        let rentals = rentals.into_iter().map(|r| (r.id, r)).collect();
        Self {
            rentals: Arc::new(rentals),
        }
    }

    pub fn len(&self) -> usize {
        self.rentals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rentals.is_empty()
    }
}

impl FromIterator<Rental> for InMemoryListingStore {
    fn from_iter<I: IntoIterator<Item = Rental>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl ListingStore for InMemoryListingStore {
    async fn get_by_id(&self, id: RentalId) -> StoreResult<Option<Rental>> {
        Ok(self.rentals.get(&id).cloned())
    }

    async fn query(&self, plan: &QueryPlan) -> StoreResult<QueryPage> {
        let mut matched: Vec<&Rental> = self.rentals.values().filter(|r| plan.matches(r)).collect();
        let total = matched.len() as u64;

        matched.sort_by(|a, b| plan.order.compare(a, b));

        let rentals = matched
            .into_iter()
            .skip(plan.window.offset as usize)
            .take(plan.window.limit as usize)
            .cloned()
            .collect();

        Ok(QueryPage { rentals, total })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::model::{Location, Owner, Price};
    use crate::listing::plan::{Pagination, Predicate, SortOrder};

    fn rental(id: i32, price: i32) -> Rental {
        Rental {
            id: RentalId::new(id),
            name: format!("rental {id}"),
            description: String::new(),
            kind: "camper".into(),
            make: "Ford".into(),
            model: "Transit".into(),
            year: 2018,
            length: 19.5,
            sleeps: 3,
            primary_image_url: String::new(),
            price: Price { day: price },
            location: Location {
                city: "Bend".into(),
                state: "OR".into(),
                zip: "97701".into(),
                country: "US".into(),
                lat: 44.05,
                lng: -121.31,
            },
            owner: Owner {
                id: 1,
                first_name: "Ana".into(),
                last_name: "Diaz".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = InMemoryListingStore::new([rental(1, 10), rental(2, 20)]);
        assert_eq!(store.len(), 2);

        let found = store.get_by_id(RentalId::new(2)).await.unwrap();
        assert_eq!(found.unwrap().price.day, 20);
        assert!(store.get_by_id(RentalId::new(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_counts_before_window() {
        let store: InMemoryListingStore = (1..=5).map(|i| rental(i, i * 10)).collect();
        let plan = QueryPlan::new(
            vec![Predicate::PriceRange { min: 20, max: 40 }],
            SortOrder::Id,
            Pagination::new(1, 1),
        );

        let page = store.query(&plan).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rentals.len(), 1);
        assert_eq!(page.rentals[0].id, RentalId::new(3));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let store = InMemoryListingStore::new([rental(1, 10)]);
        let plan = QueryPlan::new(Vec::new(), SortOrder::Id, Pagination::new(5, 10));

        let page = store.query(&plan).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.rentals.is_empty());
    }
}
