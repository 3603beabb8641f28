//! PostgreSQL listing store
//!
//! A list request runs as a single statement:
//!
//! ```sql
//! WITH matched AS NOT MATERIALIZED (SELECT ... FROM rentals r JOIN users u ... WHERE <predicates>)
//! SELECT counted.total_count, page.*
//! FROM (SELECT COUNT(*) AS total_count FROM matched) counted
//! LEFT JOIN LATERAL (SELECT * FROM matched ORDER BY ... LIMIT $n OFFSET $m) page ON TRUE
//! ORDER BY ...
//! ```
//!
//! so the total and the page see the same predicates and the same snapshot. The
//! CTE is inlined into both references, so the page can walk `(price_day, id)`
//! and stop after `LIMIT + OFFSET` rows. The count row is always present; an
//! empty page comes back as one row whose rental columns are all NULL.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use super::{ListingStore, StoreResult};
use crate::error::DatabaseError;
use crate::listing::geo::latitude_band;
use crate::listing::model::{Location, Owner, Price, Rental, RentalId};
use crate::listing::plan::{Predicate, QueryPage, QueryPlan, SortOrder};

const RENTAL_COLUMNS: &str = "r.id, r.name, r.description, r.type AS kind, r.make, r.model, \
     r.year, r.length, r.sleeps, r.primary_image_url, r.price_day, \
     r.location_city, r.location_state, r.location_zip, r.location_country, \
     r.location_lat, r.location_lng, \
     u.id AS owner_id, u.first_name AS owner_first_name, u.last_name AS owner_last_name";

const RENTAL_SOURCE: &str = " FROM rentals r JOIN users u ON u.id = r.user_id";

/// Listing store backed by a shared connection pool
#[derive(Debug, Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ListingStore for PgListingStore {
    async fn get_by_id(&self, id: RentalId) -> StoreResult<Option<Rental>> {
        let sql = format!("SELECT {RENTAL_COLUMNS}{RENTAL_SOURCE} WHERE r.id = $1");

        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(e).add_context(format!("get rental {id}")))?;

        row.as_ref()
            .map(decode_rental)
            .transpose()
            .map_err(DatabaseError::from)
    }

    async fn query(&self, plan: &QueryPlan) -> StoreResult<QueryPage> {
        let mut builder = build_list_query(plan);
        tracing::debug!(sql = builder.sql(), "listing query");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from(e).add_context("list rentals"))?;

        decode_page(&rows).map_err(DatabaseError::from)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(DatabaseError::from)
    }
}

/// Build the count-plus-page statement for `plan`
fn build_list_query(plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("WITH matched AS NOT MATERIALIZED (SELECT ");
    qb.push(RENTAL_COLUMNS);
    qb.push(RENTAL_SOURCE);
    qb.push(" WHERE TRUE");
    for predicate in &plan.predicates {
        qb.push(" AND (");
        push_predicate(&mut qb, predicate);
        qb.push(")");
    }
    qb.push(") SELECT counted.total_count, page.* FROM (SELECT COUNT(*) AS total_count FROM matched) counted");
    qb.push(" LEFT JOIN LATERAL (SELECT * FROM matched ORDER BY ");
    qb.push(order_clause(plan.order, None));
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(plan.window.limit));
    qb.push(" OFFSET ");
    qb.push_bind(i64::from(plan.window.offset));
    qb.push(") page ON TRUE ORDER BY ");
    qb.push(order_clause(plan.order, Some("page")));
    qb
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::PriceRange { min, max } => {
            qb.push("r.price_day >= ");
            qb.push_bind(*min);
            qb.push(" AND r.price_day <= ");
            qb.push_bind(*max);
        }
        Predicate::IdIn(ids) => {
            let ids: Vec<i32> = ids.iter().map(|id| id.get()).collect();
            qb.push("r.id = ANY(");
            qb.push_bind(ids);
            qb.push(")");
        }
        Predicate::Within {
            center,
            radius,
            unit,
        } => {
            let band = latitude_band(*radius, *unit);

            // latitude band first so an index on location_lat can prune
            qb.push("r.location_lat BETWEEN ");
            qb.push_bind(center.lat - band);
            qb.push(" AND ");
            qb.push_bind(center.lat + band);

            qb.push(" AND 2 * ");
            qb.push_bind(unit.earth_radius());
            qb.push(" * ASIN(SQRT(LEAST(1.0, POWER(SIN(RADIANS(r.location_lat - ");
            qb.push_bind(center.lat);
            qb.push(") / 2), 2) + COS(RADIANS(");
            qb.push_bind(center.lat);
            qb.push(")) * COS(RADIANS(r.location_lat)) * POWER(SIN(RADIANS(r.location_lng - ");
            qb.push_bind(center.lng);
            qb.push(") / 2), 2)))) <= ");
            qb.push_bind(*radius);
        }
    }
}

/// `ORDER BY` body for `order`, optionally qualified by a table alias
fn order_clause(order: SortOrder, alias: Option<&str>) -> String {
    order
        .keys()
        .iter()
        .map(|column| match alias {
            Some(alias) => format!("{alias}.{column} ASC"),
            None => format!("{column} ASC"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_page(rows: &[PgRow]) -> Result<QueryPage, sqlx::Error> {
    let total = match rows.first() {
        Some(row) => row.try_get::<i64, _>("total_count")?.max(0) as u64,
        None => 0,
    };

    let mut rentals = Vec::with_capacity(rows.len());
    for row in rows {
        // LEFT JOIN padding when the window is empty
        if row.try_get::<Option<i32>, _>("id")?.is_none() {
            continue;
        }
        rentals.push(decode_rental(row)?);
    }

    Ok(QueryPage { rentals, total })
}

fn decode_rental(row: &PgRow) -> Result<Rental, sqlx::Error> {
    Ok(Rental {
        id: RentalId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        kind: row.try_get("kind")?,
        make: row.try_get("make")?,
        model: row.try_get("model")?,
        year: row.try_get("year")?,
        length: row.try_get("length")?,
        sleeps: row.try_get("sleeps")?,
        primary_image_url: row
            .try_get::<Option<String>, _>("primary_image_url")?
            .unwrap_or_default(),
        price: Price {
            day: row.try_get("price_day")?,
        },
        location: Location {
            city: row.try_get("location_city")?,
            state: row.try_get("location_state")?,
            zip: row.try_get("location_zip")?,
            country: row.try_get("location_country")?,
            lat: row.try_get("location_lat")?,
            lng: row.try_get("location_lng")?,
        },
        owner: Owner {
            id: row.try_get("owner_id")?,
            first_name: row.try_get("owner_first_name")?,
            last_name: row.try_get("owner_last_name")?,
        },
    })
}


/// Runs against a live database named by `RENTAL_TEST_DATABASE_URL`
#[cfg(all(test, feature = "pg-tests"))]
mod pg_tests {
    use super::*;
    use crate::listing::geo::{DistanceUnit, GeoPoint};
    use crate::listing::plan::Pagination;
    use sqlx::postgres::PgPoolOptions;

    /// One-connection pool with the fixture in temp tables, which shadow any
    /// real tables and live as long as the pooled session
    async fn fixture_store() -> PgListingStore {
        let url = std::env::var("RENTAL_TEST_DATABASE_URL")
            .expect("RENTAL_TEST_DATABASE_URL must be set for pg-tests");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .unwrap();

        for ddl in [
            "CREATE TEMP TABLE users (id INTEGER PRIMARY KEY, first_name TEXT NOT NULL, last_name TEXT NOT NULL)",
            "CREATE TEMP TABLE rentals (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, name TEXT NOT NULL, \
             description TEXT NOT NULL, type TEXT NOT NULL, make TEXT NOT NULL, model TEXT NOT NULL, \
             year INTEGER NOT NULL, length DOUBLE PRECISION NOT NULL, sleeps INTEGER NOT NULL, \
             primary_image_url TEXT, price_day INTEGER NOT NULL, location_city TEXT NOT NULL, \
             location_state TEXT NOT NULL, location_zip TEXT NOT NULL, location_country TEXT NOT NULL, \
             location_lat DOUBLE PRECISION NOT NULL, location_lng DOUBLE PRECISION NOT NULL)",
            "INSERT INTO users VALUES (1, 'Ana', 'Diaz')",
        ] {
            sqlx::query(ddl).execute(&pool).await.unwrap();
        }

        // id, price, lat, lng; rental 6 has no owner row
        let fixture = [
            (1, 50, 45.5152, -122.6784),
            (2, 75, 45.5200, -122.6800),
            (3, 100, 47.6062, -122.3321),
            (4, 150, 45.5152, -122.6784),
            (5, 75, 34.0522, -118.2437),
        ];
        for (id, price, lat, lng) in fixture {
            sqlx::query(
                "INSERT INTO rentals VALUES ($1, 1, 'r', 'd', 'camper', 'VW', 'Bus', 1979, 15.0, 2, \
                 NULL, $2, 'c', 's', 'z', 'US', $3, $4)",
            )
            .bind(id)
            .bind(price)
            .bind(lat)
            .bind(lng)
            .execute(&pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO rentals VALUES (6, 99, 'orphan', 'd', 'camper', 'VW', 'Bus', 1979, 15.0, 2, \
             'http://x', 60, 'c', 's', 'z', 'US', 45.5, -122.6)",
        )
        .execute(&pool)
        .await
        .unwrap();

        PgListingStore::new(pool)
    }

    fn ids(page: &QueryPage) -> Vec<i32> {
        page.rentals.iter().map(|r| r.id.get()).collect()
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let store = fixture_store().await;

        let rental = store.get_by_id(RentalId::new(3)).await.unwrap().unwrap();
        assert_eq!(rental.price.day, 100);
        assert_eq!(rental.primary_image_url, "");
        assert_eq!(rental.owner.first_name, "Ana");

        assert!(store.get_by_id(RentalId::new(42)).await.unwrap().is_none());
        // no owner, never surfaced
        assert!(store.get_by_id(RentalId::new(6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_sorted_pages() {
        let store = fixture_store().await;
        let predicates = vec![
            Predicate::PriceRange { min: 60, max: 150 },
            Predicate::IdIn((1..=4).map(RentalId::new).collect()),
        ];

        let mut window = Pagination::first_page(2);
        let mut seen = Vec::new();
        for expected in [vec![2, 3], vec![4], vec![]] {
            let plan = QueryPlan::new(predicates.clone(), SortOrder::PriceThenId, window);
            let page = store.query(&plan).await.unwrap();
            assert_eq!(page.total, 3);
            assert_eq!(ids(&page), expected);
            seen.extend(ids(&page));
            window = window.next();
        }
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_within_radius() {
        let store = fixture_store().await;
        let plan = QueryPlan::new(
            vec![Predicate::Within {
                center: GeoPoint::new(45.5152, -122.6784),
                radius: 0.0,
                unit: DistanceUnit::Miles,
            }],
            SortOrder::Id,
            Pagination::first_page(10),
        );

        let page = store.query(&plan).await.unwrap();
        assert_eq!(ids(&page), vec![1, 4]);

        let plan = QueryPlan::new(
            vec![Predicate::Within {
                center: GeoPoint::new(45.5152, -122.6784),
                radius: 200.0,
                unit: DistanceUnit::Miles,
            }],
            SortOrder::Id,
            Pagination::first_page(10),
        );
        let page = store.query(&plan).await.unwrap();
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_empty_windows() {
        let store = fixture_store().await;

        let plan = QueryPlan::new(Vec::new(), SortOrder::Id, Pagination::new(0, 0));
        let page = store.query(&plan).await.unwrap();
        assert_eq!(page.total, 5);
        assert!(page.rentals.is_empty());

        let plan = QueryPlan::new(
            vec![Predicate::PriceRange { min: 200, max: 100 }],
            SortOrder::Id,
            Pagination::first_page(10),
        );
        let page = store.query(&plan).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(page.rentals.is_empty());
    }
}
