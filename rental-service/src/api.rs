//! HTTP handlers for the rental endpoints
//!
//! - `GET /rentals/{id}`: a single rental, 404 when absent
//! - `GET /rentals`: filtered, paged list with the total match count
//!
//! Query parameters are parsed here into a [`RentalFilter`]; semantic checks
//! (coordinate ranges) happen in the planner.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;

use crate::config::ListingsConfig;
use crate::error::{Error, Result};
use crate::health::{health, readiness};
use crate::listing::{GeoPoint, ListingStore, Rental, RentalFilter, RentalId, SortKey};
use crate::state::AppState;

/// Raw `GET /rentals` query string; every field is optional text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRentalsParams {
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// Comma-separated rental ids
    pub ids: Option<String>,
    /// `"lat,lng"`
    pub near: Option<String>,
    pub sort: Option<String>,
}

impl ListRentalsParams {
    /// Parse into a filter; empty values count as absent
    pub fn into_filter(self, config: &ListingsConfig) -> Result<RentalFilter> {
        let price_min = parse_or(self.price_min.as_deref(), "price_min", 0)?;
        let price_max = parse_or(self.price_max.as_deref(), "price_max", i32::MAX)?;
        let limit = parse_or(self.limit.as_deref(), "limit", config.default_limit)?;
        let offset = parse_or(self.offset.as_deref(), "offset", 0)?;

        if limit > config.max_limit {
            return Err(Error::BadRequest(format!(
                "limit must not exceed {}",
                config.max_limit
            )));
        }

        let mut filter = RentalFilter::new()
            .with_price_range(price_min, price_max)
            .with_window(offset, limit);

        if let Some(ids) = non_empty(self.ids.as_deref()) {
            filter = filter.with_ids(parse_ids(ids)?);
        }
        if let Some(near) = non_empty(self.near.as_deref()) {
            filter = filter.near(parse_near(near)?);
        }
        if let Some(sort) = non_empty(self.sort.as_deref()) {
            filter = filter.sorted_by(SortKey::from_str(sort)?);
        }

        Ok(filter)
    }
}

/// `GET /rentals` response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRentalsResponse {
    pub total: u64,
    pub rentals: Vec<Rental>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(value: Option<&str>, name: &str, default: T) -> Result<T> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::BadRequest(format!("Invalid {name} parameter"))),
    }
}

fn parse_ids(raw: &str) -> Result<Vec<RentalId>> {
    raw.split(',')
        .map(|part| {
            part.parse::<RentalId>()
                .map_err(|_| Error::BadRequest("Invalid ids parameter".to_string()))
        })
        .collect()
}

fn parse_near(raw: &str) -> Result<GeoPoint> {
    let invalid = || Error::BadRequest("Invalid near parameter".to_string());

    let coords = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;

    match coords.as_slice() {
        [lat, lng] => Ok(GeoPoint::new(*lat, *lng)),
        _ => Err(invalid()),
    }
}

/// [`Query`] that rejects with the JSON error body instead of plain text
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(params)| Self(params))
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))
    }
}

/// `GET /rentals/{id}`
pub async fn get_rental<S: ListingStore>(
    State(state): State<AppState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Rental>> {
    let id: RentalId = raw_id
        .parse()
        .map_err(|_| Error::BadRequest("Invalid rental ID".to_string()))?;

    let cancel = state.request_token();
    state
        .planner()
        .get(id, &cancel)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound("Rental not found".to_string()))
}

/// `GET /rentals`
pub async fn list_rentals<S: ListingStore>(
    State(state): State<AppState<S>>,
    QueryParams(params): QueryParams<ListRentalsParams>,
) -> Result<Json<ListRentalsResponse>> {
    let filter = params.into_filter(&state.config().listings)?;

    let cancel = state.request_token();
    let page = state.planner().list(&filter, &cancel).await?;

    Ok(Json(ListRentalsResponse {
        total: page.total,
        rentals: page.rentals,
    }))
}

/// All service routes with `state` attached
pub fn router<S: ListingStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/ready", get(readiness::<S>))
        .route("/rentals", get(list_rentals::<S>))
        .route("/rentals/{id}", get(get_rental::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::listing::{InMemoryListingStore, Location, Owner, Price};
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn rental(id: i32, price: i32, lat: f64, lng: f64) -> Rental {
        Rental {
            id: RentalId::new(id),
            name: format!("Rental {id}"),
            description: "A rental".into(),
            kind: "camper-van".into(),
            make: "Mercedes".into(),
            model: "Sprinter".into(),
            year: 2021,
            length: 22.0,
            sleeps: 4,
            primary_image_url: format!("https://img.example/{id}.jpg"),
            price: Price { day: price },
            location: Location {
                city: "Denver".into(),
                state: "CO".into(),
                zip: "80202".into(),
                country: "US".into(),
                lat,
                lng,
            },
            owner: Owner {
                id: 100 + id,
                first_name: "Kai".into(),
                last_name: "Moreno".into(),
            },
        }
    }

    fn app() -> Router {
        let store = InMemoryListingStore::new([
            rental(1, 50, 39.7392, -104.9903),
            rental(2, 150, 39.7392, -104.9903),
            rental(3, 100, 40.0150, -105.2705),
            rental(4, 75, 47.6062, -122.3321),
        ]);
        router(AppState::new(Config::default(), store))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn ids(body: &Value) -> Vec<i64> {
        body["rentals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_get_rental() {
        let (status, body) = get_json(app(), "/rentals/3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 3);
        assert_eq!(body["price"]["day"], 100);
        assert_eq!(body["user"]["id"], 103);
        assert_eq!(body["location"]["city"], "Denver");
    }

    #[tokio::test]
    async fn test_get_rental_not_found() {
        let (status, body) = get_json(app(), "/rentals/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_rental_bad_id() {
        let (status, body) = get_json(app(), "/rentals/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid rental ID");
    }

    #[tokio::test]
    async fn test_list_defaults() {
        let (status, body) = get_json(app(), "/rentals").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 4);
        assert_eq!(ids(&body), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_list_price_sorted_page() {
        let (status, body) = get_json(
            app(),
            "/rentals?price_min=60&price_max=150&sort=price&limit=2&offset=0",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(ids(&body), vec![4, 3]);

        let (_, body) = get_json(app(), "/rentals?price_min=60&sort=price&limit=2&offset=2").await;
        assert_eq!(body["total"], 3);
        assert_eq!(ids(&body), vec![2]);
    }

    #[tokio::test]
    async fn test_list_ids_and_near() {
        let (_, body) = get_json(app(), "/rentals?ids=2,4,9").await;
        assert_eq!(body["total"], 2);
        assert_eq!(ids(&body), vec![2, 4]);

        // Boulder is ~25 miles from Denver, Seattle is not within 100
        let (_, body) = get_json(app(), "/rentals?near=39.7392,-104.9903").await;
        assert_eq!(ids(&body), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_empty_params_are_absent() {
        let (status, body) = get_json(app(), "/rentals?ids=&near=&sort=&limit=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 4);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_params() {
        for (uri, message) in [
            ("/rentals?price_min=cheap", "Invalid price_min parameter"),
            ("/rentals?price_max=1.5", "Invalid price_max parameter"),
            ("/rentals?limit=-1", "Invalid limit parameter"),
            ("/rentals?offset=x", "Invalid offset parameter"),
            ("/rentals?ids=1,two", "Invalid ids parameter"),
            ("/rentals?near=39.7", "Invalid near parameter"),
            ("/rentals?near=1,2,3", "Invalid near parameter"),
            ("/rentals?limit=101", "limit must not exceed 100"),
        ] {
            let (status, body) = get_json(app(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], message, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_list_rejects_semantic_errors() {
        let (status, body) = get_json(app(), "/rentals?sort=distance").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = get_json(app(), "/rentals?near=91,0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_canceled_on_shutdown() {
        let state = AppState::new(Config::default(), InMemoryListingStore::new([rental(1, 10, 0.0, 0.0)]));
        state.shutdown_token().cancel();

        let (status, body) = get_json(router(state), "/rentals").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "REQUEST_CANCELED");
    }

    #[tokio::test]
    async fn test_repeated_parameter_is_json_bad_request() {
        let (status, body) = get_json(app(), "/rentals?ids=1&ids=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("ids"));
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let (status, body) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(app(), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["database"]["healthy"], true);
        assert!(body["database"].get("error").is_none());
    }

    #[test]
    fn test_into_filter() {
        let params = ListRentalsParams {
            price_min: Some("10".into()),
            ids: Some("3, 1".into()),
            near: Some(" 45.5 , -122.6 ".into()),
            sort: Some("price".into()),
            ..ListRentalsParams::default()
        };

        let filter = params.into_filter(&ListingsConfig::default()).unwrap();
        assert_eq!(filter.price_min, 10);
        assert_eq!(filter.price_max, i32::MAX);
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.ids, vec![RentalId::new(3), RentalId::new(1)]);
        assert_eq!(filter.near, Some(GeoPoint::new(45.5, -122.6)));
        assert_eq!(filter.sort, SortKey::Price);
    }
}
