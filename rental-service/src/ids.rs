//! Request identifiers
//!
//! Requests that arrive without an id get a TypeID such as
//! `req_01h455vb4pex5vsknk084sn02q`. The UUIDv7 suffix sorts by creation time.
//!
//! ```rust
//! use rental_service::ids::RequestId;
//!
//! let id = RequestId::new();
//! assert!(id.as_str().starts_with("req_"));
//! ```

use http::{HeaderValue, Request};
use mti::prelude::*;
use std::fmt;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    pub const PREFIX: &'static str = "req";

    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `MakeRequestId` for the request-id middleware
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        HeaderValue::from_str(RequestId::new().as_str())
            .ok()
            .map(TowerRequestId::new)
    }
}
