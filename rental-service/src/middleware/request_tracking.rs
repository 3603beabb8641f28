//! Request ID generation and propagation, plus sensitive header masking

use http::header::{HeaderName, AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION, SET_COOKIE};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::error::{Error, Result};
use crate::ids::MakeTypedRequestId;

/// Headers never written to logs or traces
pub fn sensitive_headers() -> [HeaderName; 5] {
    [
        AUTHORIZATION,
        PROXY_AUTHORIZATION,
        COOKIE,
        SET_COOKIE,
        HeaderName::from_static("x-api-key"),
    ]
}

/// Parse the configured request-id header name
pub fn request_id_header(name: &str) -> Result<HeaderName> {
    HeaderName::try_from(name)
        .map_err(|e| Error::Internal(format!("invalid request_id_header '{name}': {e}")))
}

/// Tag requests that arrive without an id in `header`
pub fn request_id_layer(header: HeaderName) -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::new(header, MakeTypedRequestId)
}

/// Copy the request id in `header` onto the response
pub fn request_id_propagation_layer(header: HeaderName) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header)
}

pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(sensitive_headers())
}
