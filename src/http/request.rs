//! Request extraction.
//!
//! # Responsibilities
//! - Turn an HTTP request into the [`RequestInfo`] the render path sees
//! - Carry the request ID (set by the request-id layer) into fetch extensions
//!
//! # Design Decisions
//! - Never rejects: a request without a usable URI renders as `/`
//! - `original_url` is the origin-form target (path and query), as received

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use serde_json::{Map, Value};

use crate::data::context::RequestInfo;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Extension key the request ID is stored under for fetches.
pub const REQUEST_ID_EXTENSION: &str = "request_id";

/// A request as the render path sees it.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub info: RequestInfo,
    pub request_id: Option<String>,
}

impl RenderRequest {
    pub fn from_parts(parts: &Parts) -> Self {
        let original_url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let request_id = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            info: RequestInfo::from_url(original_url),
            request_id,
        }
    }

    /// Fetch extensions for this request.
    pub fn extensions(&self) -> Map<String, Value> {
        let mut extensions = Map::new();
        if let Some(id) = &self.request_id {
            extensions.insert(REQUEST_ID_EXTENSION.to_string(), Value::String(id.clone()));
        }
        extensions
    }
}

impl<S> FromRequestParts<S> for RenderRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_parts_become_request_info() {
        let request = Request::builder()
            .uri("/users/1?tab=posts")
            .header("x-request-id", "abc")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        let render = RenderRequest::from_parts(&parts);
        assert_eq!(render.info.path, "/users/1");
        assert_eq!(render.info.original_url, "/users/1?tab=posts");
        assert_eq!(render.info.query.get("tab"), Some("posts"));
        assert_eq!(render.extensions()["request_id"], "abc");
    }

    #[test]
    fn test_missing_request_id_adds_no_extension() {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        assert!(RenderRequest::from_parts(&parts).extensions().is_empty());
    }
}
