//! `GET /version`: a trivial, unauthenticated identification endpoint.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::json;

use crate::http::handler_table::HttpHandler;

pub struct VersionHandler {
    body: String,
}

impl VersionHandler {
    pub fn new(name: &str, version: &str) -> Self {
        VersionHandler {
            body: json!({ "name": name, "version": version }).to_string(),
        }
    }
}

#[async_trait]
impl HttpHandler for VersionHandler {
    async fn handle(&self, _request: Request<Body>) -> Response<Body> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(self.body.clone()))
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_name_and_version_as_json() {
        let handler = VersionHandler::new("camweb", "0.1.0");
        let response = handler.handle(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
