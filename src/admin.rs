//! The admin HTTP server's own small surface: `/status` reports
//! whether the capture engine is currently running, independent of the
//! main server's camera/property endpoints. `POST` with `{"running":0}` or
//! `{"running":1}` stops or starts capture.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::json;

use crate::capture::CaptureEngine;
use crate::core::json::parse_flat_object;
use crate::http::handler_table::HttpHandler;

pub struct StatusHandler {
    engine: Arc<CaptureEngine>,
}

impl StatusHandler {
    pub fn new(engine: Arc<CaptureEngine>) -> Self {
        StatusHandler { engine }
    }

    fn status_response(&self) -> Response<Body> {
        let running = if self.engine.is_running() { 1 } else { 0 };
        let body = json!({ "running": running }).to_string();
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn handle_post(&self, request: Request<Body>) -> Response<Body> {
        let body = match axum::body::to_bytes(request.into_body(), 1 << 16).await {
            Ok(bytes) => bytes,
            Err(_) => return bad_request("body too large"),
        };
        let text = match std::str::from_utf8(&body) {
            Ok(t) => t,
            Err(_) => return bad_request("body is not valid utf-8"),
        };
        let entries = match parse_flat_object(text) {
            Ok(entries) => entries,
            Err(e) => return bad_request(&format!("invalid JSON: {e}")),
        };
        let Some((_, running)) = entries.iter().find(|(k, _)| k == "running") else {
            return bad_request("missing 'running' field");
        };
        match running.as_str() {
            "0" => {
                self.engine.signal_to_stop();
                self.engine.wait_for_stop();
            }
            "1" => {
                if let Err(e) = self.engine.start() {
                    return Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Body::from(format!("{e}\n")))
                        .unwrap();
                }
            }
            _ => return bad_request("'running' must be 0 or 1"),
        }
        self.status_response()
    }
}

fn bad_request(message: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"error":"{message}"}}"#)))
        .unwrap()
}

#[async_trait]
impl HttpHandler for StatusHandler {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        match *request.method() {
            axum::http::Method::POST => self.handle_post(request).await,
            axum::http::Method::GET => self.status_response(),
            _ => Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, "GET, POST")
                .body(Body::from("405 Method Not Allowed\n"))
                .unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::MockSource;

    #[tokio::test]
    async fn reports_not_running_before_start() {
        let backend = Arc::new(MockSource::new(4, 4, 1));
        let engine = CaptureEngine::new(backend, None, 80, true).unwrap();
        let handler = StatusHandler::new(engine);
        let response = handler.handle(Request::new(Body::empty())).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), br#"{"running":0}"#);
    }

    #[tokio::test]
    async fn reports_running_after_start() {
        let backend = Arc::new(MockSource::new(4, 4, 1));
        let engine = CaptureEngine::new(backend, None, 80, true).unwrap();
        engine.start().unwrap();
        let handler = StatusHandler::new(engine.clone());
        let response = handler.handle(Request::new(Body::empty())).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), br#"{"running":1}"#);
        engine.signal_to_stop();
        engine.wait_for_stop();
    }

    #[tokio::test]
    async fn post_running_1_starts_capture() {
        let backend = Arc::new(MockSource::new(4, 4, 1));
        let engine = CaptureEngine::new(backend, None, 80, true).unwrap();
        let handler = StatusHandler::new(engine.clone());
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"running":"1"}"#))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(engine.is_running());
        engine.signal_to_stop();
        engine.wait_for_stop();
    }

    #[tokio::test]
    async fn post_running_0_stops_capture() {
        let backend = Arc::new(MockSource::new(4, 4, 1));
        let engine = CaptureEngine::new(backend, None, 80, true).unwrap();
        engine.start().unwrap();
        let handler = StatusHandler::new(engine.clone());
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"running":"0"}"#))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected_with_allow_header() {
        let backend = Arc::new(MockSource::new(4, 4, 1));
        let engine = CaptureEngine::new(backend, None, 80, true).unwrap();
        let handler = StatusHandler::new(engine);
        let request = Request::builder().method("DELETE").body(Body::empty()).unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, POST");
    }
}
