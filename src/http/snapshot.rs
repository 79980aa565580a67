//! `GET /camera/jpeg`: encode the latest frame on demand and return
//! it as a single JPEG image.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};

use crate::capture::CaptureEngine;
use crate::http::handler_table::HttpHandler;

pub struct SnapshotHandler {
    engine: Arc<CaptureEngine>,
}

impl SnapshotHandler {
    pub fn new(engine: Arc<CaptureEngine>) -> Self {
        SnapshotHandler { engine }
    }
}

#[async_trait]
impl HttpHandler for SnapshotHandler {
    async fn handle(&self, _request: Request<Body>) -> Response<Body> {
        if !self.engine.has_frame() {
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from("camera has not produced a frame yet\n"))
                .unwrap();
        }
        if let Err(e) = self.engine.encode_latest() {
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from(format!("{e}\n")))
                .unwrap();
        }
        let jpeg = self.engine.jpeg_snapshot();
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/jpeg")
            .header(header::CONTENT_LENGTH, jpeg.len())
            .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(header::PRAGMA, "no-cache")
            .body(Body::from(jpeg))
            .unwrap()
    }
}
