//! `GET /camera/mjpeg`: a `multipart/x-mixed-replace` stream of
//! successive JPEG frames, generated with `async_stream::stream!` and a
//! `tokio::time::interval` ticker. An explicit bounded producer/consumer
//! channel stands in for the backlog counter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use bytes::Bytes;
use tracing::debug;

use crate::capture::CaptureEngine;
use crate::http::handler_table::HttpHandler;

const BOUNDARY: &str = "camwebboundary";
/// Frames in flight before the producer starts dropping rather than
/// blocking; bounds backlog to roughly 2x a single JPEG frame.
const BACKLOG_CAPACITY: usize = 2;

pub struct MjpegHandler {
    engine: Arc<CaptureEngine>,
    frame_interval: Duration,
}

impl MjpegHandler {
    pub fn new(engine: Arc<CaptureEngine>, fps: u32) -> Self {
        MjpegHandler {
            engine,
            frame_interval: Duration::from_millis(1000 / fps.max(1) as u64),
        }
    }

    fn encode_part(jpeg: &[u8]) -> Bytes {
        let mut part = Vec::with_capacity(jpeg.len() + 128);
        part.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n", jpeg.len())
                .as_bytes(),
        );
        part.extend_from_slice(jpeg);
        part.extend_from_slice(b"\r\n");
        Bytes::from(part)
    }
}

#[async_trait]
impl HttpHandler for MjpegHandler {
    async fn handle(&self, _request: Request<Body>) -> Response<Body> {
        let engine = self.engine.clone();
        let interval = self.frame_interval;
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Bytes>(BACKLOG_CAPACITY);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                if engine.encode_latest().is_err() {
                    continue;
                }
                let jpeg = engine.jpeg_snapshot();
                if jpeg.is_empty() {
                    continue;
                }
                if tx.try_send(MjpegHandler::encode_part(&jpeg)).is_err() {
                    debug!("mjpeg client is behind; dropping a frame rather than buffering it");
                }
            }
        });

        let stream = async_stream::stream! {
            while let Some(chunk) = rx.recv().await {
                yield Ok::<_, std::io::Error>(chunk);
            }
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
            )
            .body(Body::from_stream(stream))
            .unwrap()
    }
}
