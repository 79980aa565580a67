//! Serves the `-web:<path>` static file root for any request not
//! otherwise claimed by a registered handler. Registered at `/` so the
//! handler table's catch-all prefix rule routes everything else
//! here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};

use crate::http::handler_table::HttpHandler;

pub struct StaticFileHandler {
    root: PathBuf,
}

impl StaticFileHandler {
    pub fn new(root: PathBuf) -> Self {
        StaticFileHandler { root }
    }

    fn content_type_for(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("html") | Some("htm") => "text/html; charset=utf-8",
            Some("css") => "text/css; charset=utf-8",
            Some("js") => "application/javascript",
            Some("json") => "application/json",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("svg") => "image/svg+xml",
            Some("ico") => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    /// Resolve `request_path` against the root, rejecting anything that
    /// would escape it via `..` segments.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let trimmed = request_path.trim_start_matches('/');
        let relative = if trimmed.is_empty() { "index.html" } else { trimmed };
        if relative.split('/').any(|segment| segment == "..") {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl HttpHandler for StaticFileHandler {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let Some(path) = self.resolve(request.uri().path()) else {
            return Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::from("400 Bad Request\n"))
                .unwrap();
        };

        match tokio::fs::read(&path).await {
            Ok(contents) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, Self::content_type_for(&path))
                .body(Body::from(contents))
                .unwrap(),
            Err(_) => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("404 Not Found\n"))
                .unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_a_file_from_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        let handler = StaticFileHandler::new(dir.path().to_path_buf());
        let response = handler.handle(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let handler = StaticFileHandler::new(dir.path().to_path_buf());
        let request = Request::builder().uri("/../etc/passwd").body(Body::empty()).unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let handler = StaticFileHandler::new(dir.path().to_path_buf());
        let request = Request::builder().uri("/nope.html").body(Body::empty()).unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
