//! URI registration and dispatch lookup. URIs are normalized (leading `/`
//! enforced, trailing `/` stripped except for the root), matched exactly
//! first, then by registration-order prefix among the handlers registered
//! for a subtree.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

use crate::http::auth::UserGroup;

/// A single registered endpoint. Implementations are async because several
/// handlers (`/camera/mjpeg`) stream indefinitely.
#[async_trait]
pub trait HttpHandler: Send + Sync {
    async fn handle(&self, request: Request<Body>) -> Response<Body>;

    /// Minimum group required to invoke this handler. Defaults to
    /// `Anyone`, i.e. unauthenticated.
    fn minimum_group(&self) -> UserGroup {
        UserGroup::Anyone
    }
}

struct Entry {
    path: String,
    handler: Arc<dyn HttpHandler>,
    can_handle_subtree: bool,
}

/// Normalize a request or registration path: ensure a leading `/`, strip a
/// trailing `/` unless the path is exactly the root.
pub fn normalize_uri(path: &str) -> String {
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

fn is_prefix_match(entry_path: &str, request_path: &str) -> bool {
    if entry_path == "/" {
        return true;
    }
    request_path == entry_path || request_path.starts_with(&format!("{entry_path}/"))
}

/// Ordered registry of URI handlers.
#[derive(Default)]
pub struct HandlerTable {
    entries: RwLock<Vec<Entry>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        HandlerTable {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a leaf `handler` at `path`: it answers only that exact
    /// path, never a subtree of it. Registration order is significant for
    /// prefix matching among subtree handlers registered with
    /// [`Self::register_subtree`].
    pub fn register(&self, path: &str, handler: Arc<dyn HttpHandler>) {
        self.register_entry(path, handler, false);
    }

    /// Register `handler` at `path`, additionally claiming every path
    /// beneath it that no more specific entry claims. Earlier subtree
    /// registrations win over later ones covering the same prefix.
    pub fn register_subtree(&self, path: &str, handler: Arc<dyn HttpHandler>) {
        self.register_entry(path, handler, true);
    }

    fn register_entry(&self, path: &str, handler: Arc<dyn HttpHandler>, can_handle_subtree: bool) {
        let path = normalize_uri(path);
        self.entries.write().unwrap().push(Entry {
            path,
            handler,
            can_handle_subtree,
        });
    }

    /// Find the handler for `request_path`, preferring an exact match over
    /// the first registration-order prefix match among handlers flagged
    /// `can_handle_subtree`.
    pub fn find(&self, request_path: &str) -> Option<Arc<dyn HttpHandler>> {
        let request_path = normalize_uri(request_path);
        let entries = self.entries.read().unwrap();
        if let Some(entry) = entries.iter().find(|e| e.path == request_path) {
            return Some(entry.handler.clone());
        }
        entries
            .iter()
            .find(|e| e.can_handle_subtree && is_prefix_match(&e.path, &request_path))
            .map(|e| e.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    struct TaggedHandler(&'static str);

    #[async_trait]
    impl HttpHandler for TaggedHandler {
        async fn handle(&self, _request: Request<Body>) -> Response<Body> {
            Response::builder()
                .status(StatusCode::OK)
                .header("x-tag", self.0)
                .body(Body::empty())
                .unwrap()
        }
    }

    fn tagged(tag: &'static str) -> Arc<dyn HttpHandler> {
        Arc::new(TaggedHandler(tag))
    }

    #[test]
    fn normalize_strips_trailing_slash_but_keeps_root() {
        assert_eq!(normalize_uri("/camera/jpeg/"), "/camera/jpeg");
        assert_eq!(normalize_uri("camera/jpeg"), "/camera/jpeg");
        assert_eq!(normalize_uri("/"), "/");
        assert_eq!(normalize_uri(""), "/");
    }

    #[test]
    fn exact_match_wins_over_prefix() {
        let table = HandlerTable::new();
        table.register_subtree("/camera", tagged("subtree"));
        table.register("/camera/jpeg", tagged("exact"));

        let resp_rt = tokio::runtime::Runtime::new().unwrap();
        let found = table.find("/camera/jpeg").unwrap();
        let response = resp_rt.block_on(found.handle(Request::new(Body::empty())));
        assert_eq!(response.headers().get("x-tag").unwrap(), "exact");
    }

    #[test]
    fn first_registered_prefix_wins_among_subtree_handlers() {
        let table = HandlerTable::new();
        table.register_subtree("/camera", tagged("first"));
        table.register_subtree("/camera", tagged("second"));

        let rt = tokio::runtime::Runtime::new().unwrap();
        let found = table.find("/camera/anything").unwrap();
        let response = rt.block_on(found.handle(Request::new(Body::empty())));
        assert_eq!(response.headers().get("x-tag").unwrap(), "first");
    }

    #[test]
    fn root_handler_matches_everything_not_otherwise_claimed() {
        let table = HandlerTable::new();
        table.register_subtree("/", tagged("root"));
        table.register("/camera/jpeg", tagged("snapshot"));

        let rt = tokio::runtime::Runtime::new().unwrap();
        let snap = table.find("/camera/jpeg").unwrap();
        assert_eq!(
            rt.block_on(snap.handle(Request::new(Body::empty())))
                .headers()
                .get("x-tag")
                .unwrap(),
            "snapshot"
        );
        let other = table.find("/index.html").unwrap();
        assert_eq!(
            rt.block_on(other.handle(Request::new(Body::empty())))
                .headers()
                .get("x-tag")
                .unwrap(),
            "root"
        );
    }

    #[test]
    fn no_handler_registered_returns_none() {
        let table = HandlerTable::new();
        assert!(table.find("/nope").is_none());
    }

    #[test]
    fn leaf_handler_does_not_claim_its_own_subtree() {
        let table = HandlerTable::new();
        table.register("/camera/jpeg", tagged("snapshot"));
        assert!(table.find("/camera/jpeg/extra").is_none());
    }
}
