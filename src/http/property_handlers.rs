//! The `Information` (read-only) and `Configurator` (read/write) JSON
//! property surfaces. GET responses are wrapped as `{"status":"OK","config":
//! {...}}` and JSON-escape plain string values but embed values that already
//! look like a JSON object verbatim; an optional `vars` query parameter
//! restricts the dump to a comma-separated subset of names. POST applies
//! each submitted property in order and stops at the first one that fails
//! to set ("first offender", not last-write-wins), reporting the offending
//! property and an error kind drawn from a fixed set of strings.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};

use crate::core::error::CamError;
use crate::core::json::{escape, looks_like_object, parse_flat_object};
use crate::core::property::PropertySurface;
use crate::http::auth::UserGroup;
use crate::http::handler_table::HttpHandler;

/// Parse a comma-separated `vars=a,b,c` query parameter, if present.
fn requested_vars(request: &Request<Body>) -> Option<Vec<String>> {
    let query = request.uri().query()?;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("vars=") {
            return Some(
                value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect(),
            );
        }
    }
    None
}

/// Serialize a property map as the body of the `config` object: plain
/// values are quoted and escaped as strings, values that are themselves
/// valid flat JSON objects are embedded raw.
fn serialize_config(entries: &[(String, String)]) -> String {
    let mut out = String::from("{");
    for (i, (k, v)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&escape(k));
        out.push_str("\":");
        if looks_like_object(v) {
            out.push_str(v.trim());
        } else {
            out.push('"');
            out.push_str(&escape(v));
            out.push('"');
        }
    }
    out.push('}');
    out
}

/// Build the `{"status":"OK","config":{...}}` envelope for a GET response,
/// optionally restricted to `vars`.
fn config_envelope(surface: &dyn PropertySurface, vars: Option<&[String]>) -> String {
    let map = surface.enumerate_all();
    let entries: Vec<(String, String)> = match vars {
        Some(names) => names
            .iter()
            .filter_map(|name| map.get(name).map(|v| (name.clone(), v.clone())))
            .collect(),
        None => map.into_iter().collect(),
    };
    format!(r#"{{"status":"OK","config":{}}}"#, serialize_config(&entries))
}

fn json_response(body: String, status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Map a property-surface error to one of the error-kind strings the HTTP
/// envelope reports.
fn error_kind(error: CamError) -> &'static str {
    match error {
        CamError::UnknownProperty => "Unknown property",
        CamError::InvalidPropertyValue => "Invalid property value",
        _ => "Failed setting property",
    }
}

fn property_error_response(name: &str, error: CamError) -> Response<Body> {
    json_response(
        format!(r#"{{"status":"{}","property":"{}"}}"#, error_kind(error), escape(name)),
        StatusCode::BAD_REQUEST,
    )
}

/// Read-only `GET` surface.
pub struct InformationHandler {
    surface: Arc<dyn PropertySurface + Send + Sync>,
    minimum_group: UserGroup,
}

impl InformationHandler {
    pub fn new(surface: Arc<dyn PropertySurface + Send + Sync>, minimum_group: UserGroup) -> Self {
        InformationHandler { surface, minimum_group }
    }
}

#[async_trait]
impl HttpHandler for InformationHandler {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let vars = requested_vars(&request);
        json_response(config_envelope(self.surface.as_ref(), vars.as_deref()), StatusCode::OK)
    }

    fn minimum_group(&self) -> UserGroup {
        self.minimum_group
    }
}

/// Read-only `GET` surface over the `:min`/`:max`/`:default` subproperties
/// a [`PropertySurface`] carries alongside its writable base properties.
pub struct PropertyMetadataHandler {
    surface: Arc<dyn PropertySurface + Send + Sync>,
    minimum_group: UserGroup,
}

impl PropertyMetadataHandler {
    pub fn new(surface: Arc<dyn PropertySurface + Send + Sync>, minimum_group: UserGroup) -> Self {
        PropertyMetadataHandler { surface, minimum_group }
    }
}

#[async_trait]
impl HttpHandler for PropertyMetadataHandler {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let vars = requested_vars(&request);
        let map: BTreeMap<String, String> = self
            .surface
            .enumerate_all()
            .into_iter()
            .filter(|(name, _)| crate::core::property::is_subproperty(name))
            .collect();
        let entries: Vec<(String, String)> = match vars.as_deref() {
            Some(names) => names
                .iter()
                .filter_map(|name| map.get(name).map(|v| (name.clone(), v.clone())))
                .collect(),
            None => map.into_iter().collect(),
        };
        json_response(
            format!(r#"{{"status":"OK","config":{}}}"#, serialize_config(&entries)),
            StatusCode::OK,
        )
    }

    fn minimum_group(&self) -> UserGroup {
        self.minimum_group
    }
}

/// Read/write surface: `GET` dumps the current
/// state, `POST` accepts a flat JSON object of property updates.
pub struct ConfiguratorHandler {
    surface: Arc<dyn PropertySurface + Send + Sync>,
    minimum_group: UserGroup,
}

impl ConfiguratorHandler {
    pub fn new(surface: Arc<dyn PropertySurface + Send + Sync>, minimum_group: UserGroup) -> Self {
        ConfiguratorHandler { surface, minimum_group }
    }

    async fn handle_get(&self, request: Request<Body>) -> Response<Body> {
        let vars = requested_vars(&request);
        json_response(config_envelope(self.surface.as_ref(), vars.as_deref()), StatusCode::OK)
    }

    async fn handle_post(&self, request: Request<Body>) -> Response<Body> {
        let body = match axum::body::to_bytes(request.into_body(), 1 << 20).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return json_response(
                    r#"{"status":"Invalid JSON object","property":""}"#.into(),
                    StatusCode::BAD_REQUEST,
                )
            }
        };
        let text = match std::str::from_utf8(&body) {
            Ok(t) => t,
            Err(_) => {
                return json_response(
                    r#"{"status":"Invalid JSON object","property":""}"#.into(),
                    StatusCode::BAD_REQUEST,
                )
            }
        };
        let entries = match parse_flat_object(text) {
            Ok(entries) => entries,
            Err(_) => {
                return json_response(
                    r#"{"status":"Invalid JSON object","property":""}"#.into(),
                    StatusCode::BAD_REQUEST,
                )
            }
        };

        for (name, value) in &entries {
            if let Err(e) = self.surface.set(name, value) {
                return property_error_response(name, e);
            }
        }

        json_response(r#"{"status":"OK"}"#.into(), StatusCode::OK)
    }
}

#[async_trait]
impl HttpHandler for ConfiguratorHandler {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        match *request.method() {
            axum::http::Method::GET => self.handle_get(request).await,
            axum::http::Method::POST => self.handle_post(request).await,
            _ => Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, "GET, POST")
                .body(Body::from("405 Method Not Allowed\n"))
                .unwrap(),
        }
    }

    fn minimum_group(&self) -> UserGroup {
        self.minimum_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::properties::CameraProperties;

    #[tokio::test]
    async fn get_dumps_all_properties_wrapped_in_status_envelope() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props, UserGroup::Anyone);
        let response = handler.handle(Request::builder().uri("/camera/config").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with(r#"{"status":"OK","config":{"#));
        assert!(text.contains(r#""brightness":"50""#));
    }

    #[tokio::test]
    async fn get_with_vars_filters_to_the_requested_subset() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props, UserGroup::Anyone);
        let request = Request::builder()
            .uri("/camera/config?vars=brightness")
            .body(Body::empty())
            .unwrap();
        let response = handler.handle(request).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text, r#"{"status":"OK","config":{"brightness":"50"}}"#);
    }

    #[tokio::test]
    async fn post_applies_updates_in_order_and_returns_bare_ok() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props.clone(), UserGroup::Anyone);
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"brightness":"75"}"#))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"status":"OK"}"#);
        assert_eq!(props.get("brightness").unwrap(), "75");
    }

    #[tokio::test]
    async fn post_stops_at_first_offending_property_with_error_kind() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props.clone(), UserGroup::Anyone);
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"brightness":"9999","contrast":"10"}"#))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            body.as_ref(),
            br#"{"status":"Invalid property value","property":"brightness"}"#
        );
        // contrast was never applied because brightness failed first.
        assert_eq!(props.get("contrast").unwrap(), "50");
    }

    #[tokio::test]
    async fn post_reports_unknown_property() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props, UserGroup::Anyone);
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"nosuch":"1"}"#))
            .unwrap();
        let response = handler.handle(request).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"status":"Unknown property","property":"nosuch"}"#);
    }

    #[tokio::test]
    async fn post_rejects_malformed_json_body() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props, UserGroup::Anyone);
        let request = Request::builder()
            .method("POST")
            .body(Body::from("not json"))
            .unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"status":"Invalid JSON object","property":""}"#);
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected_with_allow_header() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = ConfiguratorHandler::new(props, UserGroup::Anyone);
        let request = Request::builder().method("DELETE").body(Body::empty()).unwrap();
        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET, POST");
    }

    #[tokio::test]
    async fn metadata_handler_exposes_only_subproperties() {
        let props: Arc<dyn PropertySurface + Send + Sync> = Arc::new(CameraProperties::new());
        let handler = PropertyMetadataHandler::new(props, UserGroup::Anyone);
        let response = handler.handle(Request::new(Body::empty())).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains(r#""brightness:min":"0""#));
        assert!(!text.contains(r#""brightness":"50""#));
    }
}
