//! The embedded HTTP server loop. A single axum `fallback` handler
//! implements the full per-request algorithm: normalize the URI, look the
//! handler up in the [`HandlerTable`], enforce its minimum group against
//! the `Authorization` header, and dispatch. Built on axum's `Router`
//! and graceful-shutdown support, generalized from a single video route
//! to the full dispatch table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http::auth::{check_basic, check_digest, challenge_header, AuthScheme, UserGroup, UserStore};
use crate::http::handler_table::HandlerTable;

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind_addr: SocketAddr,
    pub domain: String,
    pub auth_scheme: AuthScheme,
}

/// One embedded HTTP listener. Holds no capture or
/// property state of its own — those live behind the handlers registered
/// in its [`HandlerTable`].
pub struct HttpServer {
    config: HttpServerConfig,
    handlers: Arc<HandlerTable>,
    users: Arc<UserStore>,
    shutdown: CancellationToken,
}

impl HttpServer {
    /// `shutdown` is shared with the rest of the process: cancelling it
    /// (from anywhere) lets this server's `axum::serve` finish in-flight
    /// requests and return, rather than needing a separate call per
    /// server instance.
    pub fn new(
        config: HttpServerConfig,
        handlers: Arc<HandlerTable>,
        users: Arc<UserStore>,
        shutdown: CancellationToken,
    ) -> Self {
        HttpServer {
            config,
            handlers,
            users,
            shutdown,
        }
    }

    /// Bind and serve until the shared shutdown token is cancelled.
    /// Configuration is captured at construction time; mutations made
    /// while serving are no-ops for this running instance.
    pub async fn serve(&self) -> std::io::Result<()> {
        let handlers = self.handlers.clone();
        let users = self.users.clone();
        let config = self.config.clone();

        let app = Router::new().fallback(move |request: Request<Body>| {
            let handlers = handlers.clone();
            let users = users.clone();
            let config = config.clone();
            async move { dispatch(handlers, users, config, request).await }
        });

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!("http server listening on {}", self.config.bind_addr);
        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("http server on {} stopped", self.config.bind_addr);
        Ok(())
    }
}

fn unauthorized(config: &HttpServerConfig) -> Response<Body> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("WWW-Authenticate", challenge_header(config.auth_scheme, &config.domain))
        .body(Body::from("401 Unauthorized\n"))
        .unwrap()
}

fn not_found() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("404 Not Found\n"))
        .unwrap()
}

/// Extract the authenticated group from the `Authorization` header, if
/// any, trying the scheme the server was configured with.
fn authenticate(
    headers: &HeaderMap,
    method: &str,
    path: &str,
    query: Option<&str>,
    config: &HttpServerConfig,
    users: &UserStore,
) -> Option<UserGroup> {
    let raw = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    match config.auth_scheme {
        AuthScheme::Basic => {
            let credentials = raw.strip_prefix("Basic ")?;
            check_basic(credentials, &config.domain, users)
        }
        AuthScheme::Digest => {
            let params = raw.strip_prefix("Digest ")?;
            check_digest(params, method, path, query, users)
        }
    }
}

async fn dispatch(
    handlers: Arc<HandlerTable>,
    users: Arc<UserStore>,
    config: HttpServerConfig,
    request: Request<Body>,
) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(|q| q.to_string());

    let Some(handler) = handlers.find(&path) else {
        return not_found();
    };

    let minimum_group = handler.minimum_group();
    if minimum_group > UserGroup::Anyone {
        let granted = authenticate(
            request.headers(),
            &method,
            &path,
            query.as_deref(),
            &config,
            &users,
        );
        match granted {
            Some(group) if group >= minimum_group => {}
            Some(_) => {
                warn!("authenticated user lacks group for {path}");
                return unauthorized(&config);
            }
            None => return unauthorized(&config),
        }
    }

    handler.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler_table::HttpHandler;
    use async_trait::async_trait;

    struct Echo(UserGroup);

    #[async_trait]
    impl HttpHandler for Echo {
        async fn handle(&self, _request: Request<Body>) -> Response<Body> {
            Response::new(Body::from("ok"))
        }
        fn minimum_group(&self) -> UserGroup {
            self.0
        }
    }

    #[tokio::test]
    async fn anonymous_handler_requires_no_authorization_header() {
        let handlers = Arc::new(HandlerTable::new());
        handlers.register("/open", Arc::new(Echo(UserGroup::Anyone)));
        let users = Arc::new(UserStore::new());
        let config = HttpServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            domain: "cam2web".into(),
            auth_scheme: AuthScheme::Basic,
        };
        let response = dispatch(handlers, users, config, Request::builder().uri("/open").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_handler_without_credentials_is_challenged() {
        let handlers = Arc::new(HandlerTable::new());
        handlers.register("/admin", Arc::new(Echo(UserGroup::Admin)));
        let users = Arc::new(UserStore::new());
        let config = HttpServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            domain: "cam2web".into(),
            auth_scheme: AuthScheme::Basic,
        };
        let response = dispatch(handlers, users, config, Request::builder().uri("/admin").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("WWW-Authenticate"));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let handlers = Arc::new(HandlerTable::new());
        let users = Arc::new(UserStore::new());
        let config = HttpServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            domain: "cam2web".into(),
            auth_scheme: AuthScheme::Basic,
        };
        let response = dispatch(handlers, users, config, Request::builder().uri("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
