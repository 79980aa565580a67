//! The embedded HTTP server: URI-based dispatch, per-handler access
//! control, Basic/Digest authentication, and the handlers layered on top.

pub mod auth;
pub mod handler_table;
pub mod mjpeg;
pub mod property_handlers;
pub mod server;
pub mod snapshot;
pub mod static_files;
pub mod version;

pub use auth::{AuthScheme, UserGroup, UserStore};
pub use handler_table::{HandlerTable, HttpHandler};
pub use server::{HttpServer, HttpServerConfig};
