//! Foundational, dependency-light primitives shared by the capture engine,
//! the HTTP server, and the property-over-HTTP handlers: the tagged error
//! value, the typed image buffer, the JPEG encoder wrapper, the manual-reset
//! event, the property-surface trait, the flat JSON reader/writer, and the
//! config persister.

pub mod error;
pub mod event;
pub mod image;
pub mod jpeg;
pub mod json;
pub mod persist;
pub mod property;

pub use error::CamError;
pub use event::ManualResetEvent;
pub use image::{Image, PixelFormat};
pub use jpeg::JpegEncoder;
pub use property::{PropertyError, PropertySurface};
