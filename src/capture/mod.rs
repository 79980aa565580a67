//! The capture engine: owns a camera backend, runs its capture loop,
//! maintains the latest-frame slot, and produces JPEG bytes on demand.

pub mod backend;
pub mod decorator;
pub mod engine;
pub mod listener;
pub mod mock;
pub mod properties;
pub mod slot;

#[cfg(all(target_os = "linux", feature = "camera"))]
pub mod gst;

pub use backend::{Capabilities, VideoSource, VideoSourceListener};
pub use engine::CaptureEngine;
pub use slot::LatestFrameSlot;
