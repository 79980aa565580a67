//! Capability-based traits for a video capture backend and its listener.
//! Concrete camera backends beyond V4L2 (Raspberry Pi MMAL, DirectShow) are
//! out of scope; this module only names the interface they implement, plus
//! the one backend this crate ships to make the binary runnable: a
//! GStreamer-based backend behind the `camera` feature, and an
//! always-available mock (`capture::mock`).

use std::sync::Arc;

use crate::core::error::CamError;
use crate::core::image::Image;

/// Receives frames and errors from a [`VideoSource`]. Implementations must not retain the image reference past
/// `on_new_image` returning.
pub trait VideoSourceListener: Send + Sync {
    fn on_new_image(&self, image: &Image<'_>);
    fn on_error(&self, message: &str, fatal: bool);
}

/// A camera backend. `start`/`signal_to_stop`/`wait_for_stop` map
/// directly onto the external interface; `set_listener` atomically swaps
/// the registered listener and returns whichever one was previously set.
pub trait VideoSource: Send + Sync {
    fn start(&self) -> Result<(), CamError>;
    fn signal_to_stop(&self);
    fn wait_for_stop(&self);
    fn is_running(&self) -> bool;
    fn frames_received(&self) -> u32;
    fn set_listener(
        &self,
        listener: Option<Arc<dyn VideoSourceListener>>,
    ) -> Option<Arc<dyn VideoSourceListener>>;
}

/// `{ width, height, bits_per_pixel, avg_fps, min_fps, max_fps }`,
/// describing one supported mode of a multi-mode camera. Equality compares
/// only `width`, `height`, `bits_per_pixel`, and `max_fps`.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub avg_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
}

impl PartialEq for Capabilities {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.bits_per_pixel == other.bits_per_pixel
            && self.max_fps == other.max_fps
    }
}
