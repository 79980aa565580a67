//! The latest-frame slot and encoded-JPEG buffer. A single mutable
//! cell mutated by the capture thread (producer) and the encode step
//! triggered from an HTTP handler (consumer), guarded by one mutex for the
//! image cell and a separate mutex for the encoded-JPEG cell so that a
//! slow encode never blocks a fresh frame from landing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::core::image::Image;

const INITIAL_JPEG_CAPACITY: usize = 1 << 20;

pub struct LatestFrameSlot {
    image: Mutex<Option<Image<'static>>>,
    jpeg: Mutex<Vec<u8>>,
    new_image_available: AtomicBool,
    last_error: Mutex<Option<String>>,
    // Not fenced: a free-running counter callers read without
    // synchronizing against image/jpeg access.
    frames_received: AtomicU32,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        LatestFrameSlot {
            image: Mutex::new(None),
            jpeg: Mutex::new(Vec::with_capacity(INITIAL_JPEG_CAPACITY)),
            new_image_available: AtomicBool::new(false),
            last_error: Mutex::new(None),
            frames_received: AtomicU32::new(0),
        }
    }

    /// Ingest a frame delivered by the backend via `copy_or_clone`:
    /// reuse the held buffer's allocation when the shape matches, otherwise
    /// replace it. Clears the last-reported error and marks a new image available.
    pub fn ingest(&self, frame: &Image<'_>) {
        {
            let mut held = self.image.lock().unwrap();
            match held.as_mut() {
                Some(existing) => frame.copy_or_clone(existing),
                None => *held = Some(frame.clone_owned()),
            }
        }
        self.new_image_available.store(true, Ordering::SeqCst);
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap() = None;
    }

    pub fn report_error(&self, message: impl Into<String>) {
        *self.last_error.lock().unwrap() = Some(message.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn frames_received(&self) -> u32 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn has_frame(&self) -> bool {
        self.image.lock().unwrap().is_some()
    }

    /// Atomically read and clear the "new image available" flag, as
    /// `encode_latest` requires.
    pub fn take_new_image_flag(&self) -> bool {
        self.new_image_available.swap(false, Ordering::SeqCst)
    }

    /// An owned clone of the currently held frame, if any.
    pub fn clone_latest_image(&self) -> Option<Image<'static>> {
        self.image.lock().unwrap().as_ref().map(|img| img.clone_owned())
    }

    /// Run `f` with exclusive access to the encoded-JPEG cell.
    pub fn with_jpeg_buffer<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        let mut guard = self.jpeg.lock().unwrap();
        f(&mut guard)
    }

    /// A cheap clone of the currently encoded JPEG bytes, used when handing
    /// data off to an async HTTP response body (holding the std `Mutex`
    /// across an `.await` would be incorrect, so callers copy out).
    pub fn jpeg_snapshot(&self) -> Vec<u8> {
        self.jpeg.lock().unwrap().clone()
    }

    pub fn jpeg_len(&self) -> usize {
        self.jpeg.lock().unwrap().len()
    }
}

impl Default for LatestFrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
