//! The capture engine: wires a [`VideoSource`] backend to the
//! latest-frame slot, the optional frame decorator, an external listener
//! (itself possibly a [`ListenerChain`] fanning out to several sinks), and
//! the JPEG encoder used by `encode_latest`.

use std::sync::{Arc, RwLock};

use parking_lot::Mutex as SyncMutex;

use crate::capture::backend::{VideoSource, VideoSourceListener};
use crate::capture::decorator::FrameDecorator;
use crate::capture::slot::LatestFrameSlot;
use crate::core::error::CamError;
use crate::core::image::PixelFormat;
use crate::core::jpeg::JpegEncoder;

pub struct CaptureEngine {
    backend: Arc<dyn VideoSource>,
    slot: Arc<LatestFrameSlot>,
    decorator: Option<Arc<FrameDecorator>>,
    external_listener: RwLock<Option<Arc<dyn VideoSourceListener>>>,
    encoder: SyncMutex<JpegEncoder>,
}

impl CaptureEngine {
    /// Build the engine and wire it as the backend's listener. Returned
    /// wrapped in an `Arc` because the engine must hand a non-owning
    /// `Arc<dyn VideoSourceListener>` reference to the backend while still
    /// being addressable by HTTP handlers.
    pub fn new(
        backend: Arc<dyn VideoSource>,
        decorator: Option<Arc<FrameDecorator>>,
        jpeg_quality: u8,
        jpeg_faster: bool,
    ) -> Result<Arc<Self>, CamError> {
        let engine = Arc::new(CaptureEngine {
            backend: backend.clone(),
            slot: Arc::new(LatestFrameSlot::new()),
            decorator,
            external_listener: RwLock::new(None),
            encoder: SyncMutex::new(JpegEncoder::new(jpeg_quality, jpeg_faster)?),
        });
        let listener: Arc<dyn VideoSourceListener> = engine.clone();
        backend.set_listener(Some(listener));
        Ok(engine)
    }

    pub fn slot(&self) -> &Arc<LatestFrameSlot> {
        &self.slot
    }

    /// Idempotent; failures surface only through `is_running`/`last_error`
    /// and subsequent requests, never as an error here.
    pub fn start(&self) -> Result<(), CamError> {
        self.backend.start()
    }

    pub fn signal_to_stop(&self) {
        self.backend.signal_to_stop();
    }

    pub fn wait_for_stop(&self) {
        self.backend.wait_for_stop();
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    pub fn frames_received(&self) -> u32 {
        self.slot.frames_received()
    }

    pub fn last_error(&self) -> Option<String> {
        self.slot.last_error()
    }

    pub fn has_frame(&self) -> bool {
        self.slot.has_frame()
    }

    /// Atomically replace the engine's external listener (distinct from
    /// the decorator, which always runs first); returns the previous one.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn VideoSourceListener>>,
    ) -> Option<Arc<dyn VideoSourceListener>> {
        let mut guard = self.external_listener.write().unwrap();
        std::mem::replace(&mut *guard, listener)
    }

    pub fn set_jpeg_quality(&self, quality: u8) -> Result<(), CamError> {
        self.encoder.lock().set_quality(quality)
    }

    pub fn set_jpeg_faster(&self, faster: bool) {
        self.encoder.lock().set_faster_compression(faster);
    }

    /// If the slot has a fresh frame, encode it into the shared JPEG
    /// buffer and clear the flag; otherwise leave the existing buffer
    /// alone. Safe to call concurrently from multiple HTTP
    /// handlers — concurrent calls serialize on the JPEG buffer's mutex.
    pub fn encode_latest(&self) -> Result<(), CamError> {
        if !self.slot.take_new_image_flag() {
            return Ok(());
        }
        let image = self.slot.clone_latest_image().ok_or(CamError::DeviceNotReady)?;

        if image.format() == PixelFormat::Jpeg {
            self.slot.with_jpeg_buffer(|buf| {
                buf.clear();
                buf.extend_from_slice(image.data());
            });
            Ok(())
        } else {
            let encoder_quality_snapshot = self.encoder.lock();
            self.slot
                .with_jpeg_buffer(|buf| encoder_quality_snapshot.encode_into(&image, buf))
        }
    }

    pub fn jpeg_snapshot(&self) -> Vec<u8> {
        self.slot.jpeg_snapshot()
    }

    pub fn jpeg_len(&self) -> usize {
        self.slot.jpeg_len()
    }
}

impl VideoSourceListener for CaptureEngine {
    fn on_new_image(&self, image: &crate::core::image::Image<'_>) {
        let mut owned = image.clone_owned();
        if let Some(decorator) = &self.decorator {
            decorator.decorate(&mut owned);
        }
        self.slot.ingest(&owned);
        if let Some(listener) = self.external_listener.read().unwrap().as_ref() {
            listener.on_new_image(&owned);
        }
    }

    fn on_error(&self, message: &str, fatal: bool) {
        self.slot.report_error(message);
        if let Some(listener) = self.external_listener.read().unwrap().as_ref() {
            listener.on_error(message, fatal);
        }
    }
}
