//! A synthetic backend used when no `camera` feature backend is compiled
//! in, or under test. Generates plausible-looking `rgb24` frames on a
//! fixed-interval background thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use crate::capture::backend::{VideoSource, VideoSourceListener};
use crate::core::error::CamError;
use crate::core::event::ManualResetEvent;
use crate::core::image::{Image, PixelFormat};

pub struct MockSource {
    width: u32,
    height: u32,
    fps: u32,
    running: Arc<AtomicBool>,
    frames_received: Arc<AtomicU32>,
    stop_event: ManualResetEvent,
    listener: Mutex<Option<Arc<dyn VideoSourceListener>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MockSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        MockSource {
            width,
            height,
            fps: fps.max(1),
            running: Arc::new(AtomicBool::new(false)),
            frames_received: Arc::new(AtomicU32::new(0)),
            stop_event: ManualResetEvent::new(),
            listener: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    fn synthesize_frame(width: u32, height: u32, tick: u32) -> Image<'static> {
        let mut image = Image::allocate(width, height, PixelFormat::Rgb24, false).unwrap();
        let stride = image.stride();
        if let Some(bytes) = image.data_mut() {
            for y in 0..height {
                let row = (y * stride) as usize;
                for x in 0..width {
                    let px = row + (x * 3) as usize;
                    if px + 2 >= bytes.len() {
                        break;
                    }
                    bytes[px] = ((x + tick) % 256) as u8;
                    bytes[px + 1] = ((y + tick) % 256) as u8;
                    bytes[px + 2] = ((x + y + tick) % 256) as u8;
                }
            }
        }
        image
    }
}

impl VideoSource for MockSource {
    fn start(&self) -> Result<(), CamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_event.reset();

        let width = self.width;
        let height = self.height;
        let period = Duration::from_millis(1000 / self.fps as u64);
        let running = self.running.clone();
        let frames_received = self.frames_received.clone();
        let stop_event = self.stop_event.clone();
        let listener = self.listener.lock().unwrap().clone();

        let join = std::thread::Builder::new()
            .name("camweb-mock-capture".into())
            .spawn(move || {
                info!("mock capture thread started ({width}x{height}@{}fps)", 1000 / period.as_millis().max(1));
                let mut tick: u32 = 0;
                while !stop_event.wait_timeout(period) {
                    let frame = Self::synthesize_frame(width, height, tick);
                    tick = tick.wrapping_add(1);
                    frames_received.fetch_add(1, Ordering::Relaxed);
                    if let Some(l) = &listener {
                        l.on_new_image(&frame);
                    }
                }
                running.store(false, Ordering::SeqCst);
                info!("mock capture thread stopped");
            })
            .expect("spawning the mock capture thread should not fail");

        *self.handle.lock().unwrap() = Some(join);
        Ok(())
    }

    fn signal_to_stop(&self) {
        self.stop_event.signal();
    }

    fn wait_for_stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            if handle.join().is_err() {
                warn!("mock capture thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn frames_received(&self) -> u32 {
        self.frames_received.load(Ordering::Relaxed)
    }

    fn set_listener(
        &self,
        listener: Option<Arc<dyn VideoSourceListener>>,
    ) -> Option<Arc<dyn VideoSourceListener>> {
        let mut guard = self.listener.lock().unwrap();
        std::mem::replace(&mut *guard, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingListener(Arc<AtomicUsize>);

    impl VideoSourceListener for CountingListener {
        fn on_new_image(&self, _image: &Image<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn on_error(&self, _message: &str, _fatal: bool) {}
    }

    #[test]
    fn start_is_idempotent_and_produces_frames() {
        let source = MockSource::new(8, 8, 30);
        let counter = Arc::new(AtomicUsize::new(0));
        source.set_listener(Some(Arc::new(CountingListener(counter.clone()))));
        source.start().unwrap();
        source.start().unwrap();
        std::thread::sleep(Duration::from_millis(120));
        source.signal_to_stop();
        source.wait_for_stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!source.is_running());
    }
}
