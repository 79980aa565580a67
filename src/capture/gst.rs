//! GStreamer-backed camera backend (Linux, `camera` feature). Builds a
//! `v4l2src ! image/jpeg ! appsink` pipeline and forwards each delivered
//! JPEG sample as an [`Image`] to the listener chain.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use tracing::{error, info, warn};

use crate::capture::backend::{VideoSource, VideoSourceListener};
use crate::core::error::CamError;
use crate::core::event::ManualResetEvent;
use crate::core::image::{Image, PixelFormat};

pub struct GstreamerSource {
    device: String,
    width: u32,
    height: u32,
    fps: u32,
    running: Arc<AtomicBool>,
    frames_received: Arc<AtomicU32>,
    stop_event: ManualResetEvent,
    listener: Mutex<Option<Arc<dyn VideoSourceListener>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl GstreamerSource {
    pub fn new(device: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        GstreamerSource {
            device: device.into(),
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

    fn pipeline_description(&self) -> String {
        format!(
            "v4l2src device={} ! image/jpeg,width={},height={},framerate={}/1 ! queue ! appsink name=sink",
            self.device, self.width, self.height, self.fps
        )
    }
}

impl VideoSource for GstreamerSource {
    fn start(&self) -> Result<(), CamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.stop_event.reset();
        gstreamer::init().map_err(|_| CamError::DeviceNotReady)?;

        let description = self.pipeline_description();
        let running = self.running.clone();
        let frames_received = self.frames_received.clone();
        let stop_event = self.stop_event.clone();
        let listener = self.listener.lock().unwrap().clone();

        let join = std::thread::Builder::new()
            .name("camweb-gst-capture".into())
            .spawn(move || {
                let pipeline = match gstreamer::parse::launch(&description) {
                    Ok(p) => p,
                    Err(e) => {
                        error!("failed to build gstreamer pipeline: {e}");
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };
                let pipeline = pipeline
                    .downcast::<gstreamer::Pipeline>()
                    .expect("parse::launch returns a Pipeline for a plain bin description");

                let sink = pipeline
                    .by_name("sink")
                    .and_then(|e| e.downcast::<AppSink>().ok());
                let Some(sink) = sink else {
                    error!("gstreamer pipeline has no appsink named 'sink'");
                    running.store(false, Ordering::SeqCst);
                    return;
                };

                let (tx, rx) = std::sync::mpsc::sync_channel::<Vec<u8>>(4);
                sink.set_callbacks(
                    gstreamer_app::AppSinkCallbacks::builder()
                        .new_sample(move |appsink| {
                            let sample = appsink
                                .pull_sample()
                                .map_err(|_| gstreamer::FlowError::Eos)?;
                            let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                            let map = buffer
                                .map_readable()
                                .map_err(|_| gstreamer::FlowError::Error)?;
                            let _ = tx.try_send(map.as_slice().to_vec());
                            Ok(gstreamer::FlowSuccess::Ok)
                        })
                        .build(),
                );

                if pipeline
                    .set_state(gstreamer::State::Playing)
                    .is_err()
                {
                    error!("failed to start gstreamer pipeline");
                    running.store(false, Ordering::SeqCst);
                    return;
                }
                info!("gstreamer capture pipeline playing: {description}");

                loop {
                    if stop_event.wait_timeout(Duration::from_millis(200)) {
                        break;
                    }
                    match rx.recv_timeout(Duration::from_millis(500)) {
                        Ok(bytes) => {
                            let len = bytes.len() as u32;
                            if let Ok(image) =
                                Image::from_owned(bytes, len, 1, len, PixelFormat::Jpeg)
                            {
                                frames_received.fetch_add(1, Ordering::Relaxed);
                                if let Some(l) = &listener {
                                    l.on_new_image(&image);
                                }
                            }
                        }
                        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                            if let Some(l) = &listener {
                                l.on_error("no frame received within watchdog window", false);
                            }
                        }
                        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }

                let _ = pipeline.set_state(gstreamer::State::Null);
                running.store(false, Ordering::SeqCst);
                info!("gstreamer capture pipeline stopped");
            })
            .expect("spawning the gstreamer capture thread should not fail");

        *self.handle.lock().unwrap() = Some(join);
        Ok(())
    }

    fn signal_to_stop(&self) {
        self.stop_event.signal();
    }

    fn wait_for_stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            if handle.join().is_err() {
                warn!("gstreamer capture thread panicked");
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
