//! Video listener chain: fans a frame or error event out to
//! multiple sinks, sequentially and in order. Owned by the capture
//! engine; listeners are held as non-owning `Arc` references so the chain
//! never outlives the engine that drives it.

use std::sync::{Arc, RwLock};

use crate::capture::backend::VideoSourceListener;
use crate::core::image::Image;

#[derive(Default)]
pub struct ListenerChain {
    listeners: RwLock<Vec<Arc<dyn VideoSourceListener>>>,
}

impl ListenerChain {
    pub fn new() -> Self {
        ListenerChain {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn push(&self, listener: Arc<dyn VideoSourceListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    pub fn clear(&self) {
        self.listeners.write().unwrap().clear();
    }
}

impl VideoSourceListener for ListenerChain {
    fn on_new_image(&self, image: &Image<'_>) {
        for listener in self.listeners.read().unwrap().iter() {
            listener.on_new_image(image);
        }
    }

    fn on_error(&self, message: &str, fatal: bool) {
        for listener in self.listeners.read().unwrap().iter() {
            listener.on_error(message, fatal);
        }
    }
}
