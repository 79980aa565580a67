//! Auto-start supervisor:
//! restarts the capture engine if it ever stops running on its own, and
//! periodically persists camera property state to the `-fcfg:<path>`
//! file so it survives a restart.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::capture::properties::CameraProperties;
use crate::capture::CaptureEngine;
use crate::core::persist;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const PERSIST_INTERVAL_TICKS: u32 = 12; // persist roughly every minute

/// Runs until `shutdown` is cancelled. Intended to be spawned as its own
/// task alongside the HTTP servers.
pub async fn run(
    engine: Arc<CaptureEngine>,
    properties: Arc<CameraProperties>,
    persist_path: Option<PathBuf>,
    shutdown: CancellationToken,
) {
    let mut ticks: u32 = 0;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        if !engine.is_running() {
            warn!("capture engine is not running, attempting restart");
            if let Err(e) = engine.start() {
                warn!("supervisor restart failed: {e}");
            } else {
                info!("supervisor restarted the capture engine");
            }
        }

        ticks += 1;
        if ticks >= PERSIST_INTERVAL_TICKS {
            ticks = 0;
            if let Some(path) = &persist_path {
                if let Err(e) = persist::save(properties.as_ref(), path) {
                    warn!("failed to persist camera properties to {}: {e}", path.display());
                }
            }
        }
    }
    info!("supervisor stopped");
}
