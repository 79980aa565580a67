//! The application orchestrator: one [`Application`] value rooted in
//! `main`, wiring the capture engine, the main and admin HTTP servers,
//! the user store, camera-property persistence, and signal-driven
//! shutdown.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::admin::StatusHandler;
use crate::capture::backend::VideoSource;
use crate::capture::decorator::FrameDecorator;
use crate::capture::engine::CaptureEngine;
#[cfg(not(all(target_os = "linux", feature = "camera")))]
use crate::capture::mock::MockSource;
use crate::capture::properties::CameraProperties;
use crate::config::{resolution_for_index, CamwebConfig};
use crate::core::persist;
use crate::core::property::PropertySurface;
use crate::error::{AppError, Result};
use crate::http::auth::{AuthScheme, UserStore};
use crate::http::handler_table::HandlerTable;
use crate::http::mjpeg::MjpegHandler;
use crate::http::property_handlers::{ConfiguratorHandler, InformationHandler, PropertyMetadataHandler};
use crate::http::server::{HttpServer, HttpServerConfig};
use crate::http::snapshot::SnapshotHandler;
use crate::http::static_files::StaticFileHandler;
use crate::http::version::VersionHandler;

#[cfg(all(target_os = "linux", feature = "camera"))]
use crate::capture::gst::GstreamerSource;

/// Conventional on-disk location for the overlay font; absence simply
/// disables the overlay rather than failing startup.
const FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

pub struct Application {
    config: CamwebConfig,
    capture: Arc<CaptureEngine>,
    properties: Arc<CameraProperties>,
    main_server: HttpServer,
    admin_server: HttpServer,
    shutdown: CancellationToken,
}

fn build_backend(config: &CamwebConfig) -> Result<Arc<dyn VideoSource>> {
    let (width, height) = resolution_for_index(config.camera.size_index)
        .ok_or_else(|| AppError::system("camera size index out of range"))?;

    #[cfg(all(target_os = "linux", feature = "camera"))]
    {
        return Ok(Arc::new(GstreamerSource::new(
            config.camera.device.clone(),
            width,
            height,
            config.camera.fps,
        )));
    }

    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    {
        Ok(Arc::new(MockSource::new(width, height, config.camera.fps)))
    }
}

impl Application {
    pub async fn new(config: CamwebConfig) -> Result<Self> {
        let backend = build_backend(&config)?;

        // No bundled TrueType font ships with this crate; the overlay is
        // only active when a font file is actually available on disk.
        let decorator = FrameDecorator::from_path(FONT_PATH).map(|d| {
            d.set_camera_title(config.camera.title.clone());
            d.set_timestamp_overlay(true);
            d.set_title_overlay(config.camera.title.is_some());
            Arc::new(d)
        });

        let capture = CaptureEngine::new(
            backend,
            decorator,
            config.camera.jpeg_quality,
            true,
        )
        .map_err(AppError::from)?;

        let properties = Arc::new(CameraProperties::new());
        if let Some(path) = &config.files.camera_config_path {
            if path.exists() {
                match persist::load(properties.as_ref() as &dyn PropertySurface, path) {
                    Ok(count) => info!("loaded {count} persisted camera properties from {}", path.display()),
                    Err(e) => info!("could not load camera properties from {}: {e}", path.display()),
                }
            }
        }

        let users = Arc::new(UserStore::new());
        if let Some(path) = &config.auth.htpasswd_path {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    let loaded = users.load_from_file(&contents, &config.auth.realm);
                    info!("loaded {loaded} users from {}", path.display());
                }
                Err(e) => info!("could not read user file {}: {e}", path.display()),
            }
        }

        let main_handlers = Arc::new(HandlerTable::new());
        main_handlers.register("/camera/jpeg", Arc::new(SnapshotHandler::new(capture.clone())));
        main_handlers.register(
            "/camera/mjpeg",
            Arc::new(MjpegHandler::new(capture.clone(), config.camera.fps)),
        );
        main_handlers.register(
            "/camera/info",
            Arc::new(InformationHandler::new(properties.clone(), config.auth.viewer_group())),
        );
        main_handlers.register(
            "/camera/properties",
            Arc::new(PropertyMetadataHandler::new(properties.clone(), config.auth.viewer_group())),
        );
        main_handlers.register(
            "/camera/config",
            Arc::new(ConfiguratorHandler::new(properties.clone(), config.auth.config_group())),
        );
        main_handlers.register("/version", Arc::new(VersionHandler::new("camweb", env!("CARGO_PKG_VERSION"))));
        if let Some(web_root) = &config.http.web_root {
            main_handlers.register_subtree("/", Arc::new(StaticFileHandler::new(web_root.clone())));
        }

        let admin_handlers = Arc::new(HandlerTable::new());
        admin_handlers.register("/status", Arc::new(StatusHandler::new(capture.clone())));

        let shutdown = CancellationToken::new();

        let main_server = HttpServer::new(
            HttpServerConfig {
                bind_addr: ([0, 0, 0, 0], config.http.port).into(),
                domain: config.auth.realm.clone(),
                auth_scheme: AuthScheme::Digest,
            },
            main_handlers,
            users.clone(),
            shutdown.clone(),
        );
        let admin_server = HttpServer::new(
            HttpServerConfig {
                bind_addr: ([127, 0, 0, 1], config.http.admin_port).into(),
                domain: config.auth.realm.clone(),
                auth_scheme: AuthScheme::Digest,
            },
            admin_handlers,
            users,
            shutdown.clone(),
        );

        Ok(Application {
            config,
            capture,
            properties,
            main_server,
            admin_server,
            shutdown,
        })
    }

    /// Start capture and both HTTP servers, then block until a shutdown
    /// signal arrives. Handles SIGINT, SIGTERM, SIGHUP, SIGQUIT, and
    /// SIGABRT — `SignalKind::from_raw` is used for the last two
    /// since `tokio::signal::unix::SignalKind` has no named constant for
    /// them.
    pub async fn run(self) -> Result<i32> {
        self.capture.start().map_err(AppError::from)?;

        let supervisor_shutdown = self.shutdown.clone();
        let supervisor_handle = tokio::spawn(crate::supervisor::run(
            self.capture.clone(),
            self.properties.clone(),
            self.config.files.camera_config_path.clone(),
            supervisor_shutdown,
        ));

        let main_server = self.main_server;
        let admin_server = self.admin_server;
        let main_handle = tokio::spawn(async move {
            if let Err(e) = main_server.serve().await {
                tracing::error!("main http server exited: {e}");
            }
        });
        let admin_handle = tokio::spawn(async move {
            if let Err(e) = admin_server.serve().await {
                tracing::error!("admin http server exited: {e}");
            }
        });

        wait_for_shutdown_signal().await;
        info!("shutdown signal received");

        self.shutdown.cancel();
        self.capture.signal_to_stop();
        self.capture.wait_for_stop();

        let _ = supervisor_handle.await;
        let _ = main_handle.await;
        let _ = admin_handle.await;

        if let Some(path) = &self.config.files.camera_config_path {
            if let Err(e) = persist::save(self.properties.as_ref(), path) {
                tracing::warn!("failed to persist camera properties on shutdown: {e}");
            }
        }

        Ok(0)
    }
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");
    let mut sigquit = signal(SignalKind::quit()).expect("failed to register SIGQUIT handler");
    let mut sigabrt =
        signal(SignalKind::from_raw(libc::SIGABRT)).expect("failed to register SIGABRT handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
        _ = sighup.recv() => {}
        _ = sigquit.recv() => {}
        _ = sigabrt.recv() => {}
    }
}
