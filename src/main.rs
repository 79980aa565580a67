use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use camweb::cli::{apply_args, USAGE};
use camweb::{Application, CamwebConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let mut config = CamwebConfig::load_from_file("camweb.toml")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = apply_args(&mut config, &args) {
        eprintln!("{e}");
        eprint!("{USAGE}");
        std::process::exit(2);
    }

    if let Err(e) = config.validate() {
        error!("invalid configuration: {e}");
        std::process::exit(2);
    }

    info!("starting camweb v{}", env!("CARGO_PKG_VERSION"));

    let application = Application::new(config).await.map_err(|e| {
        error!("failed to initialize application: {e}");
        e
    })?;

    let exit_code = application.run().await.map_err(|e| {
        error!("application error: {e}");
        e
    })?;

    std::process::exit(exit_code);
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("camweb=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(env_filter)
        .init();
}
