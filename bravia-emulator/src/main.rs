//! Bravia emulator entry point.
//!
//! ```text
//! bravia-emulator                      Serve with defaults
//! bravia-emulator --config <path>      Load a custom config TOML
//! bravia-emulator --bind 0.0.0.0:51234 Override the listen address
//! bravia-emulator --state-file <path>  Override the state file
//! bravia-emulator --gen-config         Write default config to the --config path
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bravia_emulator::config::EmulatorConfig;
use bravia_emulator::server::EmulatorServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bravia-emulator", about = "Emulated simple-IP control display")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "bravia-emulator.toml")]
    config: PathBuf,

    /// Listen address (overrides config). Example: 0.0.0.0:51234
    #[arg(short, long)]
    bind: Option<String>,

    /// Device state JSON file (overrides config).
    #[arg(short, long)]
    state_file: Option<PathBuf>,

    /// Write the default configuration to the --config path and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: write defaults and exit.
    if cli.gen_config {
        EmulatorConfig::write_default(&cli.config)?;
        println!("wrote default config to {}", cli.config.display());
        return Ok(());
    }

    // Load config.
    let mut config = EmulatorConfig::load(&cli.config);
    if let Some(bind) = cli.bind {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| format!("--bind expects host:port, got {bind:?}"))?;
        config.network.host = host.to_string();
        config.network.port = port.parse()?;
    }
    if let Some(path) = cli.state_file {
        config.storage.state_file = path;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("bravia-emulator v{}", env!("CARGO_PKG_VERSION"));
    info!("listen address: {}", config.bind_address());
    info!("state file: {}", config.storage.state_file.display());

    let server = EmulatorServer::new(config)?;
    info!("\n{}", server.store().status());

    // Ctrl-C handler.
    let stop = server.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    server.run().await?;

    Ok(())
}
