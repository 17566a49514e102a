//! # Cloth - workspace-paging Wayland desktop engine
//!
//! Runs the desktop engine on the headless backend: virtual outputs are
//! announced, frames are paced by a timer and drawn by the logging renderer
//! until Ctrl-C stops the dispatch loop.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use cloth::backend::headless::HeadlessBackend;
use cloth::renderer::LogRenderer;
use cloth::{ClothConfig, Compositor, Desktop};

#[derive(Parser)]
#[command(name = "cloth")]
#[command(about = "A workspace-paging Wayland compositor engine with layer-shell support")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/cloth/cloth.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Number of virtual outputs the headless backend creates
    #[arg(long, default_value_t = 1)]
    headless_outputs: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so `general.debug` can raise the level
    let loaded = ClothConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().map_or(false, |c| c.general.debug);

    // Initialize logging
    if debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting Cloth");
    info!(
        "📄 Version: {} ({}, built {} for {})",
        cloth::VERSION,
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        env!("BUILD_DATE"),
        env!("TARGET_TRIPLE")
    );

    let config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            ClothConfig::default()
        }
    };

    let backend = HeadlessBackend::new();
    let desktop = Desktop::new(config, Box::new(backend.clone()), Box::new(LogRenderer::new()));
    let mut compositor = Compositor::new(desktop)?;

    let signal = compositor.loop_signal();
    ctrlc::set_handler(move || {
        info!("🛑 Interrupted, shutting down");
        signal.stop();
        signal.wakeup();
    })
    .context("Failed to install Ctrl-C handler")?;

    compositor.start_headless(&backend, cli.headless_outputs)?;
    compositor.drive_headless(backend)?;
    compositor.run()?;

    info!("✅ Cloth shut down cleanly");
    Ok(())
}
