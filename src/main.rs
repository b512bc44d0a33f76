//! Motion Recorder CLI
//!
//! Records clips from an input whenever motion is seen. Send SIGUSR1 to
//! force a recording; SIGINT or SIGTERM closes any open clip and exits.

use clap::Parser;
use motion_recorder::{
    config::FileConfig,
    dispatch::{Dispatcher, ManualTrigger, ShutdownFlag},
    media::open_source,
    metrics::MetricsRegistry,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "motion-recorder", version, about = "Motion-triggered clip recorder")]
struct Cli {
    /// Input to watch (`synthetic[:key=value,...]` for the built-in scene)
    input: String,

    /// Directory clips are written to
    output_dir: PathBuf,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = run(cli) {
        error!(error = %e, "Recorder failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("Motion Recorder v{}", motion_recorder::VERSION);

    let config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    std::fs::create_dir_all(&cli.output_dir)?;

    let source = open_source(&cli.input, &config.synthetic)?;
    info!(input = %cli.input, output = %cli.output_dir.display(), "Opened input");

    let trigger = ManualTrigger::new();
    #[cfg(unix)]
    trigger.register_signal()?;

    let shutdown = ShutdownFlag::new();
    if let Err(e) = shutdown.install() {
        warn!(error = %e, "Failed to install shutdown handler");
    }

    let mut dispatcher = Dispatcher::new(source, &cli.output_dir, config.detection, &config.recording)
        .with_trigger(trigger)
        .with_shutdown(shutdown);

    if config.metrics.port != 0 {
        let registry = MetricsRegistry::new()?;
        start_exporter(config.metrics.port, registry.clone());
        dispatcher = dispatcher.with_metrics(registry);
    }

    let stats = dispatcher.run()?;
    info!(
        clips = stats.clips_finished,
        interesting = stats.interesting_frames,
        "Done"
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn start_exporter(port: u16, registry: MetricsRegistry) {
    use motion_recorder::metrics::{MetricsServer, MetricsServerConfig};

    MetricsServer::new(MetricsServerConfig::with_port(port), registry).spawn();
}

#[cfg(not(feature = "metrics"))]
fn start_exporter(port: u16, _registry: MetricsRegistry) {
    warn!(port, "Metrics port configured but built without the `metrics` feature");
}
