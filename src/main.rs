//! Gateway configuration engine CLI.
//!
//! ```text
//! config-engine validate --config config.toml [--pipeline p.toml]... [--pipelines-dir dir]
//! config-engine resolve  --config config.toml ...
//! config-engine watch    --config config.toml ... [--metrics-address 127.0.0.1:9090]
//! ```
//!
//! Exit codes: 0 valid, 1 invalid, 2 when documents or schemas cannot be
//! loaded at all.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use gateway_config_engine::config::loader::{load_engine_config, load_sources};
use gateway_config_engine::config::{ConfigWatcher, EngineConfig, GenerationStore};
use gateway_config_engine::lifecycle::{signals, Shutdown};
use gateway_config_engine::observability::{logging, metrics};
use gateway_config_engine::{Engine, GenerationSources, Report};

#[derive(Parser)]
#[command(name = "config-engine")]
#[command(about = "Validate and resolve gateway configuration", long_about = None)]
struct Cli {
    /// Engine settings file; a missing file means defaults
    #[arg(long, global = true, default_value = "engine.toml")]
    engine_config: PathBuf,

    /// Schema for the global document instead of the bundled one
    #[arg(long, global = true)]
    config_schema: Option<PathBuf>,

    /// Schema for pipeline documents instead of the bundled one
    #[arg(long, global = true)]
    pipeline_schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Global configuration document
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline document, in addition to the pipeline directory
    #[arg(short, long = "pipeline")]
    pipelines: Vec<PathBuf>,

    /// Pipeline directory instead of the one named by `proxy.pipelines_path`
    #[arg(long)]
    pipelines_dir: Option<PathBuf>,

    /// Layer schema defaults beneath effective configurations
    #[arg(long)]
    schema_defaults: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration generation and print every error
    Validate(SourceArgs),
    /// Print the resolved configuration generation as JSON
    Resolve(SourceArgs),
    /// Watch the configuration and publish every valid generation
    Watch {
        #[command(flatten)]
        sources: SourceArgs,

        /// Serve Prometheus metrics on this address
        #[arg(long)]
        metrics_address: Option<SocketAddr>,
    },
}

impl Commands {
    fn sources(&self) -> &SourceArgs {
        match self {
            Commands::Validate(sources) | Commands::Resolve(sources) => sources,
            Commands::Watch { sources, .. } => sources,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    let mut settings = load_engine_config(&cli.engine_config)?;
    apply_overrides(&mut settings, &cli);
    logging::init(&settings.observability)?;

    let engine = Engine::from_settings(&settings)?;
    let args = cli.command.sources();
    let load = || {
        load_sources(
            &settings.paths.config,
            settings.paths.pipelines_dir.as_deref(),
            &args.pipelines,
        )
    };

    match &cli.command {
        Commands::Validate(args) => {
            let evaluation = engine.evaluate(&load()?);
            print_report(&evaluation.report, args.format)?;
            Ok(evaluation.report.exit_code())
        }
        Commands::Resolve(args) => {
            let evaluation = engine.evaluate(&load()?);
            match &evaluation.resolved {
                Some(resolved) => {
                    println!("{}", serde_json::to_string_pretty(resolved)?);
                }
                None => print_report(&evaluation.report, args.format)?,
            }
            Ok(evaluation.report.exit_code())
        }
        Commands::Watch {
            sources,
            metrics_address,
        } => {
            if let Some(addr) = metrics_address {
                metrics::init_metrics(*addr)?;
            }
            let initial = load()?;
            watch(engine, settings.clone(), initial, sources).await?;
            Ok(0)
        }
    }
}

/// CLI flags win over the settings file.
fn apply_overrides(settings: &mut EngineConfig, cli: &Cli) {
    if let Some(path) = &cli.config_schema {
        settings.schemas.config = Some(path.clone());
    }
    if let Some(path) = &cli.pipeline_schema {
        settings.schemas.pipeline = Some(path.clone());
    }

    let args = cli.command.sources();
    if let Some(config) = &args.config {
        settings.paths.config = config.clone();
    }
    if let Some(dir) = &args.pipelines_dir {
        settings.paths.pipelines_dir = Some(dir.clone());
    }
    if args.schema_defaults {
        settings.resolution.apply_schema_defaults = true;
    }
}

fn print_report(report: &Report, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Text => println!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

async fn watch(
    engine: Engine,
    settings: EngineConfig,
    initial: GenerationSources,
    args: &SourceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(GenerationStore::new());
    let report = store.apply(&engine, initial);
    print_report(&report, args.format)?;

    let (watcher, mut updates) = ConfigWatcher::new(&settings.paths.config, settings.paths.pipelines_dir.as_deref());
    let _watcher = watcher
        .with_extra_pipelines(args.pipelines.clone())
        .with_poll_interval(Duration::from_secs(settings.watch.poll_interval_secs))
        .run()?;

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = signals::shutdown_on_signal(shutdown).await {
            tracing::error!(error = %e, "Failed to listen for shutdown signals");
        }
    });

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(sources) = update else { break };
                let report = store.apply(&engine, sources);
                print_report(&report, args.format)?;
            }
            _ = stop.recv() => break,
        }
    }

    tracing::info!(
        live_generation = ?store.current().map(|g| g.id),
        "Watch stopped"
    );
    Ok(())
}
