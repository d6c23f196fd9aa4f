//! `lineage-fixture` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`: register `event_order` and let the scheduler trigger it once.
//! - `emit`: emit the fixture's `COMPLETE` event right away.
//! - `show`: print the `event_order` definition as JSON.
//! - `validate`: validate a workflow JSON file.
//!
//! The lineage transport is configured from `OPENLINEAGE_*` variables.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fixtures::{build_scheduler, event_order_workflow, EmitEventStep, FixtureConfig};
use lineage::event::DEFAULT_PRODUCER;
use lineage::{InMemoryTransport, LineageClient, Producer};

#[derive(Parser)]
#[command(
    name = "lineage-fixture",
    about = "Runs the event_order lineage test workflow",
    version
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
struct FixtureArgs {
    /// Namespace of the emitted job. Falls back to `OPENLINEAGE_NAMESPACE`.
    #[arg(long)]
    namespace: Option<String>,

    /// Producer URI attached to every event.
    #[arg(long, default_value = DEFAULT_PRODUCER)]
    producer: String,

    /// Seconds `just_wait` sleeps before the event is emitted.
    #[arg(long, default_value_t = fixtures::config::DEFAULT_DELAY_SECS)]
    delay_secs: u64,
}

impl FixtureArgs {
    fn into_config(self) -> FixtureConfig {
        self.apply(FixtureConfig::from_env())
    }

    /// Layers the command-line flags over `base`.
    fn apply(self, base: FixtureConfig) -> FixtureConfig {
        let config = match self.namespace {
            Some(namespace) => base.with_namespace(Some(namespace)),
            None => base,
        };
        config
            .with_producer(Producer::new(self.producer))
            .with_delay_secs(self.delay_secs)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Register `event_order` and trigger it once.
    Run {
        #[command(flatten)]
        fixture: FixtureArgs,
        /// Also emit START/COMPLETE events for every step.
        #[arg(long)]
        task_events: bool,
        /// Collect events in memory and print them instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Emit the fixture's COMPLETE event without running the workflow.
    Emit {
        #[command(flatten)]
        fixture: FixtureArgs,
    },
    /// Print the `event_order` workflow definition.
    Show {
        #[command(flatten)]
        fixture: FixtureArgs,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run { fixture, task_events, dry_run } => {
            run(fixture.into_config(), task_events, dry_run).await
        }
        Command::Emit { fixture } => {
            let config = fixture.into_config();
            let client = LineageClient::from_environment()
                .context("failed to configure lineage client")?;
            let step = EmitEventStep::new(client.clone(), config.producer.clone(), config.namespace.clone());
            let event = step.build_event(&config.job_name);

            client.emit(&event).await.context("failed to emit lineage event")?;
            info!("emitted {} event {}", event.event_type, event.run.run_id);
            Ok(())
        }
        Command::Show { fixture } => {
            let workflow = event_order_workflow(&fixture.into_config());
            println!("{}", serde_json::to_string_pretty(&workflow)?);
            Ok(())
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read file {}", path.display()))?;

            let workflow: engine::Workflow =
                serde_json::from_str(&content).context("invalid workflow JSON")?;

            match engine::validate_dag(&workflow) {
                Ok(order) => {
                    println!("✅ Workflow is valid. Execution order: {order:?}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn run(config: FixtureConfig, task_events: bool, dry_run: bool) -> Result<()> {
    let memory = dry_run.then(|| Arc::new(InMemoryTransport::new()));
    let client = match &memory {
        Some(transport) => LineageClient::new(transport.clone()),
        None => LineageClient::from_environment().context("failed to configure lineage client")?,
    };
    info!(
        transport = client.transport_kind(),
        namespace = ?config.namespace,
        "starting event_order"
    );

    let scheduler = build_scheduler(&config, client, task_events)?;

    for outcome in scheduler.tick(Utc::now()).await {
        match outcome {
            Ok(result) => println!("{}", serde_json::to_string_pretty(&result.run)?),
            Err(e) => {
                if let Some(run) = e.run() {
                    println!("{}", serde_json::to_string_pretty(run)?);
                }
                error!("event_order failed: {e}");
                return Err(e).context("workflow run failed");
            }
        }
    }

    if let Some(transport) = memory {
        for event in transport.events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}
