//! # Dripline — follow-up sequence scheduling engine
//!
//! CLI harness around the two engine entry points. The engine owns no timer
//! loop; this binary is the external periodic trigger.
//!
//! Usage:
//!   dripline compile --tenant acme          # one compile pass
//!   dripline execute --tenant acme          # one due-batch dispatch
//!   dripline run --tenant acme              # periodic loop (cron-less hosts)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dripline_channels::{ConsoleChannel, WebhookChannel};
use dripline_core::DriplineConfig;
use dripline_core::traits::DeliveryChannel;
use dripline_engine::{DueEntryExecutor, RecipientMatcher, ScheduleWriter, TemplateOrchestrator};
use dripline_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "dripline",
    version,
    about = "💧 Dripline — follow-up sequence scheduling engine"
)]
struct Cli {
    /// Config file path (default: ~/.dripline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile and persist schedules for a tenant's active templates
    Compile {
        #[arg(short, long)]
        tenant: String,
    },
    /// Dispatch one batch of due schedule entries for a tenant
    Execute {
        #[arg(short, long)]
        tenant: String,
    },
    /// Periodic loop: execute every tick, compile every N ticks
    Run {
        #[arg(short, long)]
        tenant: String,

        /// Seconds between ticks (default: executor.tick_secs from config)
        #[arg(long)]
        interval: Option<u64>,

        /// Run a compile pass every N ticks
        #[arg(long, default_value = "60")]
        compile_every: u64,
    },
}

struct Services {
    orchestrator: TemplateOrchestrator,
    executor: DueEntryExecutor,
}

fn build_services(config: &DriplineConfig) -> Result<Services> {
    let db_path = shellexpand::tilde(&config.db_path).to_string();
    let store = Arc::new(SqliteStore::open(Path::new(&db_path))?);

    let channel: Arc<dyn DeliveryChannel> = match &config.channel.webhook {
        Some(webhook) => Arc::new(WebhookChannel::new(webhook.clone())),
        None => Arc::new(ConsoleChannel),
    };

    let orchestrator = TemplateOrchestrator::new(
        store.clone(),
        RecipientMatcher::new(store.clone()),
        ScheduleWriter::new(store.clone()),
    );
    let executor = DueEntryExecutor::new(store.clone(), store.clone(), channel, store)
        .with_page_size(config.executor.page_size)
        .with_active_hours_enforcement(config.executor.enforce_active_hours);

    Ok(Services { orchestrator, executor })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => DriplineConfig::load_from(path)?,
        None => DriplineConfig::load()?,
    };
    let services = build_services(&config)?;

    match cli.command {
        Command::Compile { tenant } => {
            let report = services
                .orchestrator
                .compile_tenant_schedules(&tenant, Utc::now())
                .await?;
            if report.templates_failed > 0 {
                tracing::warn!(
                    "⚠️ {} template(s) failed to compile, see log above",
                    report.templates_failed
                );
            }
        }
        Command::Execute { tenant } => {
            let report = services.executor.execute_due_batch(&tenant, Utc::now()).await?;
            if report.due == 0 {
                tracing::info!("nothing due for tenant {tenant}");
            }
        }
        Command::Run { tenant, interval, compile_every } => {
            let tick_secs = interval.unwrap_or(config.executor.tick_secs);
            tracing::info!(
                "⏰ dripline running for tenant {tenant} (tick every {tick_secs}s, compile every {compile_every} tick(s))"
            );

            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(tick_secs.max(1)));
            let mut ticks: u64 = 0;
            loop {
                ticker.tick().await;
                if ticks % compile_every.max(1) == 0
                    && let Err(e) = services
                        .orchestrator
                        .compile_tenant_schedules(&tenant, Utc::now())
                        .await
                {
                    tracing::warn!("⚠️ compile pass failed: {e}");
                }
                if let Err(e) = services.executor.execute_due_batch(&tenant, Utc::now()).await {
                    tracing::warn!("⚠️ due batch failed: {e}");
                }
                ticks += 1;
            }
        }
    }

    Ok(())
}
