//! Watchtower - Distributed Monitoring Pipeline
//!
//! Runs protocol probes on a sweep interval, deduplicates failures
//! against ongoing streaks, fans results out to destination queues
//! under per-queue filters, and renders notifications.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dedup_engine::{DedupConfig, DedupEngine};
use notify::{EmailBridge, MailSender, NotifyPolicy, WebhookBridge};
use probes::{ProbeOptions, ProbeRegistry};
use queue_router::{DestinationRule, Router};
use queue_transport::{run_consumer, MemoryDedupStore, MemoryQueue};

mod mail;
mod settings;
mod worker;

use mail::SendmailSender;
use settings::Settings;
use worker::{parse_check, Worker};

#[derive(Parser)]
#[command(name = "watchtower")]
#[command(version)]
#[command(about = "Distributed monitoring pipeline", long_about = None)]
struct Cli {
    /// Settings file path (also: WATCHTOWER_CONFIG)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show more output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline: probes, dedup, routing, notifications
    Run {
        /// Check definition, e.g. "mail.example.com must run pop3"
        /// (repeatable)
        #[arg(long = "check", required = true)]
        checks: Vec<String>,

        /// Destination queue spec "queueKey[filterQuery]" (repeatable)
        #[arg(long = "dest-queue")]
        dest_queues: Vec<String>,

        /// Email recipient (repeatable; enables the email bridge)
        #[arg(long = "email")]
        emails: Vec<String>,

        /// Queue the email bridge consumes (defaults to the source
        /// queue; point it at a routed destination when routing)
        #[arg(long)]
        email_queue: Option<String>,

        /// Sender address for notification emails
        #[arg(long, default_value = "watchtower@localhost")]
        mail_from: String,

        /// Webhook URL (enables the webhook bridge)
        #[arg(long)]
        webhook_url: Option<String>,

        /// Queue the webhook bridge consumes
        #[arg(long)]
        webhook_queue: Option<String>,

        /// Also email plain passing results
        #[arg(long)]
        send_success: bool,

        /// Also email recovery transitions
        #[arg(long)]
        send_recovered: bool,

        /// Dedup window in seconds (0 disables deduplication)
        #[arg(long)]
        dedup: Option<u64>,

        /// Seconds between check sweeps
        #[arg(long)]
        interval: Option<u64>,

        /// Tag applied to all results
        #[arg(long)]
        tag: Option<String>,

        /// Report steady-state passing checks too
        #[arg(long)]
        notify_on_success: bool,
    },

    /// Print usage examples for the registered probes
    Examples {
        /// Limit output to one probe type
        probe: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Examples { probe } => run_examples(probe.as_deref()),
        Commands::Run {
            checks,
            dest_queues,
            emails,
            email_queue,
            mail_from,
            webhook_url,
            webhook_queue,
            send_success,
            send_recovered,
            dedup,
            interval,
            tag,
            notify_on_success,
        } => {
            let mut settings =
                Settings::load(cli.config.as_deref()).context("failed to load settings")?;
            if let Some(dedup) = dedup {
                settings.dedup_seconds = dedup;
            }
            if let Some(interval) = interval {
                settings.interval_seconds = interval;
            }
            if let Some(tag) = tag {
                settings.tag = tag;
            }
            settings.notify_on_success |= notify_on_success;

            run_pipeline(PipelineArgs {
                settings,
                checks,
                dest_queues,
                emails,
                email_queue,
                mail_from,
                webhook_url,
                webhook_queue,
                policy: NotifyPolicy {
                    send_success,
                    send_recovered,
                },
            })
            .await
        }
    }
}

fn run_examples(probe: Option<&str>) -> anyhow::Result<()> {
    let registry = ProbeRegistry::with_builtin();
    for name in registry.names() {
        if probe.is_some_and(|p| p != name) {
            continue;
        }
        if let Some(probe) = registry.get(name) {
            println!("{}", probe.example());
        }
    }
    Ok(())
}

struct PipelineArgs {
    settings: Settings,
    checks: Vec<String>,
    dest_queues: Vec<String>,
    emails: Vec<String>,
    email_queue: Option<String>,
    mail_from: String,
    webhook_url: Option<String>,
    webhook_queue: Option<String>,
    policy: NotifyPolicy,
}

async fn run_pipeline(args: PipelineArgs) -> anyhow::Result<()> {
    let settings = args.settings;

    // All configuration parses before anything starts; a partial
    // routing table never runs.
    let checks = args
        .checks
        .iter()
        .map(|line| parse_check(line, &settings.tag))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let rules = DestinationRule::parse_all(&args.dest_queues)
        .context("invalid destination queue configuration")?;

    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryDedupStore::new());
    let engine = DedupEngine::new(
        store,
        DedupConfig {
            dedup_duration: (settings.dedup_seconds > 0)
                .then(|| Duration::from_secs(settings.dedup_seconds)),
            notify_on_success: settings.notify_on_success,
            ..Default::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut consumers = Vec::new();

    if !rules.is_empty() {
        info!(destinations = rules.len(), "routing enabled");
        let router = Router::new(rules, queue.clone());
        let queue = Arc::clone(&queue);
        let source = settings.source_queue.clone();
        let shutdown = shutdown_rx.clone();
        consumers.push(tokio::spawn(async move {
            run_consumer(queue.as_ref(), &source, &router, shutdown).await;
        }));
    }

    if !args.emails.is_empty() {
        let sender: Arc<dyn MailSender> = Arc::new(SendmailSender::new(&args.mail_from));
        let bridge = EmailBridge::new(sender, args.emails, args.policy);
        let source = args
            .email_queue
            .unwrap_or_else(|| settings.source_queue.clone());
        info!(queue = source, "email bridge enabled");
        let queue = Arc::clone(&queue);
        let shutdown = shutdown_rx.clone();
        consumers.push(tokio::spawn(async move {
            run_consumer(queue.as_ref(), &source, &bridge, shutdown).await;
        }));
    }

    if let Some(url) = args.webhook_url {
        let bridge = WebhookBridge::new(&url);
        let source = args
            .webhook_queue
            .unwrap_or_else(|| settings.source_queue.clone());
        info!(queue = source, url, "webhook bridge enabled");
        let queue = Arc::clone(&queue);
        let shutdown = shutdown_rx.clone();
        consumers.push(tokio::spawn(async move {
            run_consumer(queue.as_ref(), &source, &bridge, shutdown).await;
        }));
    }

    let worker = Worker::new(
        ProbeRegistry::with_builtin(),
        engine,
        queue.clone(),
        &settings.source_queue,
        ProbeOptions {
            timeout: Duration::from_secs(settings.timeout_seconds),
            verbose: false,
        },
    );
    let sweep_interval = Duration::from_secs(settings.interval_seconds);
    let worker_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            worker.run(&checks, sweep_interval, shutdown).await;
        })
    };

    info!("watchtower v{} started", env!("CARGO_PKG_VERSION"));
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    shutdown_tx.send(true).ok();

    worker_task.await.ok();
    for consumer in consumers {
        consumer.await.ok();
    }
    Ok(())
}
