//! CLI for the inventory listener.
//!
//! This crate provides the `inventory-listener` binary: `run` consumes
//! package inventory reports until the source is exhausted or Ctrl-C is
//! pressed, `status` prints the resolved configuration.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use inventory_listener_adapters::sink::postgres::DEFAULT_MAX_CONNECTIONS;
use inventory_listener_adapters::prelude::*;
use inventory_listener_benchmarks::{io, BenchmarkRecorder};
use inventory_listener_pipeline::{
    run_pipeline, ConsumerStats, ListenerConfig, SinkKind, SourceKind,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration file picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "listener.toml";

/// Inventory listener CLI.
#[derive(Parser, Debug)]
#[command(name = "inventory-listener")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true, env = "LISTENER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume inventory reports and store canonical host requests.
    ///
    /// Reads newline-delimited JSON reports from stdin, or pops them from a
    /// Redis list named after the topic, until the input ends or Ctrl-C is
    /// pressed. Accepted reports are always finished before exiting.
    Run(RunArgs),

    /// Show the resolved configuration.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Overrides for the `run` command, applied over file and environment
/// values.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Topic to consume.
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Tasks allowed to wait for a worker before reads are throttled.
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Number of worker tasks.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Messages per benchmark window.
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Message source: stdin or redis.
    #[arg(long)]
    pub source: Option<SourceKind>,

    /// Persistence sink: memory or postgres.
    #[arg(long)]
    pub sink: Option<SinkKind>,

    /// PostgreSQL connection URL.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Write finished benchmark windows to this JSON file on exit.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Keep previously stored hosts instead of deleting them on startup.
    #[arg(long)]
    pub no_clean: bool,
}

impl RunArgs {
    /// Apply the flags that were given to `config`.
    pub fn apply(&self, config: &mut ListenerConfig) {
        if let Some(topic) = &self.topic {
            config.topic = topic.clone();
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(sink) = self.sink {
            config.sink = sink;
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if self.no_clean {
            config.clean_on_start = false;
        }
    }
}

/// Run the CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            config.validate()?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start the async runtime")?;
            let stats = runtime.block_on(run_listener(config, args.report))?;
            runtime.shutdown_timeout(Duration::from_secs(5));

            println!(
                "Processed {} messages ({} submitted, {} malformed)",
                stats.received, stats.submitted, stats.malformed
            );
            Ok(())
        }
        Commands::Status { detailed } => {
            config.validate()?;
            println!("Inventory Listener");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Topic: {}", config.topic);
            println!("Source: {}", config.source);
            println!("Sink: {}", config.sink);
            println!(
                "Executor: {} workers, queue capacity {}",
                config.worker_count, config.queue_capacity
            );
            println!("Benchmark batch size: {}", config.batch_size);

            if detailed {
                println!("\nResolved configuration:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }

            Ok(())
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Load file and environment values without validating them, so `run`
/// flags can still override.
fn load_config(path: Option<&Path>) -> anyhow::Result<ListenerConfig> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = path.or_else(|| default_path.exists().then_some(default_path));
    ListenerConfig::load(path).context("failed to load configuration")
}

async fn open_sink(config: &ListenerConfig) -> anyhow::Result<Arc<dyn HostSink>> {
    match config.sink {
        SinkKind::Memory => Ok(Arc::new(MemorySink::new())),
        SinkKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("database_url is required for the postgres sink")?;
            let sink = PostgresSink::connect(url, DEFAULT_MAX_CONNECTIONS)
                .await
                .context("failed to connect to PostgreSQL")?;
            sink.ensure_schema()
                .await
                .context("failed to create the hosts table")?;
            Ok(Arc::new(sink))
        }
    }
}

async fn run_listener(
    config: ListenerConfig,
    report: Option<PathBuf>,
) -> anyhow::Result<ConsumerStats> {
    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start the Prometheus exporter")?;
        info!(%addr, "Serving metrics");
    }

    let sink = open_sink(&config).await?;
    if config.clean_on_start {
        let removed = sink.delete_all().await.context("failed to clean the sink")?;
        info!(removed, "Cleared stored hosts");
    }

    let recorder = Arc::new(BenchmarkRecorder::new(config.batch_size()?));
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, draining"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
            shutdown.cancel();
        }
    });

    info!(
        topic = %config.topic,
        source = %config.source,
        sink = %config.sink,
        workers = config.worker_count,
        queue_capacity = config.queue_capacity,
        batch_size = config.batch_size,
        "Starting listener"
    );

    let executor_config = config.executor_config();
    let stats = match config.source {
        SourceKind::Stdin => {
            let source = LineSource::new(config.topic.as_str(), BufReader::new(tokio::io::stdin()));
            run_pipeline(source, executor_config, sink, recorder.clone(), shutdown).await?
        }
        SourceKind::Redis => {
            let source = RedisListSource::connect(&config.redis_url, config.topic.as_str())
                .await
                .context("failed to connect to Redis")?;
            run_pipeline(source, executor_config, sink, recorder.clone(), shutdown).await?
        }
    };

    if let Some(path) = report {
        let results = recorder.results();
        io::write_results_json(&results, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(windows = results.len(), path = %path.display(), "Benchmark report written");
    }

    Ok(stats)
}
