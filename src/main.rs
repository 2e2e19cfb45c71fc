use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slipstream::consumers::{ConsoleReporter, KeyValuePublisher};
use slipstream::sink::RespSink;
use slipstream::{Dispatcher, Listener, RelayConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "debug";

#[derive(Parser, Debug)]
#[command(name = "slipstream")]
#[command(version)]
#[command(
    about = "Relay Forza Data Out UDP telemetry to the console and a Redis-compatible store.",
    long_about = None,
    after_help = "Examples:\n  slipstream -p 5300\n  slipstream -p 20777 -s 192.168.1.20 --report-hz 4\n  slipstream --config relay.yaml --no-publish"
)]
struct Args {
    /// UDP port to listen on [default: 5300]
    #[arg(short, long)]
    port: Option<u16>,

    /// Only accept datagrams from this host
    #[arg(short, long)]
    server: Option<IpAddr>,

    /// Local address to bind [default: 0.0.0.0]
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Redis-compatible server, host:port [default: 127.0.0.1:6379]
    #[arg(long)]
    redis: Option<String>,

    /// Do not publish metrics to the key-value store
    #[arg(long)]
    no_publish: bool,

    /// Print at most this many frames per second
    #[arg(long)]
    report_hz: Option<u32>,

    /// YAML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter directive, used when RUST_LOG is unset
    #[arg(long)]
    log_filter: Option<String>,
}

impl Args {
    fn relay_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(bind) = self.bind {
            config.listener.bind = bind;
        }
        if self.server.is_some() {
            config.listener.source = self.server;
        }
        if let Some(redis) = &self.redis {
            config.publisher.address = redis.clone();
        }
        if self.no_publish {
            config.publisher.enabled = false;
        }
        if self.report_hz.is_some() {
            config.console.report_hz = self.report_hz;
        }

        Ok(config)
    }
}

fn init_tracing(log_filter: Option<&str>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = log_filter.unwrap_or(DEFAULT_LOG_FILTER);
            EnvFilter::try_new(directive)
                .with_context(|| format!("invalid log filter {directive:?}"))?
        }
    };

    // Frames go to stdout, diagnostics to stderr
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Unable to listen for Ctrl-C");
        return;
    }
    info!("Ctrl-C received, shutting down");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref())?;
    let config = args.relay_config()?;

    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            for suggestion in e.recovery_suggestions() {
                warn!(suggestion, "Bind failed");
            }
            return Err(e).context("failed to open telemetry socket");
        }
    };

    let dispatcher = Arc::new(Dispatcher::new());
    let console =
        dispatcher.subscribe(Arc::new(ConsoleReporter::stdout(config.console.report_rate())));
    let publisher = config.publisher.enabled.then(|| {
        info!(address = %config.publisher.address, "Publishing metrics");
        let sink = RespSink::new(config.publisher.address.clone());
        dispatcher.subscribe(Arc::new(KeyValuePublisher::new(sink)))
    });

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    info!(
        port = config.listener.port,
        source = ?config.listener.source,
        "Listening for telemetry, press Ctrl-C to stop"
    );

    let outcome =
        listener.spawn(Arc::clone(&dispatcher), cancel).await.context("listener task failed")?;

    dispatcher.unsubscribe(console);
    if let Some(id) = publisher {
        dispatcher.unsubscribe(id);
    }

    let stats = outcome.into_result().context("telemetry feed failed")?;
    info!(frames = stats.frames, decode_errors = stats.decode_errors, "Relay stopped");
    Ok(())
}
