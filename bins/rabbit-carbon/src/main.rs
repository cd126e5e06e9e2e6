mod cli;

use std::sync::Arc;

use clap::Parser;

use carbon_api::MetricSink;
use carbon_engine::config::RuntimeConfig;
use carbon_engine::error::EngineError;
use carbon_engine::{Bridge, Outcome, Signal, StatsRegistry};
use carbon_sink_graphite::{GraphiteSink, NopSink};
use carbon_source_amqp::AmqpSubscriber;
use cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("rabbit-carbon passthrough starting");

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let code = match run(config).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            1
        }
    };
    // Exit right away: in-flight deliveries are not drained.
    std::process::exit(code);
}

async fn run(config: RuntimeConfig) -> Result<Outcome, EngineError> {
    // --- Broker ---
    let broker = AmqpSubscriber::connect(&config.rabbit_uri, config.prefetch).await?;

    // --- Sink ---
    let sink: Arc<dyn MetricSink> = if config.graphite_host.is_empty() {
        tracing::warn!("no graphite host configured, metrics will only be logged");
        Arc::new(NopSink)
    } else {
        let sink = GraphiteSink::connect(
            &config.graphite_host,
            config.graphite_port,
            config.graphite_timeout,
        )
        .await?;
        Arc::new(sink)
    };

    // --- Status endpoint (best effort) ---
    let stats = Arc::new(StatsRegistry::new());
    let status_stats = stats.clone();
    let status_listen = config.status_listen.clone();
    tokio::spawn(async move {
        if let Err(e) = carbon_api_server::run(&status_listen, status_stats).await {
            tracing::warn!(
                error = %e,
                "could not start HTTP endpoint (specified address: {status_listen})"
            );
        }
    });

    // --- Consumers ---
    let bridge = Bridge::bootstrap(&config, &broker, sink, stats).await?;
    Ok(bridge.run(shutdown_signal()).await)
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() -> Signal {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                return tokio::select! {
                    _ = tokio::signal::ctrl_c() => Signal::Interrupt,
                    _ = sigterm.recv() => Signal::Terminate,
                };
            }
            Err(e) => tracing::warn!(error = %e, "failed to register SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        return std::future::pending().await;
    }
    Signal::Interrupt
}
