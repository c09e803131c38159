//! Process-wide initialisation: logging and metrics.
use slog::Drain;

/// Build the root logger for the process: JSON records to stdout, written asynchronously so a
/// slow consumer of the log stream never blocks request handling.
pub fn logger() -> slog::Logger {
    let drain = slog_json::Json::new(std::io::stdout())
        .add_default_keys()
        .build()
        .fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!("service" => "gatewayd"))
}

/// Build the process-wide Prometheus registry and register every crate's metrics with it.
pub fn metrics() -> anyhow::Result<prometheus::Registry> {
    let registry = prometheus::Registry::new();
    gateway_mediator::telemetry::register_metrics(&registry)?;
    Ok(registry)
}
