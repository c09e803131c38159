//! Run the query mediator server.
use std::sync::Arc;

use anyhow::Result;
use gateway_broker::fixture::FixtureBroker;
use gateway_broker::TaskSource;
use gateway_conf::Conf;
use gateway_context::Context;
use gateway_db::fixture::FixtureDatabase;
use gateway_db::ConnectOptions;
use gateway_db::Database;
use gateway_mediator::Mediator;

use super::Cli;

/// Run the query mediator server: load the named service's configuration, bootstrap the target
/// database, then serve `query` RPC tasks until the broker's task source is exhausted or the
/// process receives a shutdown signal.
pub async fn run(cli: Cli, conf: Conf) -> Result<()> {
    let logger = crate::init::logger();
    let _metrics = crate::init::metrics()?;
    let root = Context::root(logger.clone())
        .log_values(slog::o!("service" => cli.service.clone()))
        .build();

    let service = conf.service(&cli.service).cloned().unwrap_or_default();
    slog::info!(
        root.logger, "Starting gatewayd";
        "rethink_host" => &service.rethink_host, "rethink_db" => &service.rethink_db,
    );

    // No production broker or document database client is in scope: wire the in-memory
    // stand-ins used by this workspace's own tests as the only available backends.
    let database = FixtureDatabase::new();
    let session = database
        .connect(ConnectOptions {
            address: service.rethink_host.clone(),
            database: service.rethink_db.clone(),
        })
        .await?;
    session
        .bootstrap(&service.rethink_db, service.reset)
        .await?;

    let broker = Arc::new(FixtureBroker::new());
    let mediator = Mediator::new(
        root.clone(),
        session,
        broker.clone(),
        service.rethink_db.clone(),
    );

    serve(logger, broker, mediator).await
}

async fn serve(
    logger: slog::Logger,
    broker: Arc<FixtureBroker>,
    mediator: Mediator<Arc<FixtureBroker>>,
) -> Result<()> {
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                slog::info!(logger, "Shutdown signal received, stopping server");
                return Ok(());
            }
            task = broker.next_task() => {
                let Some((task, reply)) = task else {
                    slog::info!(logger, "Task source exhausted, stopping server");
                    return Ok(());
                };
                if task.method != "query" {
                    reply.err(0, format!("unknown method '{}'", task.method)).await;
                    continue;
                }
                match mediator.query(&task.params).await {
                    Ok(outcome) => reply.ok(gateway_mediator::outcome_to_value(outcome)).await,
                    Err(error) => {
                        gateway_mediator::telemetry::QUERY_ERR
                            .with_label_values(&[&error.code().to_string()])
                            .inc();
                        reply.err(error.code(), error.to_string()).await;
                    }
                }
            }
        }
    }
}
