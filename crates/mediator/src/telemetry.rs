//! Metrics for the query RPC surface.
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::CounterVec;
use prometheus::Opts;

/// Total number of `query` invocations received, by whether they resolved inline or streamed.
pub static QUERY_COUNT: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "gateway_mediator_query_count",
            "Total number of query invocations received",
        ),
        &["mode"],
    )
    .expect("failed to initialise QUERY_COUNT counter")
});

/// Number of `query` invocations that returned an error, by error code.
pub static QUERY_ERR: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new(
            "gateway_mediator_query_error",
            "Number of query invocations that returned an error",
        ),
        &["code"],
    )
    .expect("failed to initialise QUERY_ERR counter")
});

static METRICS_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register this crate's metrics with `reg`. Safe to call more than once; only the first call
/// actually registers anything.
pub fn register_metrics(reg: &prometheus::Registry) -> Result<()> {
    if METRICS_REGISTERED.swap(true, Ordering::AcqRel) {
        return Ok(());
    }

    let collectors: [Box<dyn prometheus::core::Collector>; 2] = [
        Box::new(QUERY_COUNT.clone()),
        Box::new(QUERY_ERR.clone()),
    ];
    for collector in collectors {
        reg.register(collector)?;
    }
    Ok(())
}
