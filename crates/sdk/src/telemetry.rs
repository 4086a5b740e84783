use metrics::counter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a JSON `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Fails if the process already installed a global subscriber.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .try_init()?;
    Ok(())
}

pub fn record_request(method: &str, result: &str) {
    counter!(
        "iofog_sdk_requests_total",
        "method" => method.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

pub fn record_retry(operation: &str) {
    counter!("iofog_sdk_retries_total", "operation" => operation.to_string()).increment(1);
}

pub fn record_reconcile(result: &str) {
    counter!("iofog_sdk_reconcile_total", "result" => result.to_string()).increment(1);
}
