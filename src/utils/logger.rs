use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rewards_etl=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rewards_etl=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON 格式，方便排程環境收集日誌
pub fn init_json_logger() {
    json_subscriber().init();
}

fn json_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rewards_etl=info"));

    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_subscriber_can_emit_events() {
        tracing::subscriber::with_default(json_subscriber(), || {
            tracing::info!(rows = 3, "✅ fetch.brands loaded");
        });
    }
}
