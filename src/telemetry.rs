use std::fmt::Display;

use anyhow::Result;
use tracing::{debug_span, level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan, EnvFilter, Layer};

pub fn init_subscribers() -> Result<()> {
    // Filter
    let env_filter = build_env_filter_layer()?;

    // Layers
    let logger_text_layer = build_logger_text_layer();

    // Subscriber
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(logger_text_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn build_env_filter_layer() -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(
            std::env::var("RUST_LOG").unwrap_or_else(|_| LevelFilter::INFO.to_string()),
        ))
}

fn build_logger_text_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    use tracing_subscriber::fmt::format::FmtSpan;
    Box::new(
        tracing_subscriber::fmt::layer()
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_target(true)
            .with_level(true),
    )
}

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    Select,
    Insert,
    Update,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Select => write!(f, "SELECT"),
            Operation::Insert => write!(f, "INSERT"),
            Operation::Update => write!(f, "UPDATE"),
        }
    }
}

pub fn instrument_query(operation: Operation, table: &str) -> tracing::Span {
    debug_span!(
        "db_query",
        db.system = "postgres",
        db.operation = %operation,
        otel.name = %format!("{} {}", operation, table),
        otel.kind = "CLIENT",
        otel.status_code = tracing::field::Empty,
    )
}
