use crate::config::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn default_directives() -> &'static str {
    if cfg!(debug_assertions) {
        "info,voice_assistant=debug,reqwest=info,hyper=info"
    } else {
        "info,voice_assistant=info,reqwest=warn,hyper=warn"
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the built-in defaults.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directives()))?;

    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("voice assistant starting up");
    tracing::info!("version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    Ok(())
}
