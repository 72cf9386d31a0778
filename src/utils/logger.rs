use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 給終端機看的精簡格式
    #[default]
    Compact,
    /// One JSON object per event, with the lifecycle span fields flattened in.
    Json,
}

/// `RUST_LOG` 未設定時使用的 filter
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "node_broker=debug,info"
    } else {
        "node_broker=info,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Installs the global subscriber. A second call keeps the first subscriber.
pub fn init_logger(format: LogFormat, verbose: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));

    let installed = match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(verbose)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    if let Err(e) = installed {
        tracing::debug!(error = %e, "logger already installed");
    }
}
