use tracing_subscriber::{fmt, EnvFilter};

/// The filter used when `RUST_LOG` is not set.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "gocross=warn",
        1 => "gocross=info",
        _ => "gocross=debug",
    }
}

/// Install a stderr `fmt` subscriber. `RUST_LOG` takes precedence over
/// `verbosity`. Does nothing if a global subscriber is already set.
pub fn setup_logging(verbosity: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directive(verbosity))
    };

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
