//! Logging setup.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str) {
    let default_directive: Directive = level.parse().unwrap_or_else(|_| {
        eprintln!("Unknown log level {:?}, using info", level);
        LevelFilter::INFO.into()
    });

    let filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr) // stdout stays free for --audio-info output
        .with_target(false)
        .with_filter(filter);

    if let Err(e) = tracing_subscriber::registry().with(console_layer).try_init() {
        eprintln!("Logging already initialized: {}", e);
    }
}
