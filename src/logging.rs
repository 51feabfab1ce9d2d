//! Structured logging setup (console + rolling file).

use std::path::Path;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
/// When a log directory is given, a daily-rolling JSON file layer is added
/// alongside the console layer.
pub fn init(log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,staff_dashboard=debug"));

    let console_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "dashboard");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            registry.with(file_layer).init();

            // Dropping the guard flushes and stops the writer. Leak it so
            // the file layer stays active until process exit.
            std::mem::forget(_guard);
        }
        None => registry.init(),
    }

    info!("Starting staff dashboard v{}", env!("CARGO_PKG_VERSION"));
}
