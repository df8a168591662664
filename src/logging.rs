//! Logging setup for handoff using tracing.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingSettings;

const DEFAULT_FILTER: &str = "info,handoff=debug";

/// Initialize logging with console output and, when `settings.dir` is set, a
/// daily rolling file.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the file writer.
pub fn init(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER)))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true);

    let (file_layer, guard) = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, &settings.file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!("handoff logging initialized");
    if let Some(dir) = &settings.dir {
        tracing::info!("Log directory: {}", dir.display());
    }

    Ok(guard)
}
