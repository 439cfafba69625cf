use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rental_etl=debug,info")
        } else {
            EnvFilter::new("rental_etl=info")
        }
    })
}

/// Installs the global subscriber.
///
/// Console output is compact text unless `json` is set. When `log_dir` is
/// given, every event is also appended as JSON to `<log_dir>/application.log`;
/// keep the returned guard alive until exit so buffered lines get flushed.
pub fn init_cli_logger(verbose: bool, json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "application.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = if json {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .json()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
