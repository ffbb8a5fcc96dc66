use std::env;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const LOG_FILE_PREFIX: &str = "leasebot.log";

/// Crate logs at info, request spans from `TraceLayer`, everything else at warn.
const DEFAULT_DIRECTIVES: &str = "warn,leasebot_backend=info,tower_http=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs stdout and daily rolling file output under `paths.log_dir`.
///
/// Filter directives come from `LEASEBOT_LOG`, then `RUST_LOG`.
pub fn init(paths: &AppPaths) {
    let log_dir = &paths.log_dir;
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("cannot create log dir {}: {}", log_dir.display(), e);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let directives = directives_from(env::var("LEASEBOT_LOG").ok(), env::var("RUST_LOG").ok());
    let env_filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    // try_init: integration tests may build more than one server per process
    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("Logging to {}/{}.*", log_dir.display(), LOG_FILE_PREFIX);
    }
}

fn directives_from(leasebot_log: Option<String>, rust_log: Option<String>) -> String {
    leasebot_log
        .or(rust_log)
        .filter(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}
