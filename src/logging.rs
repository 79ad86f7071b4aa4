//! # Structured Logging Module
//!
//! Environment-aware structured logging built on `tracing-subscriber`. Human
//! readable output by default, JSON lines when configured.

use crate::config::LoggingConfig;
use crate::models::{ActorHandleId, ActorId, TaskId};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once per process.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Embedders may already have installed a subscriber; keep theirs.
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = config.json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Current environment from `TASKSPEC_ENV`
pub fn get_environment() -> String {
    std::env::var("TASKSPEC_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Log structured data for a task submission
pub fn log_task_operation(operation: &str, task_id: TaskId, kind: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        kind = %kind,
        details = details,
        "TASK_OPERATION"
    );
}

/// Log structured data for an actor lineage transition
pub fn log_lineage_operation(
    operation: &str,
    actor_id: ActorId,
    handle_id: Option<ActorHandleId>,
    counter: Option<u64>,
) {
    tracing::debug!(
        operation = %operation,
        actor_id = %actor_id,
        handle_id = ?handle_id,
        counter = counter,
        "LINEAGE_OPERATION"
    );
}
