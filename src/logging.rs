//! Logging module for user-sync
//!
//! This module configures structured logging using the tracing crate,
//! providing JSON output for production and pretty formatting for development.
//! Consumers have no synchronous caller, so these logs are the only place a
//! skipped message is ever reported.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};

/// Initialize the logging system
///
/// Configures tracing based on the environment:
/// - Production: JSON formatted logs
/// - Development: Pretty formatted logs with colors
pub fn init_tracing(service: &ServiceConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("user_sync={},rdkafka=warn", service.log_level))
    });

    if service.is_production() {
        let formatting_layer = fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_current_span(true);

        Registry::default()
            .with(env_filter)
            .with(formatting_layer)
            .try_init()
            .map_err(|e| Error::internal(format!("Failed to initialize tracing: {}", e)))?;
    } else {
        let formatting_layer = fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::NONE);

        Registry::default()
            .with(env_filter)
            .with(formatting_layer)
            .try_init()
            .map_err(|e| Error::internal(format!("Failed to initialize tracing: {}", e)))?;
    }

    tracing::info!(
        environment = %service.environment,
        log_level = %service.log_level,
        "Logging initialized"
    );

    Ok(())
}

/// Create a span for Kafka message processing
#[macro_export]
macro_rules! kafka_span {
    ($pipeline:expr, $message:expr) => {
        tracing::info_span!(
            "kafka_message",
            pipeline = %$pipeline,
            topic = %$message.topic,
            partition = $message.partition,
            offset = $message.offset,
            entity = tracing::field::Empty,
        )
    };
}

/// Log an error with context
#[macro_export]
macro_rules! log_error {
    ($error:expr, $msg:expr) => {
        tracing::error!(
            error = %$error,
            error_kind = $error.kind(),
            $msg
        )
    };
    ($error:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::error!(
            error = %$error,
            error_kind = $error.kind(),
            $($key = tracing::field::display(&$value),)*
            $msg
        )
    };
}

/// Helper for timing operations
pub struct Timer {
    start: std::time::Instant,
    operation: String,
}

impl Timer {
    /// Start a new timer
    pub fn start(operation: impl Into<String>) -> Self {
        Timer {
            start: std::time::Instant::now(),
            operation: operation.into(),
        }
    }

    /// Stop the timer and log the duration
    pub fn stop(self) -> std::time::Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::start("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_log_error_macro_accepts_context() {
        let err = Error::decode("unexpected token");
        log_error!(err, "Failed to decode", topic = "shark.account", offset = 7);
    }
}
