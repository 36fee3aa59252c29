//! Structured logging configuration.
//!
//! `tracing` records from the server and `log` records from `booking_auth`
//! land in the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
/// Installing the registry also installs the `log` bridge, so the library's
/// `log::info!` calls are formatted alongside the server's own events.
///
/// # Example
///
/// ```no_run
/// use booking_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Optional user ID
/// * `request_id` - Correlation ID of the triggering request
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use booking_server::logging::log_security_event;
///
/// log_security_event(
///     "account_locked",
///     None,
///     Some("3f1c0d1e-8a4b-4f3e-9d7a-0c2b9e6f1a55"),
///     "Login rejected for locked account"
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<i64>,
    request_id: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        request_id = request_id,
        "SECURITY: {}",
        message
    );
}
