//! HTTP server for booking platform authentication.
//!
//! Exposes the account operations of [`booking_auth`] as JSON endpoints and
//! carries the process concerns around them: configuration, structured
//! logging and Prometheus metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
