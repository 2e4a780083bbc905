//! # Metrics Collection
//!
//! Prometheus metrics for the secret lifecycle. Recording goes through the
//! `metrics` facade, so calls are no-ops until [`init_metrics`] installs the
//! exporter.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// Metrics recorder for refresh, drift and timer activity
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record the outcome of one refresh cycle
    pub fn record_secret_refresh(&self, trigger: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let labels = [("trigger", trigger.to_string()), ("status", status.to_string())];
        counter!("secret_refresh_total", &labels).increment(1);
    }

    /// Record a rotation found by the drift poller
    pub fn record_drift_detected(&self) {
        counter!("secret_drift_detected_total").increment(1);
    }

    /// Record a failed drift poll tick
    pub fn record_poll_error(&self, kind: &str) {
        let labels = [("kind", kind.to_string())];
        counter!("secret_poll_errors_total", &labels).increment(1);
    }

    /// Record a timer arm, and the cancellation of the timer it replaced
    pub fn record_refresh_timer_armed(&self, delay: Duration, reason: &str, replaced: bool) {
        let labels = [("reason", reason.to_string())];
        counter!("secret_refresh_timer_armed_total", &labels).increment(1);
        gauge!("secret_refresh_next_delay_seconds").set(delay.as_secs_f64());
        if replaced {
            counter!("secret_refresh_timer_cancelled_total").increment(1);
        }
    }

    /// Update the last successful refresh gauge (unix seconds)
    pub fn set_last_refresh_timestamp(&self, unix_seconds: i64) {
        gauge!("secret_last_refresh_timestamp_seconds").set(unix_seconds as f64);
    }

    /// Register descriptions for the secret lifecycle metrics
    pub fn register_secret_metrics(&self) {
        describe_counter!(
            "secret_refresh_total",
            Unit::Count,
            "Secret refresh cycles by trigger and outcome"
        );
        describe_counter!(
            "secret_drift_detected_total",
            Unit::Count,
            "Out-of-band rotations detected by the drift poller"
        );
        describe_counter!(
            "secret_poll_errors_total",
            Unit::Count,
            "Drift poll ticks that failed to read rotation metadata"
        );
        describe_counter!(
            "secret_refresh_timer_armed_total",
            Unit::Count,
            "Refresh timers armed"
        );
        describe_counter!(
            "secret_refresh_timer_cancelled_total",
            Unit::Count,
            "Armed refresh timers cancelled before firing"
        );
        describe_gauge!(
            "secret_refresh_next_delay_seconds",
            Unit::Seconds,
            "Delay of the currently armed refresh timer"
        );
        describe_gauge!(
            "secret_last_refresh_timestamp_seconds",
            Unit::Seconds,
            "Unix time of the last successful refresh"
        );
    }
}

/// Initialize the Prometheus exporter
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register_secret_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}
