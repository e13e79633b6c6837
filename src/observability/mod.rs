//! Observability for hoopql
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed engine events
//! - Scope-based begin/complete tracing of engine calls
//! - Atomic query counters
//!
//! Observability is read-only: it never changes what a query returns.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an engine event with fields. Degraded events log at WARN.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_degraded() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::BaselineBuilt, &[("year", "2023/24")]);
        log_event_with_fields(Event::BaselineUnavailable, &[("year", "2019/20")]);
    }
}
