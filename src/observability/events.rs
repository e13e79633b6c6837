//! Observable events emitted by the query engine
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in hoopql
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Engine configuration loaded from disk
    ConfigLoaded,
    /// A division baseline was built and cached
    BaselineBuilt,
    /// A rank/percentile was requested for a year with no baseline
    BaselineUnavailable,
    /// An injected extra filter failed and the query is re-evaluated without it
    QueryRetryWithoutExtras,
}

impl Event {
    /// Returns the event name as it appears in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::BaselineBuilt => "BASELINE_BUILT",
            Event::BaselineUnavailable => "BASELINE_UNAVAILABLE",
            Event::QueryRetryWithoutExtras => "QUERY_RETRY_WITHOUT_EXTRAS",
        }
    }

    /// Returns true if the event signals degraded (but not failed) output
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Event::BaselineUnavailable | Event::QueryRetryWithoutExtras
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::ConfigLoaded.as_str(), "CONFIG_LOADED");
        assert_eq!(Event::BaselineBuilt.as_str(), "BASELINE_BUILT");
        assert_eq!(Event::BaselineUnavailable.as_str(), "BASELINE_UNAVAILABLE");
        assert_eq!(
            Event::QueryRetryWithoutExtras.to_string(),
            "QUERY_RETRY_WITHOUT_EXTRAS"
        );
    }

    #[test]
    fn test_degraded_events() {
        assert!(Event::BaselineUnavailable.is_degraded());
        assert!(Event::QueryRetryWithoutExtras.is_degraded());
        assert!(!Event::BaselineBuilt.is_degraded());
    }
}
