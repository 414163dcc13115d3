//! Configuration types for layered storage and its logging.

use serde::{Deserialize, Serialize};

/// Behaviour switches for a [`LayeredStorage`](crate::LayeredStorage).
///
/// Defaults give full cache-aside behaviour: reads backfill upper layers and
/// lower-layer changes are replayed upward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeredConfig {
    /// Label attached to log events emitted by this composite.
    pub name: String,
    /// Whether `get` and `get_all` populate layers that missed an entry.
    pub bubble_up_reads: bool,
    /// Whether change events from each layer are replayed on the layer above.
    pub propagate_events: bool,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self {
            name: "layered".to_string(),
            bubble_up_reads: true,
            propagate_events: true,
        }
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration consumed by [`telemetry::try_init`](crate::telemetry::try_init).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"strata_layered=debug"`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layered_config_defaults() {
        let config = LayeredConfig::default();
        assert_eq!(config.name, "layered");
        assert!(config.bubble_up_reads);
        assert!(config.propagate_events);
    }

    #[test]
    fn log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LayeredConfig =
            serde_json::from_str(r#"{ "name": "users", "propagate_events": false }"#).unwrap();
        assert_eq!(config.name, "users");
        assert!(config.bubble_up_reads);
        assert!(!config.propagate_events);

        let log: LogConfig = serde_json::from_str(r#"{ "format": "json" }"#).unwrap();
        assert_eq!(log.filter, "info");
        assert_eq!(log.format, LogFormat::Json);
    }
}
