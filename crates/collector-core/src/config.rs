//! Collector configuration, loaded from the environment with prefix
//! `BULK_DATA_COLLECTOR_` (matching the original's Viper-style env binding).
//!
//! Sink-specific credentials/endpoints (connection strings, broker URLs,
//! Dapr component names, ...) are opaque to the core and are loaded
//! separately by each sink binary's own config struct, which embeds
//! [`CollectorConfig`] alongside its own fields.

use serde::Deserialize;

const ENV_PREFIX: &str = "BULK_DATA_COLLECTOR";

fn default_partition_queue_limit() -> usize {
    1000
}

fn default_partition_producers_count() -> usize {
    1
}

/// Core tuning knobs every sink honors, independent of which downstream
/// system it forwards events to.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_partition_queue_limit")]
    pub partition_queue_limit: usize,
    #[serde(default = "default_partition_producers_count")]
    pub partition_producers_count: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            partition_queue_limit: default_partition_queue_limit(),
            partition_producers_count: default_partition_producers_count(),
        }
    }
}

impl CollectorConfig {
    /// Loads configuration from `BULK_DATA_COLLECTOR_*` environment
    /// variables, falling back to defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .set_default("partition_queue_limit", default_partition_queue_limit() as i64)?
            .set_default("partition_producers_count", default_partition_producers_count() as i64)?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CollectorConfig::default();
        assert_eq!(cfg.partition_queue_limit, 1000);
        assert_eq!(cfg.partition_producers_count, 1);
    }
}
