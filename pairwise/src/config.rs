use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, MiningError, Result};

/// How the caller delivers records with respect to transaction grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrder {
    /// Records of one transaction are contiguous. Checked, not assumed.
    #[default]
    Grouped,
    /// The engine groups records itself with a stable sort by transaction id.
    Unsorted,
}

/// Treatment of a (transaction_id, item_id) record seen more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first occurrence of an item within its transaction.
    #[default]
    Dedupe,
    /// Count every record, so repeated items inflate item and pair counts.
    KeepMultiplicity,
}

/// Population that support percentages are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportBase {
    /// Item and pair supports use the item- and size-pruned population.
    #[default]
    Pruned,
    /// Item and pair supports use the raw input population.
    Input,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Minimum support as a percentage, e.g. `0.01` for 0.01%.
    pub min_support: f64,
    pub input_order: InputOrder,
    pub duplicates: DuplicatePolicy,
    pub support_base: SupportBase,
    /// Count pairs on the rayon pool, sharded by transaction.
    pub parallel: bool,
    /// Upper bound in bytes for the pair frequency table.
    pub pair_memory_limit: Option<usize>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            input_order: InputOrder::default(),
            duplicates: DuplicatePolicy::default(),
            support_base: SupportBase::default(),
            parallel: false,
            pair_memory_limit: None,
        }
    }
}

impl MinerConfig {
    pub fn new(min_support: f64) -> Result<Self> {
        let config = Self {
            min_support,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_input_order(mut self, order: InputOrder) -> Self {
        self.input_order = order;
        self
    }

    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_support_base(mut self, base: SupportBase) -> Self {
        self.support_base = base;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_pair_memory_limit(mut self, limit_bytes: usize) -> Self {
        self.pair_memory_limit = Some(limit_bytes);
        self
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MinerConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects thresholds that cannot select anything meaningful.
    pub fn validate(&self) -> Result<()> {
        if !self.min_support.is_finite() || self.min_support <= 0.0 {
            return Err(MiningError::InvalidMinSupport {
                value: self.min_support,
            });
        }
        if self.pair_memory_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "pair_memory_limit",
                reason: "must be greater than 0 when set".into(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_positive_threshold() {
        assert!(matches!(
            MinerConfig::new(0.0),
            Err(MiningError::InvalidMinSupport { .. })
        ));
        assert!(matches!(
            MinerConfig::new(-1.5),
            Err(MiningError::InvalidMinSupport { .. })
        ));
        assert!(matches!(
            MinerConfig::new(f64::NAN),
            Err(MiningError::InvalidMinSupport { .. })
        ));
        assert!(MinerConfig::new(0.01).is_ok());
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = MinerConfig::from_toml_str(
            r#"
            min_support = 0.5
            input_order = "unsorted"
            support_base = "input"
            "#,
        )
        .unwrap();

        assert_eq!(config.min_support, 0.5);
        assert_eq!(config.input_order, InputOrder::Unsorted);
        assert_eq!(config.duplicates, DuplicatePolicy::Dedupe);
        assert_eq!(config.support_base, SupportBase::Input);
        assert!(!config.parallel);
        assert_eq!(config.pair_memory_limit, None);
    }

    #[test]
    fn toml_threshold_is_validated() {
        let err = MinerConfig::from_toml_str("min_support = 0").unwrap_err();
        assert!(matches!(err, MiningError::InvalidMinSupport { .. }));

        let err = MinerConfig::from_toml_str("min_support = \"high\"").unwrap_err();
        assert!(matches!(err, MiningError::Config(ConfigError::Parse(_))));

        let err = MinerConfig::from_toml_str("min_support = 1.0\npair_memory_limit = 0").unwrap_err();
        assert!(matches!(
            err,
            MiningError::Config(ConfigError::InvalidValue { field: "pair_memory_limit", .. })
        ));
    }
}
