pub mod config;
pub mod error;
pub mod rules;

#[cfg(feature = "python")]
mod python;

pub use config::{DuplicatePolicy, InputOrder, MinerConfig, SupportBase};
pub use error::{ConfigError, MiningError, Result};
pub use rules::{
    mine_from_chunks, mine_rules, mine_rules_from_array, AssociationRule, AssociationRuleEngine,
    ItemPair, MiningOutcome, MiningSummary, RuleTable, StreamingMiner, TransactionItem,
};
