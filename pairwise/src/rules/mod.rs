pub mod counter;
pub mod engine;
pub mod filter;
pub mod memory;
pub mod pairs;
pub mod parallel;
pub mod records;
pub mod rule;
pub mod stats;
pub mod streaming;


pub use counter::{count_items, count_pairs, count_pairs_within, FrequencyTable};
pub use engine::{mine_rules, mine_rules_from_array, AssociationRuleEngine, MiningOutcome, MiningSummary, Phase};
pub use filter::{filter_items, filter_transaction_size};
pub use memory::MemoryBudget;
pub use pairs::{pairs_of, ItemPair, PairStream};
pub use parallel::count_pairs_parallel;
pub use records::{ItemId, TransactionId, TransactionItem};
pub use rule::{AssociationRule, RuleTable};
pub use stats::{ItemStats, ItemStatsEntry};
pub use streaming::{mine_from_chunks, StreamingMiner, StreamingPhase};
