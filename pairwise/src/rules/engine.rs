use super::counter::{count_pairs_within, FrequencyTable};
use super::filter::{filter_items, filter_transaction_size};
use super::memory::MemoryBudget;
use super::pairs::{pairs_of, ItemPair};
use super::parallel::count_pairs_parallel;
use super::records::{
    check_grouped, dedupe_within_transactions, group_by_transaction, records_from_array, ItemId,
    TransactionItem,
};
use super::rule::{compute_rules, AssociationRule, RuleTable};
use super::stats::{support_percent, ItemStats};
use crate::config::{DuplicatePolicy, InputOrder, MinerConfig, SupportBase};
use crate::error::{MiningError, Result};
use ndarray::ArrayView2;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Stages of one mining run, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Raw,
    ItemStats,
    ItemPruned,
    SizePruned,
    PrunedStats,
    PairCounted,
    PairPruned,
    RulesComputed,
    Ranked,
    /// A stage returned an error; no further stage may run.
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Record, item, transaction and pair counts after each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiningSummary {
    pub input_records: usize,
    pub distinct_transactions: usize,
    pub qualifying_items: usize,
    pub item_pruned_records: usize,
    pub qualifying_transactions: usize,
    pub size_pruned_records: usize,
    pub raw_pairs: usize,
    pub distinct_pairs: usize,
    pub surviving_pairs: usize,
}

#[derive(Debug, Clone)]
pub struct MiningOutcome {
    pub rules: RuleTable,
    pub summary: MiningSummary,
}

/// Two-pass pairwise association rule miner.
///
/// Items below the support threshold are pruned first, then transactions left
/// with fewer than two items, and only then are pairs generated and counted.
/// Every step checks that the previous one has run.
pub struct AssociationRuleEngine {
    config: MinerConfig,
    phase: Phase,
    records: Vec<TransactionItem>,
    input_stats: Option<ItemStats>,
    qualifying_items: HashSet<ItemId>,
    pruned_stats: Option<ItemStats>,
    pair_counts: FrequencyTable<ItemPair>,
    surviving_pairs: Vec<(ItemPair, usize, f64)>,
    rules: Vec<AssociationRule>,
    summary: MiningSummary,
}

impl AssociationRuleEngine {
    pub fn new(config: MinerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phase: Phase::Idle,
            records: Vec::new(),
            input_stats: None,
            qualifying_items: HashSet::new(),
            pruned_stats: None,
            pair_counts: FrequencyTable::new(),
            surviving_pairs: Vec::new(),
            rules: Vec::new(),
            summary: MiningSummary::default(),
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn summary(&self) -> &MiningSummary {
        &self.summary
    }

    pub fn input_stats(&self) -> Option<&ItemStats> {
        self.input_stats.as_ref()
    }

    pub fn pruned_stats(&self) -> Option<&ItemStats> {
        self.pruned_stats.as_ref()
    }

    pub fn qualifying_items(&self) -> &HashSet<ItemId> {
        &self.qualifying_items
    }

    /// Runs every stage over `records` and returns the ranked rules.
    pub fn run<I>(mut self, records: I) -> Result<MiningOutcome>
    where
        I: IntoIterator<Item = TransactionItem>,
    {
        self.ingest(records)?;
        self.compute_item_stats()?;
        self.prune_items()?;
        self.prune_transaction_sizes()?;
        self.recompute_item_stats()?;
        self.count_pairs()?;
        self.prune_pairs()?;
        self.compute_rules()?;
        let rules = self.rank()?;
        Ok(MiningOutcome {
            rules,
            summary: self.summary,
        })
    }

    /// Runs one stage from `expected`. Success moves to `next`; an error
    /// leaves the engine in `Phase::Failed`, which refuses every later stage.
    fn step<T>(
        &mut self,
        expected: Phase,
        next: Phase,
        operation: &'static str,
        stage: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.phase != expected {
            return Err(MiningError::PhaseOrder {
                operation,
                phase: self.phase.to_string(),
            });
        }
        match stage(self) {
            Ok(value) => {
                self.phase = next;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "stage failed");
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    pub fn ingest<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = TransactionItem>,
    {
        self.step(Phase::Idle, Phase::Raw, "ingest records", |engine| {
            let mut records: Vec<TransactionItem> = records.into_iter().collect();
            engine.summary.input_records = records.len();
            info!(records = records.len(), "starting transaction items");

            records = match engine.config.input_order {
                InputOrder::Grouped => {
                    check_grouped(&records)?;
                    records
                }
                InputOrder::Unsorted => group_by_transaction(records),
            };

            if engine.config.duplicates == DuplicatePolicy::Dedupe {
                let before = records.len();
                records = dedupe_within_transactions(records);
                if records.len() != before {
                    debug!(dropped = before - records.len(), "dropped duplicate items within transactions");
                }
            }

            engine.records = records;
            Ok(())
        })
    }

    pub fn compute_item_stats(&mut self) -> Result<()> {
        self.step(Phase::Raw, Phase::ItemStats, "compute item statistics", |engine| {
            let stats = ItemStats::from_records(&engine.records, "input item statistics")?;
            let min_support = engine.config.min_support;
            engine.qualifying_items = stats.qualifying_items(min_support);
            engine.summary.distinct_transactions = stats.num_transactions();
            engine.summary.qualifying_items = engine.qualifying_items.len();

            info!(
                min_support,
                items = stats.len(),
                qualifying = engine.qualifying_items.len(),
                "items with support at or above threshold"
            );
            if engine.qualifying_items.is_empty() {
                warn!(min_support, "no item reaches the support threshold");
            }

            engine.input_stats = Some(stats);
            Ok(())
        })
    }

    pub fn prune_items(&mut self) -> Result<()> {
        self.step(Phase::ItemStats, Phase::ItemPruned, "prune items", |engine| {
            engine.records = filter_items(&engine.records, &engine.qualifying_items);
            engine.summary.item_pruned_records = engine.records.len();
            info!(records = engine.records.len(), "remaining transaction items after item pruning");
            Ok(())
        })
    }

    pub fn prune_transaction_sizes(&mut self) -> Result<()> {
        self.step(Phase::ItemPruned, Phase::SizePruned, "prune transactions", |engine| {
            let (records, qualifying) = filter_transaction_size(&engine.records);
            engine.records = records;
            engine.summary.qualifying_transactions = qualifying;
            engine.summary.size_pruned_records = engine.records.len();
            info!(
                transactions = qualifying,
                records = engine.records.len(),
                "remaining transactions with 2+ items"
            );
            Ok(())
        })
    }

    pub fn recompute_item_stats(&mut self) -> Result<()> {
        self.step(Phase::SizePruned, Phase::PrunedStats, "recompute item statistics", |engine| {
            let stats = ItemStats::from_records(&engine.records, "pruned item statistics")?;
            debug!(
                items = stats.len(),
                transactions = stats.num_transactions(),
                "recomputed item statistics"
            );
            engine.pruned_stats = Some(stats);
            Ok(())
        })
    }

    pub fn count_pairs(&mut self) -> Result<()> {
        self.step(Phase::PrunedStats, Phase::PairCounted, "count pairs", |engine| {
            let budget = MemoryBudget::from_limit(engine.config.pair_memory_limit);
            engine.pair_counts = if engine.config.parallel {
                count_pairs_parallel(&engine.records, &budget)?
            } else {
                count_pairs_within(pairs_of(&engine.records), &budget)?
            };
            // Pair generation is the last reader of the pruned records.
            engine.records = Vec::new();

            engine.summary.raw_pairs = engine.pair_counts.total();
            engine.summary.distinct_pairs = engine.pair_counts.len();
            info!(
                raw_pairs = engine.summary.raw_pairs,
                distinct_pairs = engine.summary.distinct_pairs,
                "counted item pairs"
            );
            Ok(())
        })
    }

    fn pair_denominator(&self) -> usize {
        match self.config.support_base {
            SupportBase::Pruned => self.summary.qualifying_transactions,
            SupportBase::Input => self.summary.distinct_transactions,
        }
    }

    pub fn prune_pairs(&mut self) -> Result<()> {
        self.step(Phase::PairCounted, Phase::PairPruned, "prune pairs", |engine| {
            let denominator = engine.pair_denominator();
            if denominator == 0 && !engine.pair_counts.is_empty() {
                return Err(MiningError::ZeroTransactions {
                    stage: "pair support",
                });
            }

            let min_support = engine.config.min_support;
            let counts = std::mem::take(&mut engine.pair_counts);
            engine.surviving_pairs = counts
                .into_iter()
                .filter_map(|(pair, freq)| {
                    let support = support_percent(freq, denominator);
                    (support >= min_support).then_some((pair, freq, support))
                })
                .collect();

            engine.summary.surviving_pairs = engine.surviving_pairs.len();
            info!(pairs = engine.surviving_pairs.len(), "item pairs with support at or above threshold");
            if engine.surviving_pairs.is_empty() {
                warn!(min_support, "no item pair reaches the support threshold");
            }
            Ok(())
        })
    }

    pub fn compute_rules(&mut self) -> Result<()> {
        self.step(Phase::PairPruned, Phase::RulesComputed, "compute rules", |engine| {
            let stats = match engine.config.support_base {
                SupportBase::Pruned => engine.pruned_stats.as_ref(),
                SupportBase::Input => engine.input_stats.as_ref(),
            };
            let Some(stats) = stats else {
                return Err(MiningError::PhaseOrder {
                    operation: "compute rules",
                    phase: "missing item statistics".to_string(),
                });
            };

            engine.rules = compute_rules(std::mem::take(&mut engine.surviving_pairs), stats);
            Ok(())
        })
    }

    pub fn rank(&mut self) -> Result<RuleTable> {
        self.step(Phase::RulesComputed, Phase::Ranked, "rank rules", |engine| {
            let table = RuleTable::ranked(std::mem::take(&mut engine.rules));
            debug!(rules = table.len(), "ranked rules by lift");
            Ok(table)
        })
    }
}

/// Mines ranked pairwise rules from `records` under `config`.
pub fn mine_rules<I>(records: I, config: &MinerConfig) -> Result<MiningOutcome>
where
    I: IntoIterator<Item = TransactionItem>,
{
    AssociationRuleEngine::new(config.clone())?.run(records)
}

/// Like [`mine_rules`] for an n×2 (transaction_id, item_id) matrix.
pub fn mine_rules_from_array(records: ArrayView2<i64>, config: &MinerConfig) -> Result<MiningOutcome> {
    mine_rules(records_from_array(records)?, config)
}
