use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::super::counter::FrequencyTable;
use super::super::engine::{MiningOutcome, MiningSummary};
use super::super::filter::qualifying_transactions;
use super::super::memory::MemoryBudget;
use super::super::pairs::{ItemPair, PairStream};
use super::super::records::{GroupingGuard, ItemId, TransactionId, TransactionItem};
use super::super::rule::{compute_rules, RuleTable};
use super::super::stats::{support_percent, ItemStats};
use crate::config::{DuplicatePolicy, InputOrder, MinerConfig, SupportBase};
use crate::error::{ConfigError, MiningError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingPhase {
    Counting,
    Sizing,
    Pairing,
    Finished,
    /// A pass returned an error; the partial counts cannot be finished.
    Failed,
}

/// Grouping check and per-transaction de-duplication for one pass. Survives
/// chunk boundaries.
#[derive(Debug, Default)]
struct PassCursor {
    guard: GroupingGuard,
    seen: HashSet<ItemId>,
    dedupe: bool,
}

impl PassCursor {
    fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            ..Self::default()
        }
    }

    /// `None` for a duplicate to skip, otherwise whether the record opens a
    /// new transaction.
    fn accept(&mut self, record: &TransactionItem) -> Result<Option<bool>> {
        let new_group = self.guard.observe(record.transaction_id)?;
        if !self.dedupe {
            return Ok(Some(new_group));
        }
        if new_group {
            self.seen.clear();
        }
        Ok(self.seen.insert(record.item_id).then_some(new_group))
    }
}

/// Pair miner fed in chunks over three passes of the same input.
///
/// Holds item counts, per-transaction sizes, the open transaction's items
/// and the pair table, never the records themselves. A transaction may span
/// chunks but must be contiguous across the whole stream, so only
/// `InputOrder::Grouped` is accepted.
pub struct StreamingMiner {
    config: MinerConfig,
    pub(crate) phase: StreamingPhase,
    cursor: PassCursor,
    item_counts: FrequencyTable<ItemId>,
    num_transactions: usize,
    input_stats: Option<ItemStats>,
    qualifying_items: HashSet<ItemId>,
    sizes: HashMap<TransactionId, usize>,
    qualifying_transactions: HashSet<TransactionId>,
    pruned_item_counts: FrequencyTable<ItemId>,
    pair_counts: FrequencyTable<ItemPair>,
    open: Option<(TransactionId, Vec<ItemId>)>,
    budget: MemoryBudget,
    summary: MiningSummary,
}

impl StreamingMiner {
    pub fn new(config: MinerConfig) -> Result<Self> {
        config.validate()?;
        if config.input_order == InputOrder::Unsorted {
            return Err(ConfigError::InvalidValue {
                field: "input_order",
                reason: "chunked passes cannot regroup unsorted records".to_string(),
            }
            .into());
        }
        let dedupe = config.duplicates == DuplicatePolicy::Dedupe;
        let budget = MemoryBudget::from_limit(config.pair_memory_limit);
        Ok(Self {
            config,
            phase: StreamingPhase::Counting,
            cursor: PassCursor::new(dedupe),
            item_counts: FrequencyTable::new(),
            num_transactions: 0,
            input_stats: None,
            qualifying_items: HashSet::new(),
            sizes: HashMap::new(),
            qualifying_transactions: HashSet::new(),
            pruned_item_counts: FrequencyTable::new(),
            pair_counts: FrequencyTable::new(),
            open: None,
            budget,
            summary: MiningSummary::default(),
        })
    }

    pub fn phase(&self) -> StreamingPhase {
        self.phase
    }

    pub fn summary(&self) -> &MiningSummary {
        &self.summary
    }

    fn expect_phase(&self, expected: StreamingPhase, operation: &'static str) -> Result<()> {
        if self.phase != expected {
            return Err(MiningError::PhaseOrder {
                operation,
                phase: format!("{:?}", self.phase),
            });
        }
        Ok(())
    }

    /// Runs `pass` in `expected`. Any error moves the miner to
    /// `StreamingPhase::Failed`.
    fn run_pass<T>(
        &mut self,
        expected: StreamingPhase,
        operation: &'static str,
        pass: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.expect_phase(expected, operation)?;
        let result = pass(self);
        if let Err(err) = &result {
            warn!(operation, error = %err, "streaming pass failed");
            self.phase = StreamingPhase::Failed;
            self.open = None;
        }
        result
    }

    fn next_pass(&mut self, phase: StreamingPhase) {
        self.cursor = PassCursor::new(self.config.duplicates == DuplicatePolicy::Dedupe);
        self.phase = phase;
    }

    /// First pass: item counts over the raw input.
    pub fn count_chunk(&mut self, chunk: &[TransactionItem]) -> Result<()> {
        self.run_pass(StreamingPhase::Counting, "count", |miner| {
            for record in chunk {
                miner.summary.input_records += 1;
                let Some(new_group) = miner.cursor.accept(record)? else {
                    continue;
                };
                if new_group {
                    miner.num_transactions += 1;
                }
                miner.item_counts.add(record.item_id);
            }
            Ok(())
        })
    }

    pub fn finalize_counts(&mut self) -> Result<()> {
        self.run_pass(StreamingPhase::Counting, "finalize counts", |miner| {
            let counts = std::mem::take(&mut miner.item_counts);
            let stats = ItemStats::from_counts(counts, miner.num_transactions)?;
            miner.qualifying_items = stats.qualifying_items(miner.config.min_support);
            miner.summary.distinct_transactions = miner.num_transactions;
            miner.summary.qualifying_items = miner.qualifying_items.len();
            info!(
                transactions = miner.num_transactions,
                qualifying = miner.qualifying_items.len(),
                "finalized item counts"
            );

            miner.input_stats = Some(stats);
            miner.next_pass(StreamingPhase::Sizing);
            Ok(())
        })
    }

    /// Second pass: qualifying item count per transaction.
    pub fn size_chunk(&mut self, chunk: &[TransactionItem]) -> Result<()> {
        self.run_pass(StreamingPhase::Sizing, "size transactions", |miner| {
            for record in chunk {
                if miner.cursor.accept(record)?.is_none() {
                    continue;
                }
                if miner.qualifying_items.contains(&record.item_id) {
                    *miner.sizes.entry(record.transaction_id).or_insert(0) += 1;
                    miner.summary.item_pruned_records += 1;
                }
            }
            Ok(())
        })
    }

    pub fn finalize_sizing(&mut self) -> Result<()> {
        self.run_pass(StreamingPhase::Sizing, "finalize sizing", |miner| {
            let sizes = std::mem::take(&mut miner.sizes);
            miner.qualifying_transactions = qualifying_transactions(&sizes, 2);
            miner.summary.qualifying_transactions = miner.qualifying_transactions.len();
            miner.summary.size_pruned_records = miner
                .qualifying_transactions
                .iter()
                .map(|transaction| sizes[transaction])
                .sum();
            info!(
                transactions = miner.summary.qualifying_transactions,
                records = miner.summary.size_pruned_records,
                "finalized transaction sizes"
            );

            miner.next_pass(StreamingPhase::Pairing);
            Ok(())
        })
    }

    /// Third pass: pruned item counts and pair counts.
    pub fn pair_chunk(&mut self, chunk: &[TransactionItem]) -> Result<()> {
        self.run_pass(StreamingPhase::Pairing, "count pairs", |miner| {
            for record in chunk {
                if miner.cursor.accept(record)?.is_none() {
                    continue;
                }
                if !miner.qualifying_items.contains(&record.item_id)
                    || !miner.qualifying_transactions.contains(&record.transaction_id)
                {
                    continue;
                }

                miner.pruned_item_counts.add(record.item_id);
                let continues = matches!(
                    &miner.open,
                    Some((transaction, _)) if *transaction == record.transaction_id
                );
                if continues {
                    if let Some((_, items)) = miner.open.as_mut() {
                        items.push(record.item_id);
                    }
                } else {
                    miner.flush_open()?;
                    miner.open = Some((record.transaction_id, vec![record.item_id]));
                }
            }
            Ok(())
        })
    }

    fn flush_open(&mut self) -> Result<()> {
        let Some((transaction, items)) = self.open.take() else {
            return Ok(());
        };

        let records = items
            .into_iter()
            .map(|item| TransactionItem::new(transaction, item));
        for pair in PairStream::new(records) {
            self.summary.raw_pairs += 1;
            if self.pair_counts.add(pair) {
                self.budget.allocate(MemoryBudget::PAIR_ENTRY_BYTES)?;
            }
        }
        Ok(())
    }

    /// Prunes pairs, joins item statistics and ranks the rules.
    pub fn finish(&mut self) -> Result<MiningOutcome> {
        self.run_pass(StreamingPhase::Pairing, "finish", |miner| {
            miner.flush_open()?;

            let pruned_counts = std::mem::take(&mut miner.pruned_item_counts);
            let pruned_stats = ItemStats::from_counts(pruned_counts, miner.qualifying_transactions.len())?;

            let (stats, denominator) = match miner.config.support_base {
                SupportBase::Pruned => (Some(&pruned_stats), miner.summary.qualifying_transactions),
                SupportBase::Input => (miner.input_stats.as_ref(), miner.summary.distinct_transactions),
            };
            let Some(stats) = stats else {
                return Err(MiningError::PhaseOrder {
                    operation: "finish",
                    phase: "missing item statistics".to_string(),
                });
            };
            if denominator == 0 && !miner.pair_counts.is_empty() {
                return Err(MiningError::ZeroTransactions {
                    stage: "pair support",
                });
            }

            let min_support = miner.config.min_support;
            let pair_counts = std::mem::take(&mut miner.pair_counts);
            miner.summary.distinct_pairs = pair_counts.len();
            let surviving: Vec<(ItemPair, usize, f64)> = pair_counts
                .into_iter()
                .filter_map(|(pair, freq)| {
                    let support = support_percent(freq, denominator);
                    (support >= min_support).then_some((pair, freq, support))
                })
                .collect();
            miner.summary.surviving_pairs = surviving.len();

            let rules = RuleTable::ranked(compute_rules(surviving, stats));
            debug!(rules = rules.len(), raw_pairs = miner.summary.raw_pairs, "finished streaming run");

            miner.phase = StreamingPhase::Finished;
            Ok(MiningOutcome {
                rules,
                summary: miner.summary.clone(),
            })
        })
    }
}
