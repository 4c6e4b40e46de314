use super::counter::{count_items, FrequencyTable};
use super::records::{count_transactions, ItemId, TransactionItem};
use crate::error::{MiningError, Result};
use std::collections::{HashMap, HashSet};

/// Support of `frequency` occurrences among `total` transactions, in percent.
pub fn support_percent(frequency: usize, total: usize) -> f64 {
    frequency as f64 * 100.0 / total as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStatsEntry {
    pub frequency: usize,
    pub support: f64,
}

/// Per-item frequency and support for one population of transactions.
///
/// Built once per pass and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ItemStats {
    entries: HashMap<ItemId, ItemStatsEntry>,
    num_transactions: usize,
}

impl ItemStats {
    pub fn from_counts(counts: FrequencyTable<ItemId>, num_transactions: usize) -> Result<Self> {
        Self::build(counts, num_transactions, "item statistics")
    }

    /// Counts items over grouped records and derives their support.
    pub fn from_records(records: &[TransactionItem], stage: &'static str) -> Result<Self> {
        let counts = count_items(records.iter().map(|record| record.item_id));
        Self::build(counts, count_transactions(records), stage)
    }

    fn build(
        counts: FrequencyTable<ItemId>,
        num_transactions: usize,
        stage: &'static str,
    ) -> Result<Self> {
        if num_transactions == 0 && !counts.is_empty() {
            return Err(MiningError::ZeroTransactions { stage });
        }

        let entries = counts
            .into_iter()
            .map(|(item, frequency)| {
                let support = support_percent(frequency, num_transactions);
                (item, ItemStatsEntry { frequency, support })
            })
            .collect();

        Ok(Self {
            entries,
            num_transactions,
        })
    }

    pub fn get(&self, item: ItemId) -> Option<&ItemStatsEntry> {
        self.entries.get(&item)
    }

    pub fn num_transactions(&self) -> usize {
        self.num_transactions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &ItemStatsEntry)> + '_ {
        self.entries.iter().map(|(&item, entry)| (item, entry))
    }

    /// Items whose support reaches `min_support`.
    pub fn qualifying_items(&self, min_support: f64) -> HashSet<ItemId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.support >= min_support)
            .map(|(&item, _)| item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_is_a_percentage_of_transactions() {
        let stats = ItemStats::from_counts(count_items(vec![1, 1, 1, 2]), 4).unwrap();
        let entry = stats.get(1).unwrap();
        assert_eq!(entry.frequency, 3);
        assert_eq!(entry.support, 75.0);
        assert_eq!(stats.get(2).unwrap().support, 25.0);
        assert!(stats.get(3).is_none());
    }

    #[test]
    fn zero_transactions_is_an_error() {
        let err = ItemStats::from_counts(count_items(vec![1]), 0).unwrap_err();
        assert!(matches!(err, MiningError::ZeroTransactions { .. }));
    }

    #[test]
    fn empty_population_gives_empty_stats() {
        let stats = ItemStats::from_records(&[], "test").unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.num_transactions(), 0);
        assert!(stats.qualifying_items(1.0).is_empty());
    }

    #[test]
    fn qualifying_items_include_the_threshold() {
        let stats = ItemStats::from_counts(count_items(vec![1, 1, 1, 2, 2, 3]), 5).unwrap();
        let qualifying = stats.qualifying_items(40.0);
        assert!(qualifying.contains(&1));
        assert!(qualifying.contains(&2));
        assert!(!qualifying.contains(&3));
    }
}
