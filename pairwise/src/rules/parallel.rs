use super::counter::{count_pairs_within, FrequencyTable};
use super::memory::{estimate_pair_table_size, MemoryBudget};
use super::pairs::{pairs_of, ItemPair};
use super::records::TransactionItem;
use crate::error::Result;
use rayon::prelude::*;

/// Splits grouped records into roughly `shards` slices, never cutting a
/// transaction in two.
pub fn shard_by_transaction(records: &[TransactionItem], shards: usize) -> Vec<&[TransactionItem]> {
    if records.is_empty() {
        return Vec::new();
    }
    let target = records.len().div_ceil(shards.max(1));

    let mut result = Vec::with_capacity(shards);
    let mut start = 0;
    while start < records.len() {
        let mut end = (start + target).min(records.len());
        while end < records.len() && records[end].transaction_id == records[end - 1].transaction_id {
            end += 1;
        }
        result.push(&records[start..end]);
        start = end;
    }
    result
}

/// Counts pairs of grouped records on the rayon pool. Partial tables are
/// merged by key-wise summation, so the result equals sequential counting.
pub fn count_pairs_parallel(
    records: &[TransactionItem],
    budget: &MemoryBudget,
) -> Result<FrequencyTable<ItemPair>> {
    let shards = shard_by_transaction(records, rayon::current_num_threads() * 4);

    let partials = shards
        .par_iter()
        .map(|shard| count_pairs_within(pairs_of(shard), budget))
        .collect::<Result<Vec<_>>>()?;

    let charged = estimate_pair_table_size(partials.iter().map(FrequencyTable::len).sum());
    let merged = partials
        .into_par_iter()
        .reduce(FrequencyTable::new, FrequencyTable::merge);

    budget.deallocate(charged);
    budget.allocate(estimate_pair_table_size(merged.len()))?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::counter::count_pairs;

    fn records(rows: &[(i64, i64)]) -> Vec<TransactionItem> {
        rows.iter().copied().map(TransactionItem::from).collect()
    }

    #[test]
    fn shards_respect_transaction_boundaries() {
        let input = records(&[(1, 1), (1, 2), (1, 3), (2, 1), (3, 1), (3, 2)]);
        let shards = shard_by_transaction(&input, 4);

        let total: usize = shards.iter().map(|s| s.len()).sum();
        assert_eq!(total, input.len());
        for pair in shards.windows(2) {
            let last = pair[0].last().unwrap().transaction_id;
            let first = pair[1].first().unwrap().transaction_id;
            assert_ne!(last, first);
        }
        assert!(shard_by_transaction(&[], 4).is_empty());
    }

    #[test]
    fn parallel_counts_match_sequential() {
        let input: Vec<TransactionItem> = (0..500i64)
            .flat_map(|tx| (0..(tx % 7)).map(move |k| TransactionItem::new(tx, (tx * 3 + k) % 11)))
            .collect();
        let input = crate::rules::records::dedupe_within_transactions(input);

        let budget = MemoryBudget::unlimited();
        let parallel = count_pairs_parallel(&input, &budget).unwrap();
        let sequential = count_pairs(pairs_of(&input));

        assert_eq!(parallel, sequential);
        assert_eq!(budget.current_usage(), estimate_pair_table_size(sequential.len()));
    }
}
