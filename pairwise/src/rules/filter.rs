use super::records::{ItemId, TransactionId, TransactionItem};
use std::collections::{HashMap, HashSet};

/// Keeps records whose item qualifies. Relative order is preserved, so
/// grouped input stays grouped.
pub fn filter_items(records: &[TransactionItem], qualifying: &HashSet<ItemId>) -> Vec<TransactionItem> {
    records
        .iter()
        .filter(|record| qualifying.contains(&record.item_id))
        .copied()
        .collect()
}

/// Item count per transaction.
pub fn transaction_sizes(records: &[TransactionItem]) -> HashMap<TransactionId, usize> {
    let mut sizes = HashMap::new();
    for record in records {
        *sizes.entry(record.transaction_id).or_insert(0) += 1;
    }
    sizes
}

/// Transactions holding at least `min_items` records.
pub fn qualifying_transactions(
    sizes: &HashMap<TransactionId, usize>,
    min_items: usize,
) -> HashSet<TransactionId> {
    sizes
        .iter()
        .filter(|&(_, &size)| size >= min_items)
        .map(|(&transaction, _)| transaction)
        .collect()
}

/// Drops transactions that cannot form a pair. Run after item pruning, since
/// removing items can shrink a transaction below two.
pub fn filter_transaction_size(records: &[TransactionItem]) -> (Vec<TransactionItem>, usize) {
    let sizes = transaction_sizes(records);
    let qualifying = qualifying_transactions(&sizes, 2);
    let kept = records
        .iter()
        .filter(|record| qualifying.contains(&record.transaction_id))
        .copied()
        .collect();
    (kept, qualifying.len())
}
