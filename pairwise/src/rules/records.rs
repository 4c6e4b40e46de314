use crate::error::{MiningError, Result};
use ndarray::ArrayView2;
use std::collections::HashSet;

pub type TransactionId = i64;
pub type ItemId = i64;

/// One (transaction, item) row of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionItem {
    pub transaction_id: TransactionId,
    pub item_id: ItemId,
}

impl TransactionItem {
    pub fn new(transaction_id: TransactionId, item_id: ItemId) -> Self {
        Self {
            transaction_id,
            item_id,
        }
    }
}

impl From<(TransactionId, ItemId)> for TransactionItem {
    fn from((transaction_id, item_id): (TransactionId, ItemId)) -> Self {
        Self::new(transaction_id, item_id)
    }
}

/// Tracks transaction ids already closed so a reappearing id is caught.
///
/// Memory is O(transactions).
#[derive(Debug, Default)]
pub struct GroupingGuard {
    current: Option<TransactionId>,
    closed: HashSet<TransactionId>,
    position: usize,
}

impl GroupingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `transaction_id` starts a new group.
    pub fn observe(&mut self, transaction_id: TransactionId) -> Result<bool> {
        let position = self.position;
        self.position += 1;

        match self.current {
            Some(current) if current == transaction_id => Ok(false),
            previous => {
                if self.closed.contains(&transaction_id) {
                    return Err(MiningError::ContractViolation {
                        transaction_id,
                        position,
                    });
                }
                if let Some(previous) = previous {
                    self.closed.insert(previous);
                }
                self.current = Some(transaction_id);
                Ok(true)
            }
        }
    }

    pub fn groups_seen(&self) -> usize {
        self.closed.len() + usize::from(self.current.is_some())
    }
}

/// Verifies records of each transaction are contiguous.
pub fn check_grouped(records: &[TransactionItem]) -> Result<()> {
    let mut guard = GroupingGuard::new();
    for record in records {
        guard.observe(record.transaction_id)?;
    }
    Ok(())
}

/// Groups records by transaction id. The sort is stable, so items keep their
/// order of appearance inside each transaction.
pub fn group_by_transaction(mut records: Vec<TransactionItem>) -> Vec<TransactionItem> {
    records.sort_by_key(|record| record.transaction_id);
    records
}

/// Drops repeated items within a transaction, keeping the first occurrence.
/// Input must be grouped.
pub fn dedupe_within_transactions(records: Vec<TransactionItem>) -> Vec<TransactionItem> {
    let mut seen: HashSet<ItemId> = HashSet::new();
    let mut current: Option<TransactionId> = None;

    let mut deduped = Vec::with_capacity(records.len());
    for record in records {
        if current != Some(record.transaction_id) {
            current = Some(record.transaction_id);
            seen.clear();
        }
        if seen.insert(record.item_id) {
            deduped.push(record);
        }
    }
    deduped
}

/// Number of distinct transactions in grouped records.
pub fn count_transactions(records: &[TransactionItem]) -> usize {
    TransactionGroups::new(records).count()
}

/// Iterates contiguous runs of records sharing a transaction id.
pub struct TransactionGroups<'a> {
    records: &'a [TransactionItem],
}

impl<'a> TransactionGroups<'a> {
    pub fn new(records: &'a [TransactionItem]) -> Self {
        Self { records }
    }
}

impl<'a> Iterator for TransactionGroups<'a> {
    type Item = &'a [TransactionItem];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.records.first()?;
        let len = self
            .records
            .iter()
            .position(|record| record.transaction_id != first.transaction_id)
            .unwrap_or(self.records.len());

        let (group, rest) = self.records.split_at(len);
        self.records = rest;
        Some(group)
    }
}

/// Reads an n×2 matrix whose columns are (transaction_id, item_id).
pub fn records_from_array(array: ArrayView2<i64>) -> Result<Vec<TransactionItem>> {
    let shape = array.shape();
    if shape[1] != 2 {
        return Err(MiningError::MalformedInput(format!(
            "expected 2 columns (transaction_id, item_id), got {}",
            shape[1]
        )));
    }

    Ok(array
        .rows()
        .into_iter()
        .map(|row| TransactionItem::new(row[0], row[1]))
        .collect())
}
