use super::records::{GroupingGuard, ItemId, TransactionId, TransactionItem};
use crate::error::{MiningError, Result};
use std::iter::Copied;
use std::slice;

/// Unordered item pair. The smaller id is stored first so every occurrence of
/// the same two items hashes to one key regardless of appearance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPair {
    first: ItemId,
    second: ItemId,
}

impl ItemPair {
    pub fn new(a: ItemId, b: ItemId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> ItemId {
        self.first
    }

    pub fn second(&self) -> ItemId {
        self.second
    }
}

/// Lazily yields every 2-combination of items within each transaction.
///
/// The source must deliver each transaction's records contiguously. Only the
/// current transaction's items are buffered; combinations come out in order
/// of appearance (`i < j`) before the next transaction is read. In checked
/// mode a transaction id that reappears after another one started ends the
/// stream, and [`PairStream::finish`] reports the violation.
pub struct PairStream<I: Iterator<Item = TransactionItem>> {
    source: I,
    pending: Option<TransactionItem>,
    items: Vec<ItemId>,
    current: Option<TransactionId>,
    i: usize,
    j: usize,
    guard: Option<GroupingGuard>,
    violation: Option<MiningError>,
    transactions: usize,
    emitted: usize,
}

impl<I: Iterator<Item = TransactionItem>> PairStream<I> {
    /// Trusts the source to be grouped.
    pub fn new(source: I) -> Self {
        Self {
            source,
            pending: None,
            items: Vec::new(),
            current: None,
            i: 0,
            j: 1,
            guard: None,
            violation: None,
            transactions: 0,
            emitted: 0,
        }
    }

    /// Verifies grouping while streaming.
    pub fn checked(source: I) -> Self {
        Self {
            guard: Some(GroupingGuard::new()),
            ..Self::new(source)
        }
    }

    /// Transactions read so far, including those contributing no pairs.
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn current_transaction(&self) -> Option<TransactionId> {
        self.current
    }

    /// Ends the stream, surfacing a grouping violation if one stopped it.
    pub fn finish(self) -> Result<usize> {
        match self.violation {
            Some(err) => Err(err),
            None => Ok(self.emitted),
        }
    }

    fn observe(&mut self, transaction_id: TransactionId) -> bool {
        if let Some(guard) = self.guard.as_mut() {
            if let Err(err) = guard.observe(transaction_id) {
                self.violation = Some(err);
                return false;
            }
        }
        true
    }

    fn load_next_group(&mut self) -> bool {
        self.items.clear();
        if self.violation.is_some() {
            return false;
        }

        let Some(first) = self.pending.take().or_else(|| self.source.next()) else {
            self.current = None;
            return false;
        };
        if !self.observe(first.transaction_id) {
            return false;
        }
        self.items.push(first.item_id);

        while let Some(record) = self.source.next() {
            if record.transaction_id != first.transaction_id {
                self.pending = Some(record);
                break;
            }
            // Same id, so the guard cannot reject it.
            self.observe(record.transaction_id);
            self.items.push(record.item_id);
        }

        self.current = Some(first.transaction_id);
        self.transactions += 1;
        self.i = 0;
        self.j = 1;
        true
    }
}

impl<I: Iterator<Item = TransactionItem>> Iterator for PairStream<I> {
    type Item = ItemPair;

    fn next(&mut self) -> Option<ItemPair> {
        loop {
            if self.j < self.items.len() {
                let pair = ItemPair::new(self.items[self.i], self.items[self.j]);
                self.j += 1;
                if self.j == self.items.len() {
                    self.i += 1;
                    self.j = self.i + 1;
                }
                self.emitted += 1;
                return Some(pair);
            }
            if !self.load_next_group() {
                return None;
            }
        }
    }
}

/// Pair stream over grouped records held in a slice.
pub fn pairs_of(records: &[TransactionItem]) -> PairStream<Copied<slice::Iter<'_, TransactionItem>>> {
    PairStream::new(records.iter().copied())
}

/// Number of pairs a transaction of `n` items contributes.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}
