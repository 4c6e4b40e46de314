use super::memory::MemoryBudget;
use super::pairs::ItemPair;
use super::records::ItemId;
use crate::error::Result;
use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;

/// Occurrence counts keyed by item or item pair. Iteration order is
/// unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable<K: Eq + Hash> {
    counts: HashMap<K, usize>,
}

impl<K: Eq + Hash> FrequencyTable<K> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Increments `key`, returning `true` when it was not present before.
    pub fn add(&mut self, key: K) -> bool {
        match self.counts.entry(key) {
            hash_map::Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                false
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(1);
                true
            }
        }
    }

    pub fn get(&self, key: &K) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of keys consumed.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> + '_ {
        self.counts.iter().map(|(key, &count)| (key, count))
    }

    /// Key-wise summation. Associative and commutative, so partial tables can
    /// be merged in any order.
    pub fn merge(self, other: Self) -> Self {
        let (mut larger, smaller) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (key, count) in smaller.counts {
            *larger.counts.entry(key).or_insert(0) += count;
        }
        larger
    }
}

impl<K: Eq + Hash> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> IntoIterator for FrequencyTable<K> {
    type Item = (K, usize);
    type IntoIter = hash_map::IntoIter<K, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<K: Eq + Hash> FromIterator<K> for FrequencyTable<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut table = Self::new();
        for key in iter {
            table.add(key);
        }
        table
    }
}

pub fn count_items<I>(items: I) -> FrequencyTable<ItemId>
where
    I: IntoIterator<Item = ItemId>,
{
    items.into_iter().collect()
}

/// Pulls pairs one at a time; the source is never materialized.
pub fn count_pairs<I>(pairs: I) -> FrequencyTable<ItemPair>
where
    I: IntoIterator<Item = ItemPair>,
{
    pairs.into_iter().collect()
}

/// Like [`count_pairs`], charging every new distinct pair against `budget`.
pub fn count_pairs_within<I>(pairs: I, budget: &MemoryBudget) -> Result<FrequencyTable<ItemPair>>
where
    I: IntoIterator<Item = ItemPair>,
{
    let mut table = FrequencyTable::new();
    for pair in pairs {
        if table.add(pair) {
            budget.allocate(MemoryBudget::PAIR_ENTRY_BYTES)?;
        }
    }
    Ok(table)
}
