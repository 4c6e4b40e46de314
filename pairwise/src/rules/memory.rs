use super::pairs::ItemPair;
use crate::error::{MiningError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Byte budget shared by everything that grows the pair frequency table,
/// including parallel shards.
#[derive(Debug)]
pub struct MemoryBudget {
    max_bytes: usize,
    current_bytes: AtomicUsize,
}

impl MemoryBudget {
    /// Approximate footprint of one pair table entry: key, count and one
    /// control byte of the hash table.
    pub const PAIR_ENTRY_BYTES: usize =
        std::mem::size_of::<ItemPair>() + std::mem::size_of::<usize>() + 1;

    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            current_bytes: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    pub fn from_limit(limit: Option<usize>) -> Self {
        limit.map_or_else(Self::unlimited, Self::new)
    }

    pub fn allocate(&self, bytes: usize) -> Result<()> {
        let current = self.current_bytes.fetch_add(bytes, Ordering::SeqCst);
        if current.saturating_add(bytes) > self.max_bytes {
            self.current_bytes.fetch_sub(bytes, Ordering::SeqCst);
            return Err(MiningError::MemoryBudgetExceeded {
                requested: bytes,
                available: self.max_bytes.saturating_sub(current),
            });
        }
        Ok(())
    }

    pub fn deallocate(&self, bytes: usize) {
        self.current_bytes.fetch_sub(bytes, Ordering::SeqCst);
    }

    pub fn current_usage(&self) -> usize {
        self.current_bytes.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.max_bytes.saturating_sub(self.current_usage())
    }

    pub fn usage_percentage(&self) -> f64 {
        (self.current_usage() as f64 / self.max_bytes as f64) * 100.0
    }
}

pub fn estimate_pair_table_size(num_pairs: usize) -> usize {
    num_pairs.saturating_mul(MemoryBudget::PAIR_ENTRY_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_beyond_limit_is_rolled_back() {
        let budget = MemoryBudget::new(100);
        budget.allocate(60).unwrap();

        match budget.allocate(50) {
            Err(MiningError::MemoryBudgetExceeded {
                requested,
                available,
            }) => {
                assert_eq!(requested, 50);
                assert_eq!(available, 40);
            }
            other => panic!("expected budget error, got {:?}", other),
        }
        assert_eq!(budget.current_usage(), 60);

        budget.deallocate(60);
        assert_eq!(budget.available(), 100);
    }

    #[test]
    fn unlimited_budget_never_fails() {
        let budget = MemoryBudget::from_limit(None);
        budget.allocate(estimate_pair_table_size(1 << 30)).unwrap();
        assert!(budget.usage_percentage() < 1.0);
    }
}
