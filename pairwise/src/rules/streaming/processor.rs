use super::state::StreamingMiner;
use super::super::engine::MiningOutcome;
use super::super::records::{records_from_array, TransactionItem};
use crate::config::MinerConfig;
use crate::error::Result;
use ndarray::ArrayView2;

/// Process a counting chunk given as an n×2 (transaction_id, item_id) matrix
pub fn count_pass(miner: &mut StreamingMiner, chunk: ArrayView2<i64>) -> Result<()> {
    miner.count_chunk(&records_from_array(chunk)?)
}

/// Close the counting pass and fix the qualifying items
pub fn finalize_counts(miner: &mut StreamingMiner) -> Result<()> {
    miner.finalize_counts()
}

/// Process a sizing chunk
pub fn size_pass(miner: &mut StreamingMiner, chunk: ArrayView2<i64>) -> Result<()> {
    miner.size_chunk(&records_from_array(chunk)?)
}

/// Close the sizing pass and fix the qualifying transactions
pub fn finalize_sizing(miner: &mut StreamingMiner) -> Result<()> {
    miner.finalize_sizing()
}

/// Process a pairing chunk
pub fn pair_pass(miner: &mut StreamingMiner, chunk: ArrayView2<i64>) -> Result<()> {
    miner.pair_chunk(&records_from_array(chunk)?)
}

/// Produce the ranked rules
pub fn finish(miner: &mut StreamingMiner) -> Result<MiningOutcome> {
    miner.finish()
}

/// Drives all three passes over a re-readable chunk source.
pub fn mine_from_chunks<'a, F, I>(chunks: F, config: &MinerConfig) -> Result<MiningOutcome>
where
    F: Fn() -> I,
    I: Iterator<Item = &'a [TransactionItem]>,
{
    let mut miner = StreamingMiner::new(config.clone())?;

    for chunk in chunks() {
        miner.count_chunk(chunk)?;
    }
    miner.finalize_counts()?;

    for chunk in chunks() {
        miner.size_chunk(chunk)?;
    }
    miner.finalize_sizing()?;

    for chunk in chunks() {
        miner.pair_chunk(chunk)?;
    }
    miner.finish()
}
