pub mod processor;
pub mod state;

pub use processor::{count_pass, finalize_counts, finalize_sizing, finish, mine_from_chunks, pair_pass, size_pass};
pub use state::{StreamingMiner, StreamingPhase};
