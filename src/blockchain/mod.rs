pub mod block;
pub mod difficulty;
pub mod merkle;
pub mod miner;
pub mod model;

pub use block::Block;
pub use difficulty::DifficultyController;
pub use miner::{HeaderTemplate, PowSolution};
pub use model::{Blockchain, SelectionPolicy};

/// Initial Proof-of-Work difficulty (number of leading zero hex digits).
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Fixed block subsidy credited to the miner on top of collected fees.
pub const BLOCK_REWARD: f64 = 1.0;

/// Target milliseconds per block for the difficulty retarget.
pub const EXPECTED_BLOCK_TIME_MS: u64 = 10_000;

/// How many blocks to accumulate before a retarget decision.
pub const DIFF_ADJUST_WINDOW: u64 = 10;

/// Difficulty floor; below one leading zero the target is always satisfied.
pub const MIN_DIFFICULTY: u32 = 1;

/// Worker threads used for the parallel nonce search.
pub const MINER_THREADS: u32 = 8;

/// Upper bound on transactions pulled from the pool into one block
/// (the miner's reward transaction is added on top).
pub const MAX_TXS_PER_BLOCK: usize = 5;
