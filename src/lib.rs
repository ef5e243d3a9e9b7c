//! Single-node proof-of-work blockchain simulator.
//!
//! - `blockchain`: blocks, parallel mining, Merkle commitments, difficulty
//!   retargeting, and the chain/pool manager with its selection policies,
//! - `transaction`: the signed-transfer collaborator consumed by the core,
//! - `wallet`: secp256k1 keypair generation and validation.
//!
//! Everything runs in one process against one chain; there is no networking
//! and no persistence. The binary in `main.rs` drives a small demo run.

pub mod blockchain;
pub mod transaction;
pub mod wallet;

pub use blockchain::{
    BLOCK_REWARD, Block, Blockchain, DEFAULT_DIFFICULTY, DifficultyController, SelectionPolicy,
};
pub use transaction::{REWARD_SENDER, Transaction};
