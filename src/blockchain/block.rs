use std::fmt;

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyController;
use super::miner::{self, HeaderTemplate};
use super::{MINER_THREADS, merkle};
use crate::transaction::Transaction;

/// A mined block. Fields are set once during construction and mining and
/// never mutated afterwards; the chain grows by appending whole blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Creation time, unix milliseconds (UTC).
    pub timestamp: i64,
    pub prev_hash: String,
    /// The winning hash found by the miner.
    pub hash: String,
    pub merkle_root: String,
    pub miner_address: String,
    /// Pool transactions in selection order, the reward transaction last.
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    /// Difficulty in effect when this block was constructed, frozen here.
    pub difficulty: u32,
    pub reward: f64,
    pub mining_duration_ms: u64,
}

impl Block {
    /// Mine the genesis block: index 0, no transactions, empty previous hash
    /// and an empty Merkle root.
    pub fn genesis(difficulty: &DifficultyController) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let level = difficulty.current();
        let header = HeaderTemplate {
            timestamp,
            index: 0,
            prev_hash: String::new(),
            merkle_root: merkle::merkle_root(&[]),
        };
        let solution = miner::mine(&header, level, MINER_THREADS);
        difficulty.record(0, solution.duration_ms);

        Self {
            index: 0,
            timestamp,
            prev_hash: header.prev_hash,
            hash: solution.hash,
            merkle_root: header.merkle_root,
            miner_address: String::new(),
            transactions: Vec::new(),
            nonce: solution.nonce,
            difficulty: level,
            reward: 0.0,
            mining_duration_ms: solution.duration_ms,
        }
    }

    /// Construct and mine the successor of `prev` from the supplied
    /// transactions.
    ///
    /// A reward transaction for `reward` plus the sum of the supplied fees is
    /// appended last before the Merkle root is computed. The effective
    /// difficulty is snapshotted from the controller before mining; the
    /// elapsed time is reported back afterwards, which may retarget the
    /// difficulty for subsequent blocks but never this one.
    pub fn mine_next(
        prev: &Block,
        mut transactions: Vec<Transaction>,
        miner_address: &str,
        reward: f64,
        difficulty: &DifficultyController,
    ) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let index = prev.index + 1;

        let fees: f64 = transactions.iter().map(|t| t.fee).sum();
        transactions.push(Transaction::reward(miner_address, reward + fees));
        debug!(
            "block {index}: {} txs selected, {fees} in fees",
            transactions.len() - 1
        );

        let tx_hashes: Vec<String> = transactions.iter().map(|t| t.hash.clone()).collect();
        let level = difficulty.current();
        let header = HeaderTemplate {
            timestamp,
            index,
            prev_hash: prev.hash.clone(),
            merkle_root: merkle::merkle_root(&tx_hashes),
        };
        let solution = miner::mine(&header, level, MINER_THREADS);
        difficulty.record(index, solution.duration_ms);

        Self {
            index,
            timestamp,
            prev_hash: header.prev_hash,
            hash: solution.hash,
            merkle_root: header.merkle_root,
            miner_address: miner_address.to_string(),
            transactions,
            nonce: solution.nonce,
            difficulty: level,
            reward,
            mining_duration_ms: solution.duration_ms,
        }
    }

    /// Rehash the stored header fields with the stored nonce.
    pub fn compute_hash(&self) -> String {
        self.header_template().candidate_hash(self.nonce)
    }

    /// Recompute the Merkle root over the stored transactions.
    pub fn compute_merkle_root(&self) -> String {
        let tx_hashes: Vec<String> = self.transactions.iter().map(|t| t.hash.clone()).collect();
        merkle::merkle_root(&tx_hashes)
    }

    /// Whether the stored hash satisfies the block's own difficulty target.
    pub fn meets_difficulty(&self) -> bool {
        self.hash.len() >= self.difficulty as usize
            && self
                .hash
                .chars()
                .take(self.difficulty as usize)
                .all(|c| c == '0')
    }

    fn header_template(&self) -> HeaderTemplate {
        HeaderTemplate {
            timestamp: self.timestamp,
            index: self.index,
            prev_hash: self.prev_hash.clone(),
            merkle_root: self.merkle_root.clone(),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[BLOCK START]")?;
        writeln!(f, "Index: {}\tTimestamp: {}", self.index, self.timestamp)?;
        writeln!(f, "Previous Hash: {}", self.prev_hash)?;
        writeln!(f, "-- PoW --")?;
        writeln!(f, "Difficulty Level: {}", self.difficulty)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        writeln!(f, "Hash: {}", self.hash)?;
        writeln!(f, "-- Rewards --")?;
        writeln!(f, "Reward: {}", self.reward)?;
        writeln!(f, "Miners Address: {}", self.miner_address)?;
        writeln!(f, "Mined in: {}ms", self.mining_duration_ms)?;
        writeln!(f, "-- {} Transactions --", self.transactions.len())?;
        writeln!(f, "Merkle Root: {}", self.merkle_root)?;
        for tx in &self.transactions {
            writeln!(f, "{tx}")?;
        }
        write!(f, "[BLOCK END]")
    }
}
