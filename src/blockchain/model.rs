use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyController;
use super::{BLOCK_REWARD, Block, MAX_TXS_PER_BLOCK};
use crate::transaction::Transaction;

/// How transactions are picked out of the pending pool when a block is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// First come, first served, in submission order.
    Fifo,
    /// Highest fee first; ties keep submission order.
    Greedy,
    /// Oldest timestamp first; ties keep submission order.
    Altruistic,
    /// Uniform draw over the remaining pool per pick, without replacement.
    Random,
    /// Transactions from the given sender first (submission order), the
    /// remainder filled by descending fee.
    AddressBased(String),
}

/// In-memory chain plus the pending-transaction pool.
///
/// Only the miner inside `Block` is concurrent; everything here runs on the
/// calling thread. Appending, selection and validation must not overlap an
/// in-flight mine of the same block.
#[derive(Debug)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pool: Vec<Transaction>,
    difficulty: Arc<DifficultyController>,
}

impl Blockchain {
    /// Start a chain with a freshly mined genesis block under a default
    /// difficulty controller.
    pub fn new() -> Self {
        Self::with_controller(Arc::new(DifficultyController::default()))
    }

    /// Start a chain with an injected controller. Sharing one controller
    /// between chains gives them a single global difficulty; a fresh
    /// controller keeps chains isolated.
    pub fn with_controller(difficulty: Arc<DifficultyController>) -> Self {
        let genesis = Block::genesis(&difficulty);
        info!("chain initialised, genesis hash {}", genesis.hash);
        Self {
            blocks: vec![genesis],
            pool: Vec::new(),
            difficulty,
        }
    }

    pub fn difficulty(&self) -> &DifficultyController {
        &self.difficulty
    }

    pub fn last_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds at least the genesis block")
    }

    /// Block at `index`, or `None` when no such block exists. The chain is
    /// left untouched either way.
    pub fn block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Pending transactions in submission order, read-only.
    pub fn pending(&self) -> &[Transaction] {
        &self.pool
    }

    /// Append an already mined block. No validation happens here; validation
    /// is an explicit, separate operation.
    pub fn append_mined_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Add a transaction to the pool tail. No signature or balance check is
    /// performed: the pool accepts what it is given, and the submitting
    /// boundary is responsible for validating first.
    pub fn submit_transaction(&mut self, tx: Transaction) {
        debug!("pool <- {} (size {})", tx.hash, self.pool.len() + 1);
        self.pool.push(tx);
    }

    /// Remove and return up to `MAX_TXS_PER_BLOCK` transactions from the pool
    /// under the given policy. Selecting from a pool smaller than the cap
    /// silently clamps; an empty pool yields an empty batch. A transaction
    /// removed here can never be returned by a later call.
    pub fn select_transactions(&mut self, policy: &SelectionPolicy) -> Vec<Transaction> {
        let n = MAX_TXS_PER_BLOCK.min(self.pool.len());
        let mut selected = Vec::with_capacity(n);

        match policy {
            SelectionPolicy::Fifo => {
                selected.extend(self.pool.drain(..n));
            }
            SelectionPolicy::Greedy => {
                for _ in 0..n {
                    let idx = index_of_max_fee(&self.pool);
                    selected.push(self.pool.remove(idx));
                }
            }
            SelectionPolicy::Altruistic => {
                for _ in 0..n {
                    let mut idx = 0;
                    for (i, tx) in self.pool.iter().enumerate() {
                        if tx.timestamp < self.pool[idx].timestamp {
                            idx = i;
                        }
                    }
                    selected.push(self.pool.remove(idx));
                }
            }
            SelectionPolicy::Random => {
                let mut rng = rand::thread_rng();
                for _ in 0..n {
                    let idx = rng.gen_range(0..self.pool.len());
                    selected.push(self.pool.remove(idx));
                }
            }
            SelectionPolicy::AddressBased(preference) => {
                // Preferred sender first, in submission order.
                while selected.len() < n {
                    let Some(idx) = self
                        .pool
                        .iter()
                        .position(|t| t.sender_address == *preference)
                    else {
                        break;
                    };
                    selected.push(self.pool.remove(idx));
                }
                // Fill the remainder with the highest-fee transactions.
                while selected.len() < n {
                    let idx = index_of_max_fee(&self.pool);
                    selected.push(self.pool.remove(idx));
                }
            }
        }

        debug!(
            "selected {} txs via {:?}, {} left in pool",
            selected.len(),
            policy,
            self.pool.len()
        );
        selected
    }

    /// Select transactions under `policy`, mine the next block crediting
    /// `miner_address`, and append it.
    pub fn mine_block(&mut self, policy: &SelectionPolicy, miner_address: &str) -> &Block {
        let transactions = self.select_transactions(policy);
        let block = Block::mine_next(
            self.last_block(),
            transactions,
            miner_address,
            BLOCK_REWARD,
            &self.difficulty,
        );
        self.append_mined_block(block);
        self.last_block()
    }

    /// Net balance of an address over every mined transaction: credits
    /// received amounts, debits sent amounts plus fees. May be negative;
    /// sufficiency is the submitting boundary's concern, not enforced here.
    pub fn get_balance(&self, address: &str) -> f64 {
        let mut balance = 0.0;
        for block in &self.blocks {
            for tx in &block.transactions {
                if tx.recipient_address == address {
                    balance += tx.amount;
                }
                if tx.sender_address == address {
                    balance -= tx.amount + tx.fee;
                }
            }
        }
        balance
    }

    /// Validate the whole chain.
    ///
    /// A genesis-only chain checks just the recomputed genesis hash. Longer
    /// chains check every block from index 1 up to and including the most
    /// recently appended one: previous-hash linkage, recomputed block-hash
    /// equality, recomputed transaction content hashes and recomputed
    /// Merkle-root equality. The content-hash check is what catches a field
    /// edit inside a stored transaction; without it the stored `tx.hash`
    /// strings, the Merkle root and the block hash would all still agree.
    /// Reward transactions recompute from their stored fields like any
    /// other. The first failure short-circuits; nothing is mutated.
    pub fn validate_chain(&self) -> bool {
        if self.blocks.len() == 1 {
            let genesis = &self.blocks[0];
            return genesis.hash == genesis.compute_hash();
        }

        for i in 1..self.blocks.len() {
            let current = &self.blocks[i];
            let prev = &self.blocks[i - 1];

            if current.prev_hash != prev.hash {
                warn!("block {i}: broken linkage to predecessor");
                return false;
            }
            if current.hash != current.compute_hash() {
                warn!("block {i}: stored hash does not rehash");
                return false;
            }
            if current
                .transactions
                .iter()
                .any(|tx| tx.hash != tx.compute_hash())
            {
                warn!("block {i}: transaction content hash mismatch");
                return false;
            }
            if current.merkle_root != current.compute_merkle_root() {
                warn!("block {i}: merkle root mismatch");
                return false;
            }
        }
        true
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the highest-fee transaction; the earliest submitted wins ties.
fn index_of_max_fee(pool: &[Transaction]) -> usize {
    let mut idx = 0;
    for (i, tx) in pool.iter().enumerate() {
        if tx.fee > pool[idx].fee {
            idx = i;
        }
    }
    idx
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Blockchain, SelectionPolicy};
    use crate::blockchain::DifficultyController;
    use crate::transaction::Transaction;

    fn chain() -> Blockchain {
        Blockchain::with_controller(Arc::new(DifficultyController::new(1)))
    }

    fn tx(sender: &str, fee: f64, timestamp: i64) -> Transaction {
        let mut t = Transaction {
            sender_address: sender.to_string(),
            recipient_address: "recipient".to_string(),
            amount: 10.0,
            fee,
            timestamp,
            hash: String::new(),
            signature: String::new(),
        };
        t.hash = t.compute_hash();
        t
    }

    fn fill_pool(bc: &mut Blockchain, txs: &[Transaction]) {
        for t in txs {
            bc.submit_transaction(t.clone());
        }
    }

    #[test]
    fn starts_with_exactly_one_genesis_block() {
        let bc = chain();
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.last_block().index, 0);
        assert!(bc.validate_chain());
    }

    #[test]
    fn block_lookup_out_of_range_is_none() {
        let bc = chain();
        assert!(bc.block(0).is_some());
        assert!(bc.block(7).is_none());
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn fifo_takes_submission_order_and_clamps() {
        let mut bc = chain();
        fill_pool(
            &mut bc,
            &[tx("a", 0.1, 1), tx("b", 0.9, 2), tx("c", 0.5, 3)],
        );
        let selected = bc.select_transactions(&SelectionPolicy::Fifo);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].sender_address, "a");
        assert_eq!(selected[2].sender_address, "c");
        assert_eq!(bc.pool_size(), 0);

        // Empty pool clamps to an empty batch, not an error.
        assert!(bc.select_transactions(&SelectionPolicy::Fifo).is_empty());
    }

    #[test]
    fn fifo_caps_at_block_capacity() {
        let mut bc = chain();
        let txs: Vec<_> = (0..8).map(|i| tx(&format!("s{i}"), 0.1, i)).collect();
        fill_pool(&mut bc, &txs);
        let selected = bc.select_transactions(&SelectionPolicy::Fifo);
        assert_eq!(selected.len(), 5);
        assert_eq!(bc.pool_size(), 3);
        assert_eq!(bc.pending()[0].sender_address, "s5");
    }

    #[test]
    fn greedy_orders_by_fee_with_stable_ties() {
        let mut bc = chain();
        fill_pool(
            &mut bc,
            &[
                tx("low", 0.1, 1),
                tx("tie-first", 0.9, 2),
                tx("tie-second", 0.9, 3),
                tx("mid", 0.5, 4),
            ],
        );
        let selected = bc.select_transactions(&SelectionPolicy::Greedy);
        let senders: Vec<_> = selected.iter().map(|t| t.sender_address.as_str()).collect();
        assert_eq!(senders, ["tie-first", "tie-second", "mid", "low"]);
    }

    #[test]
    fn altruistic_orders_by_oldest_timestamp() {
        let mut bc = chain();
        fill_pool(
            &mut bc,
            &[tx("newer", 0.1, 300), tx("oldest", 0.1, 100), tx("mid", 0.9, 200)],
        );
        let selected = bc.select_transactions(&SelectionPolicy::Altruistic);
        let senders: Vec<_> = selected.iter().map(|t| t.sender_address.as_str()).collect();
        assert_eq!(senders, ["oldest", "mid", "newer"]);
    }

    #[test]
    fn random_draws_without_replacement() {
        let mut bc = chain();
        let txs: Vec<_> = (0..5).map(|i| tx(&format!("s{i}"), 0.1, i)).collect();
        fill_pool(&mut bc, &txs);
        let selected = bc.select_transactions(&SelectionPolicy::Random);
        assert_eq!(selected.len(), 5);
        assert_eq!(bc.pool_size(), 0);

        let mut hashes: Vec<_> = selected.iter().map(|t| t.hash.clone()).collect();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), 5, "no transaction may be drawn twice");
    }

    #[test]
    fn address_based_prefers_sender_then_fills_by_fee() {
        let mut bc = chain();
        fill_pool(
            &mut bc,
            &[
                tx("other", 0.9, 1),
                tx("vip", 0.1, 2),
                tx("other", 0.2, 3),
                tx("vip", 0.3, 4),
                tx("other", 0.7, 5),
                tx("other", 0.4, 6),
            ],
        );
        let policy = SelectionPolicy::AddressBased("vip".to_string());
        let selected = bc.select_transactions(&policy);
        let senders: Vec<_> = selected.iter().map(|t| t.sender_address.as_str()).collect();
        assert_eq!(senders, ["vip", "vip", "other", "other", "other"]);
        // Both vip txs first (submission order), then remaining by fee desc.
        assert_eq!(selected[0].fee, 0.1);
        assert_eq!(selected[1].fee, 0.3);
        assert_eq!(selected[2].fee, 0.9);
        assert_eq!(selected[3].fee, 0.7);
        assert_eq!(selected[4].fee, 0.4);
    }

    #[test]
    fn selection_is_exclusive() {
        for policy in [
            SelectionPolicy::Fifo,
            SelectionPolicy::Greedy,
            SelectionPolicy::Altruistic,
            SelectionPolicy::Random,
            SelectionPolicy::AddressBased("s1".to_string()),
        ] {
            let mut bc = chain();
            let txs: Vec<_> = (0..7).map(|i| tx(&format!("s{i}"), i as f64, i)).collect();
            fill_pool(&mut bc, &txs);

            let before: Vec<_> = bc.pending().iter().map(|t| t.hash.clone()).collect();
            let selected = bc.select_transactions(&policy);
            let taken: Vec<_> = selected.iter().map(|t| t.hash.clone()).collect();
            let remaining: Vec<_> = bc.pending().iter().map(|t| t.hash.clone()).collect();

            for h in &taken {
                assert!(!remaining.contains(h), "{policy:?}: {h} still pooled");
            }
            let mut reunited = taken.clone();
            reunited.extend(remaining.clone());
            reunited.sort();
            let mut original = before.clone();
            original.sort();
            assert_eq!(reunited, original, "{policy:?}: selection lost or invented txs");
        }
    }

    #[test]
    fn mined_chain_links_and_validates() {
        let mut bc = chain();
        fill_pool(&mut bc, &[tx("a", 0.1, 1), tx("b", 0.2, 2)]);
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        bc.mine_block(&SelectionPolicy::Fifo, "miner");

        assert_eq!(bc.len(), 3);
        for i in 1..bc.len() {
            assert_eq!(bc.blocks[i].prev_hash, bc.blocks[i - 1].hash);
        }
        assert!(bc.validate_chain());
    }

    #[test]
    fn balance_credits_miner_reward() {
        let mut bc = chain();
        bc.mine_block(&SelectionPolicy::Fifo, "miner-m");
        assert_eq!(bc.get_balance("miner-m"), 1.0);
        assert_eq!(bc.get_balance("someone-else"), 0.0);
    }

    #[test]
    fn balance_debits_sender_amount_plus_fee() {
        let mut bc = chain();
        bc.submit_transaction(tx("spender", 0.5, 1)); // amount 10.0, fee 0.5
        bc.mine_block(&SelectionPolicy::Fifo, "miner-m");

        assert_eq!(bc.get_balance("spender"), -10.5);
        assert_eq!(bc.get_balance("recipient"), 10.0);
        // Reward plus the collected fee.
        assert_eq!(bc.get_balance("miner-m"), 1.5);
    }

    #[test]
    fn amount_only_tamper_invalidates_chain() {
        // Three blocks, then edit a single transaction's amount in block 1
        // and nothing else. The stored tx hash, merkle root and block hash
        // all still agree with each other, so only recomputing the content
        // hash from the fields can expose the edit.
        let mut bc = chain();
        fill_pool(&mut bc, &[tx("a", 0.1, 1), tx("b", 0.2, 2)]);
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        assert_eq!(bc.len(), 3);
        assert!(bc.validate_chain());

        bc.blocks[1].transactions[0].amount = 9_999.0;
        assert!(!bc.validate_chain());
    }

    #[test]
    fn tampered_transaction_hash_invalidates_chain() {
        let mut bc = chain();
        fill_pool(&mut bc, &[tx("a", 0.1, 1), tx("b", 0.2, 2)]);
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        assert!(bc.validate_chain());

        bc.blocks[1].transactions[0].hash = "doctored".to_string();
        assert!(!bc.validate_chain());
    }

    #[test]
    fn broken_linkage_invalidates_chain() {
        let mut bc = chain();
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        bc.blocks[2].prev_hash = "severed".to_string();
        assert!(!bc.validate_chain());
    }

    #[test]
    fn tampering_with_the_latest_block_is_caught() {
        // The newest block participates in validation; an amount-only tamper
        // there must not slip past the walk's upper bound.
        let mut bc = chain();
        fill_pool(&mut bc, &[tx("a", 0.1, 1)]);
        bc.mine_block(&SelectionPolicy::Fifo, "miner");
        assert!(bc.validate_chain());

        let last = bc.len() - 1;
        bc.blocks[last].transactions[0].amount = 9_999.0;
        assert!(!bc.validate_chain());
    }

    #[test]
    fn shared_controller_crosses_chains() {
        let ctl = Arc::new(DifficultyController::with_settings(1, u64::MAX / 2, 1));
        let mut first = Blockchain::with_controller(Arc::clone(&ctl));
        // Each fast block on the first chain raises the shared difficulty.
        first.mine_block(&SelectionPolicy::Fifo, "miner");
        let second = Blockchain::with_controller(Arc::clone(&ctl));
        assert!(second.last_block().difficulty >= 2);
    }
}
