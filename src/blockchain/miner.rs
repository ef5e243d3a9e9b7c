use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use log::{debug, info};
use sha2::{Digest, Sha256};

/// Header fields fixed before the nonce search starts. Everything except the
/// nonce is frozen here, so a candidate hash is a pure function of the nonce.
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    pub timestamp: i64,
    pub index: u64,
    pub prev_hash: String,
    pub merkle_root: String,
}

impl HeaderTemplate {
    /// Candidate hash for a nonce: SHA-256 over the concatenation of
    /// timestamp, index, previous hash, nonce and merkle root, as lowercase hex.
    pub fn candidate_hash(&self, nonce: u64) -> String {
        let preimage = format!(
            "{}{}{}{}{}",
            self.timestamp, self.index, self.prev_hash, nonce, self.merkle_root
        );
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Outcome of a successful nonce search.
#[derive(Debug, Clone)]
pub struct PowSolution {
    pub nonce: u64,
    pub hash: String,
    pub duration_ms: u64,
}

/// Search for a nonce whose candidate hash starts with `difficulty` leading
/// zero hex digits, using `workers` parallel threads.
///
/// The workers share a single nonce counter behind a mutex; each claim copies
/// the current value and increments it, so no nonce is skipped and no nonce
/// is computed twice. The first worker to satisfy the target raises the
/// `found` flag; the others observe it before their next claim and stop.
/// A worker may race past the flag and hash one extra candidate; that is
/// wasted work, not a correctness loss. Completion is signalled by joining the
/// thread scope rather than polling.
///
/// There is no timeout: at a difficulty far above the available hash rate
/// this blocks indefinitely. Difficulty 0 succeeds on the first candidate.
/// A worker count of 0 is clamped to 1 so the search can always complete.
pub fn mine(header: &HeaderTemplate, difficulty: u32, workers: u32) -> PowSolution {
    let workers = workers.max(1);
    let target = "0".repeat(difficulty as usize);
    let next_nonce = Mutex::new(0u64);
    let found = AtomicBool::new(false);
    let winner: Mutex<Option<(u64, String)>> = Mutex::new(None);

    let started = Instant::now();
    thread::scope(|scope| {
        let (target, next_nonce, found, winner) = (&target, &next_nonce, &found, &winner);
        for worker in 0..workers {
            scope.spawn(move || {
                debug!("miner worker {worker} started at height {}", header.index);
                loop {
                    if found.load(Ordering::Acquire) {
                        return;
                    }
                    let nonce = {
                        let mut counter = next_nonce.lock().expect("mutex poisoned");
                        let claimed = *counter;
                        *counter = counter.wrapping_add(1);
                        claimed
                    };
                    let hash = header.candidate_hash(nonce);
                    if hash.starts_with(target.as_str()) {
                        found.store(true, Ordering::Release);
                        let mut slot = winner.lock().expect("mutex poisoned");
                        // First writer wins; a simultaneous second solution is discarded.
                        if slot.is_none() {
                            *slot = Some((nonce, hash));
                        }
                        return;
                    }
                }
            });
        }
    });
    let duration_ms = started.elapsed().as_millis() as u64;

    let (nonce, hash) = winner
        .into_inner()
        .expect("mutex poisoned")
        .expect("a worker recorded the winning nonce before the scope joined");

    info!(
        "MINER - height {} solved: nonce={} hash={} diff={} in {}ms",
        header.index, nonce, hash, difficulty, duration_ms
    );

    PowSolution {
        nonce,
        hash,
        duration_ms,
    }
}
