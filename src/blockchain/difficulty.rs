use std::sync::Mutex;

use log::debug;

use super::{DIFF_ADJUST_WINDOW, EXPECTED_BLOCK_TIME_MS, MIN_DIFFICULTY};

/// Mutable part of the adjustment state, updated after each mined block.
#[derive(Debug)]
struct AdjustState {
    difficulty: u32,
    accumulated_ms: u64,
}

/// Retargeting controller for the proof-of-work difficulty.
///
/// The difficulty is adjusted once per lookback window: when a block whose
/// index is a non-zero multiple of the window finishes mining, the average
/// duration of the accumulated window is compared against the expected block
/// time. Faster than 80% of expected raises the difficulty by one; slower
/// than 120% lowers it by one, never below the floor. The accumulator then
/// resets.
///
/// Each chain owns its controller by default, and tests inject the initial
/// state. Wrapping one controller in an `Arc` and handing it to several
/// chains makes them share a single process-wide difficulty. Updates are
/// serialized by an internal mutex so a concurrent mine cannot lose an
/// adjustment.
#[derive(Debug)]
pub struct DifficultyController {
    state: Mutex<AdjustState>,
    expected_block_time_ms: u64,
    window: u64,
    floor: u32,
}

impl DifficultyController {
    /// Controller with the default expected block time and lookback window.
    pub fn new(initial_difficulty: u32) -> Self {
        Self::with_settings(initial_difficulty, EXPECTED_BLOCK_TIME_MS, DIFF_ADJUST_WINDOW)
    }

    /// Controller with explicit timing settings, for tests and experiments.
    pub fn with_settings(initial_difficulty: u32, expected_block_time_ms: u64, window: u64) -> Self {
        Self {
            state: Mutex::new(AdjustState {
                difficulty: initial_difficulty,
                accumulated_ms: 0,
            }),
            expected_block_time_ms,
            window,
            floor: MIN_DIFFICULTY,
        }
    }

    /// The difficulty in effect for the next block to be constructed.
    pub fn current(&self) -> u32 {
        self.state.lock().expect("mutex poisoned").difficulty
    }

    /// Milliseconds accumulated since the last window boundary.
    pub fn accumulated_ms(&self) -> u64 {
        self.state.lock().expect("mutex poisoned").accumulated_ms
    }

    /// Record the mining duration of the block at `index` and retarget if the
    /// index sits on a window boundary. The genesis block contributes to the
    /// accumulator but never triggers an adjustment.
    pub fn record(&self, index: u64, duration_ms: u64) {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.accumulated_ms += duration_ms;

        if index % self.window != 0 || index == 0 {
            return;
        }

        let average = state.accumulated_ms as f64 / self.window as f64;
        let expected = self.expected_block_time_ms as f64;
        if average < 0.8 * expected {
            state.difficulty += 1;
            debug!(
                "DIFFICULTY - window avg {average:.0}ms under target, raised to {}",
                state.difficulty
            );
        } else if average > 1.2 * expected {
            state.difficulty = state.difficulty.saturating_sub(1).max(self.floor);
            debug!(
                "DIFFICULTY - window avg {average:.0}ms over target, lowered to {}",
                state.difficulty
            );
        }
        state.accumulated_ms = 0;
    }
}

impl Default for DifficultyController {
    fn default() -> Self {
        Self::new(super::DEFAULT_DIFFICULTY)
    }
}
