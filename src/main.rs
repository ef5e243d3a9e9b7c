use std::env;
use std::sync::Arc;

use dotenvy::dotenv;
use log::info;

use powsim::blockchain::DifficultyController;
use powsim::{Blockchain, SelectionPolicy, Transaction, wallet};

/// Demo run: two wallets, a handful of signed transfers, a few blocks mined
/// under different pool policies, then balances and a validation pass.
fn main() {
    let _ = dotenv();
    env_logger::init();

    let difficulty: u32 = env::var("DIFFICULTY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(powsim::DEFAULT_DIFFICULTY);
    let blocks: u64 = env::var("BLOCKS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);

    println!("⛏️ Starting proof-of-work simulation (difficulty {difficulty}, {blocks} blocks)");

    let (miner_pub, _miner_priv) = wallet::generate_keypair();
    let (alice_pub, alice_priv) = wallet::generate_keypair();
    assert!(wallet::validate_keypair(&alice_priv, &alice_pub));

    let controller = Arc::new(DifficultyController::new(difficulty));
    let mut chain = Blockchain::with_controller(controller);

    for (amount, fee) in [(12.5, 0.3), (4.0, 0.1), (7.25, 0.9)] {
        match Transaction::new(&alice_pub, &miner_pub, amount, fee, &alice_priv) {
            Ok(tx) => {
                info!("submitting {}", tx.hash);
                chain.submit_transaction(tx);
            }
            Err(e) => eprintln!("transaction rejected: {e}"),
        }
    }

    let policies = [
        SelectionPolicy::Greedy,
        SelectionPolicy::Altruistic,
        SelectionPolicy::Fifo,
    ];
    for round in 0..blocks {
        let policy = &policies[(round as usize) % policies.len()];
        let block = chain.mine_block(policy, &miner_pub);
        println!("{block}");
    }

    let tip = chain.last_block();
    println!(
        "tip as JSON:\n{}",
        serde_json::to_string_pretty(tip).expect("block serializes")
    );

    let reward_credited: f64 = tip
        .transactions
        .iter()
        .filter(|t| t.is_reward())
        .map(|t| t.amount)
        .sum();
    println!("reward credited in tip: {reward_credited}");
    println!("miner balance: {}", chain.get_balance(&miner_pub));
    println!("alice balance: {}", chain.get_balance(&alice_pub));
    println!(
        "chain of {} blocks valid: {}",
        chain.len(),
        chain.validate_chain()
    );
}
