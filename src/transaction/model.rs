use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::wallet;

/// Sender address carried by every synthesized mining-reward transaction.
pub const REWARD_SENDER: &str = "Mine Rewards";

/// A signed transfer between two wallet addresses.
///
/// The core never inspects key material: it reads the six fields below and
/// treats `hash` as a stable, unique identifier per logical transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: f64,
    pub fee: f64,
    /// Creation time, unix milliseconds (UTC).
    pub timestamp: i64,
    /// SHA-256 content hash over sender, recipient, amount, fee and timestamp.
    pub hash: String,
    /// Hex DER ECDSA signature of the content hash by the sender's key.
    pub signature: String,
}

impl Transaction {
    /// Build a transaction at the current time and sign its content hash
    /// with the sender's private key.
    pub fn new(
        sender_address: &str,
        recipient_address: &str,
        amount: f64,
        fee: f64,
        signing_key: &str,
    ) -> Result<Self, &'static str> {
        let timestamp = Utc::now().timestamp_millis();
        let hash = content_hash(sender_address, recipient_address, amount, fee, timestamp);
        let signature = wallet::sign_hash(signing_key, digest_bytes(&hash)?)?;
        Ok(Self {
            sender_address: sender_address.to_string(),
            recipient_address: recipient_address.to_string(),
            amount,
            fee,
            timestamp,
            hash,
            signature,
        })
    }

    /// Synthesize the miner's reward transaction: sentinel sender, zero fee,
    /// unsigned.
    pub fn reward(recipient_address: &str, amount: f64) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        let hash = content_hash(REWARD_SENDER, recipient_address, amount, 0.0, timestamp);
        Self {
            sender_address: REWARD_SENDER.to_string(),
            recipient_address: recipient_address.to_string(),
            amount,
            fee: 0.0,
            timestamp,
            hash,
            signature: String::new(),
        }
    }

    pub fn is_reward(&self) -> bool {
        self.sender_address == REWARD_SENDER
    }

    /// Recompute the content hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        content_hash(
            &self.sender_address,
            &self.recipient_address,
            self.amount,
            self.fee,
            self.timestamp,
        )
    }

    /// Verify the signature against the sender's public key. Reward
    /// transactions carry no signature and always verify as false here;
    /// callers exempt them explicitly.
    pub fn verify_signature(&self, public_key: &str) -> Result<bool, &'static str> {
        wallet::verify_signature_hex(public_key, &self.signature, digest_bytes(&self.hash)?)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} | amount: {} | fee: {} | hash: {}",
            self.sender_address, self.recipient_address, self.amount, self.fee, self.hash
        )
    }
}

fn content_hash(sender: &str, recipient: &str, amount: f64, fee: f64, timestamp: i64) -> String {
    let preimage = format!("{sender}{recipient}{amount}{fee}{timestamp}");
    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    hex::encode(hasher.finalize())
}

fn digest_bytes(hash_hex: &str) -> Result<[u8; 32], &'static str> {
    let bytes = hex::decode(hash_hex).map_err(|_| "invalid content hash hex")?;
    bytes.try_into().map_err(|_| "content hash must be 32 bytes")
}
