use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

/// Generate a new secp256k1 keypair and return (public_hex, private_hex).
/// The hex of the compressed public key doubles as the wallet address.
pub fn generate_keypair() -> (String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    (hex::encode(pk.serialize()), hex::encode(sk.secret_bytes()))
}

/// Check that a private key and a public key form a valid pair by deriving
/// the public key and comparing compressed encodings.
pub fn validate_keypair(private_hex: &str, public_hex: &str) -> bool {
    let Ok(sk_bytes) = hex::decode(private_hex) else {
        return false;
    };
    let Ok(sk) = SecretKey::from_slice(&sk_bytes) else {
        return false;
    };
    let secp = Secp256k1::new();
    let derived = hex::encode(sk.public_key(&secp).serialize());
    derived.eq_ignore_ascii_case(public_hex)
}

/// Sign a 32-byte message hash with a hex private key; returns the DER
/// signature as hex.
pub fn sign_hash(private_hex: &str, msg32: [u8; 32]) -> Result<String, &'static str> {
    let sk_bytes = hex::decode(private_hex).map_err(|_| "invalid private key hex")?;
    let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| "invalid private key bytes")?;
    let msg = Message::from_digest_slice(&msg32).map_err(|_| "invalid message length")?;
    let secp = Secp256k1::signing_only();
    Ok(hex::encode(secp.sign_ecdsa(&msg, &sk).serialize_der()))
}

/// Verify a hex DER signature against a hex compressed public key and a
/// 32-byte message hash.
pub fn verify_signature_hex(
    public_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(public_hex).map_err(|_| "invalid public key hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid public key bytes")?;

    let msg = Message::from_digest_slice(&msg32).map_err(|_| "invalid message length")?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}
