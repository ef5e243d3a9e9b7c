use sha2::{Digest, Sha256};

/// Combine two hex-encoded hashes into one: SHA-256 over the concatenated
/// strings, returned as lowercase hex. The block hash uses the same primitive.
pub fn combine_hash(a: &str, b: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(a.as_bytes());
    hasher.update(b.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the Merkle root of an ordered list of transaction hashes.
///
/// Pairing rule: neighbours are combined left-to-right; a level with an odd
/// count pairs its last element with itself; a single leaf is hashed with
/// itself (a leaf never stands uncombined); an empty list yields the empty
/// string. This exact rule is load-bearing for hash compatibility; it is
/// not the canonical incremental Merkle construction.
pub fn merkle_root(hashes: &[String]) -> String {
    if hashes.is_empty() {
        return String::new();
    }
    if hashes.len() == 1 {
        return combine_hash(&hashes[0], &hashes[0]);
    }

    let mut level: Vec<String> = hashes.to_vec();
    while level.len() != 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(combine_hash(left, right)),
                [odd] => next.push(combine_hash(odd, odd)),
                _ => unreachable!("chunks(2) yields one or two elements"),
            }
        }
        level = next;
    }
    level.remove(0)
}
