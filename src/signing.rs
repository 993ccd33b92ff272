use sha2::{Digest, Sha512};

/// Where the shared secret sits in the provider's mandated field order.
/// PayU request hashes append the salt last; its response hashes prepend it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltPlacement {
    Leading,
    Trailing,
}

/// Keyed hash over a pipe-delimited field sequence. Field order, including
/// empty placeholder slots, is part of each provider's contract and must
/// match exactly on both sides.
pub fn sign(fields: &[&str], secret: &str, placement: SaltPlacement) -> String {
    let joined = fields.join("|");
    let message = match placement {
        SaltPlacement::Trailing => format!("{}|{}", joined, secret),
        SaltPlacement::Leading => format!("{}|{}", secret, joined),
    };

    let mut hasher = Sha512::new();
    hasher.update(message.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recomputes the hash and compares in constant time. Any mismatch,
/// including a length mismatch, is `false`; never panics.
pub fn verify(fields: &[&str], secret: &str, placement: SaltPlacement, candidate: &str) -> bool {
    let expected = sign(fields, secret, placement);
    constant_time_eq(expected.as_bytes(), candidate.to_lowercase().as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
