use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};

type Blake2b64 = Blake2b<U8>;

/// Compute the PoW work value for `nonce` against `previous`: the 8-byte
/// BLAKE2b digest of `nonce || previous`, read back as a little-endian u64.
/// Higher values are "more work" — this mirrors the threshold scheme this
/// ledger family's proof-of-work uses.
fn work_value(previous: &[u8; 32], nonce: u64) -> u64 {
    let mut hasher = Blake2b64::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(previous);
    let digest = hasher.finalize();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest);
    u64::from_le_bytes(buf)
}

/// True if `nonce` meets `difficulty` (a minimum work-value threshold) for `previous`.
pub fn verify(previous: &[u8; 32], nonce: u64, difficulty: u64) -> bool {
    work_value(previous, nonce) >= difficulty
}

/// Brute-force search for a nonce meeting `difficulty` for `previous`.
/// Run on a blocking thread by the caller — this can take real wall-clock time
/// at production difficulties.
pub fn generate_local(previous: &[u8; 32], difficulty: u64) -> u64 {
    for nonce in 0u64.. {
        if verify(previous, nonce, difficulty) {
            return nonce;
        }
    }
    unreachable!("PoW search exhausted u64 range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_verify() {
        let previous = [3u8; 32];
        // Low difficulty so the test completes quickly.
        let difficulty = 1u64 << 8;
        let nonce = generate_local(&previous, difficulty);
        assert!(verify(&previous, nonce, difficulty));
    }

    #[test]
    fn different_previous_changes_work_value() {
        let a = work_value(&[1u8; 32], 42);
        let b = work_value(&[2u8; 32], 42);
        assert_ne!(a, b);
    }
}
