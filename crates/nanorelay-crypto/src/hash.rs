use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Compute the 32-byte BLAKE2b hash of arbitrary bytes.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hash a state block's signing bytes into its on-chain identifier (§4.6).
pub fn block_hash(signing_bytes: &[u8]) -> nanorelay_core::BlockHash {
    nanorelay_core::BlockHash::from_bytes(blake2b_256(signing_bytes))
}
