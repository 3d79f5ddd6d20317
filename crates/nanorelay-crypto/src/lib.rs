pub mod hash;
pub mod keypair;
pub mod pow;

pub use hash::{block_hash, blake2b_256};
pub use keypair::{verify_signature, KeyPair};
