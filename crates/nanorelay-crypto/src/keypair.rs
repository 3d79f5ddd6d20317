use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use nanorelay_core::Address;
use zeroize::Zeroizing;

use crate::hash::blake2b_256;

/// An ed25519 keypair for an ephemeral receive account, derived deterministically
/// from the master seed and a wallet index (§4.3).
///
/// The signing key is held in a `Zeroizing` wrapper so its bytes are wiped on drop.
pub struct KeyPair {
    pub account: Address,
    verifying_key: VerifyingKey,
    signing_key: Zeroizing<[u8; 32]>,
}

impl KeyPair {
    /// Derive the keypair for `index` deterministically from `seed`.
    ///
    /// This reimplements the single capability this server consumes from the
    /// (out-of-scope) wallet/seed key-derivation library: `blake2b(seed ||
    /// index_be)` is expanded into a signing-key seed, matching the
    /// single-master-seed design in the glossary's "ephemeral receive account"
    /// entry.
    pub fn derive(seed: &[u8; 32], index: u32) -> Self {
        let mut preimage = Vec::with_capacity(36);
        preimage.extend_from_slice(seed);
        preimage.extend_from_slice(&index.to_be_bytes());
        let sk_seed = blake2b_256(&preimage);
        Self::from_signing_seed(sk_seed)
    }

    /// Generate a fresh random keypair (used for tests and genesis helpers).
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_signing_seed(seed)
    }

    fn from_signing_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        let account = Address::from_bytes(verifying_key.to_bytes());
        Self {
            account,
            verifying_key,
            signing_key: Zeroizing::new(seed),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signing_key = SigningKey::from_bytes(&self.signing_key);
        signing_key.sign(message).to_bytes()
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ account: {:?} }}", self.account)
    }
}

/// Verify a 64-byte signature against an account's public key (§4.6).
pub fn verify_signature(account: &Address, message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(account.as_bytes()) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    vk.verify_strict(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let seed = [9u8; 32];
        let a = KeyPair::derive(&seed, 3);
        let b = KeyPair::derive(&seed, 3);
        assert_eq!(a.account, b.account);
    }

    #[test]
    fn different_indexes_differ() {
        let seed = [9u8; 32];
        let a = KeyPair::derive(&seed, 1);
        let b = KeyPair::derive(&seed, 2);
        assert_ne!(a.account, b.account);
    }

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::derive(&[1u8; 32], 5);
        let msg = b"hello";
        let sig = kp.sign(msg);
        assert!(verify_signature(&kp.account, msg, &sig));
        assert!(!verify_signature(&kp.account, b"tampered", &sig));
    }
}
