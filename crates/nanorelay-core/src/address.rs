//! Checksummed display-address codec (§3.1).
//!
//! The encoding is the usual scheme for this ledger family: the public key is
//! grouped into 5-bit symbols over a custom alphabet, and a 5-byte BLAKE2b
//! checksum of the key (reversed) is appended before re-encoding. The exact
//! alphabet and prefix are implementation constants, not a requirement this
//! server must match byte-for-byte against any particular running chain.

use blake2::digest::consts::U5;
use blake2::{Blake2b, Digest};

use crate::constants::ADDRESS_PREFIX;
use crate::error::PaymentError;

const ALPHABET: &[u8] = b"13456789abcdefghijkmnopqrstuwxyz";

type Blake2b40 = Blake2b<U5>;

fn checksum(pubkey: &[u8; 32]) -> [u8; 5] {
    let mut hasher = Blake2b40::new();
    hasher.update(pubkey);
    let digest = hasher.finalize();
    let mut out = [0u8; 5];
    out.copy_from_slice(&digest);
    out.reverse();
    out
}

/// Big-endian bitstream of `key || checksum`, front-padded with 4 zero bits
/// so the 296-bit payload divides evenly into 60 five-bit symbols.
fn bitstream(key: &[u8; 32], cs: &[u8; 5]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(4 + 256 + 40);
    bits.extend(std::iter::repeat(0u8).take(4));
    for byte in key.iter().chain(cs.iter()) {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

pub fn encode(pubkey: &[u8; 32]) -> String {
    let cs = checksum(pubkey);
    let bits = bitstream(pubkey, &cs);
    let mut symbols = String::with_capacity(60);
    for chunk in bits.chunks(5) {
        let mut v = 0u8;
        for b in chunk {
            v = (v << 1) | b;
        }
        symbols.push(ALPHABET[v as usize] as char);
    }
    format!("{}_{}", ADDRESS_PREFIX, symbols)
}

pub fn decode(s: &str) -> Result<[u8; 32], PaymentError> {
    let (prefix, body) = s
        .split_once('_')
        .ok_or_else(|| PaymentError::validation("address missing prefix separator"))?;
    if prefix != ADDRESS_PREFIX {
        return Err(PaymentError::validation(format!(
            "unrecognized address prefix: {prefix}"
        )));
    }
    if body.len() != 60 {
        return Err(PaymentError::validation("address has wrong length"));
    }

    let mut bits = Vec::with_capacity(body.len() * 5);
    for c in body.bytes() {
        let v = ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| PaymentError::validation("address contains invalid character"))?;
        for i in (0..5).rev() {
            bits.push(((v >> i) & 1) as u8);
        }
    }
    // Drop the 4 leading pad bits.
    let bits = &bits[4..];
    if bits.len() != 256 + 40 {
        return Err(PaymentError::validation("address decodes to wrong bit length"));
    }

    let mut key = [0u8; 32];
    for (i, chunk) in bits[..256].chunks(8).enumerate() {
        let mut byte = 0u8;
        for b in chunk {
            byte = (byte << 1) | b;
        }
        key[i] = byte;
    }
    let mut cs = [0u8; 5];
    for (i, chunk) in bits[256..].chunks(8).enumerate() {
        let mut byte = 0u8;
        for b in chunk {
            byte = (byte << 1) | b;
        }
        cs[i] = byte;
    }

    if cs != checksum(&key) {
        return Err(PaymentError::validation("address checksum mismatch"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 32];
        let display = encode(&key);
        assert!(display.starts_with("xrb_"));
        let decoded = decode(&display).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn rejects_bad_checksum() {
        let key = [7u8; 32];
        let mut display = encode(&key);
        let last = display.pop().unwrap();
        let replacement = if last == '1' { '3' } else { '1' };
        display.push(replacement);
        assert!(decode(&display).is_err());
    }
}
