//! Core domain types shared by every crate in the workspace.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Raw, feeless base-unit amount. u128 comfortably holds the full raw-unit
/// supply of ledgers in this family without an arbitrary-precision type.
pub type Amount = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Wallet derivation index. 0 is reserved as a "none" sentinel (§3, §4.3).
pub type WalletIndex = u32;

// ── Address ──────────────────────────────────────────────────────────────────

/// A 32-byte account public key, with a checksummed display form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_display(&self) -> String {
        crate::address::encode(&self.0)
    }

    pub fn from_display(s: &str) -> Result<Self, crate::error::PaymentError> {
        crate::address::decode(s).map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_display())
    }
}

/// Serializes as its checksummed display string, not the underlying byte
/// array — this is what lets `StateBlock`'s `account`/`representative`
/// fields round-trip through the node's canonical block JSON (§3.1).
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_display())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_display(&s).map_err(serde::de::Error::custom)
    }
}

// ── BlockHash ────────────────────────────────────────────────────────────────

/// 32-byte state-block hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 32];
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}…)", &self.to_hex()[..16])
    }
}

/// Serializes as uppercase hex, matching the node's canonical block JSON (§3.1).
impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── PaymentId ────────────────────────────────────────────────────────────────

/// Payment identifier: 8 random bytes, base64url-encoded (§3).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl PaymentId {
    /// Generate a fresh id from 8 random bytes.
    pub fn generate() -> Self {
        use base64::Engine;
        let mut bytes = [0u8; 8];
        rand_bytes(&mut bytes);
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentId({})", self.0)
    }
}

fn rand_bytes(buf: &mut [u8]) {
    use rand::RngCore;
    rand::thread_rng().fill_bytes(buf);
}

// ── Payment ──────────────────────────────────────────────────────────────────

/// A payment record as stored by the Payment Store (§3, §4.2).
#[derive(Clone, Debug)]
pub struct Payment {
    pub id: PaymentId,
    pub merchant_account: Address,
    pub requested_amount: Amount,
    pub settled_hash: Option<BlockHash>,
}

// ── Allocation ───────────────────────────────────────────────────────────────

/// A wallet-index allocation row (§3, §4.3).
#[derive(Clone, Debug)]
pub struct Allocation {
    pub index: WalletIndex,
    pub assigned_to: Option<PaymentId>,
    pub assigned_at: Option<Timestamp>,
}

// ── State block ──────────────────────────────────────────────────────────────

/// `balance` on the wire is a decimal string, not a JSON number (§3.1).
mod amount_as_string {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Fixed-width byte arrays as uppercase hex strings (`link`, `signature`);
/// this is also what gives `signature: [u8; 64]` a serde impl at all, since
/// serde's blanket array support tops out at length 32.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<const N: usize, S: Serializer>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, const N: usize, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let decoded = hex::decode(&s).map_err(serde::de::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes, got a different length")))
    }
}

/// The canonical state-block wire shape (§6, GLOSSARY).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub account: Address,
    pub previous: BlockHash,
    pub representative: Address,
    #[serde(with = "amount_as_string")]
    pub balance: Amount,
    #[serde(with = "hex_bytes")]
    pub link: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub signature: [u8; 64],
    #[serde(default)]
    pub work: String,
}

impl StateBlock {
    pub fn is_state(&self) -> bool {
        self.block_type == "state"
    }

    /// Canonical byte encoding hashed and signed for this block (§4.6).
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 * 4 + 16);
        buf.extend_from_slice(self.account.as_bytes());
        buf.extend_from_slice(self.previous.as_bytes());
        buf.extend_from_slice(self.representative.as_bytes());
        buf.extend_from_slice(&self.balance.to_be_bytes());
        buf.extend_from_slice(&self.link);
        buf
    }
}

// ── Chain Adapter contract types (§4.4) ───────────────────────────────────────

/// Result of `accountInfo`: present account state, or "not found".
#[derive(Clone, Debug)]
pub struct AccountInfo {
    pub frontier: BlockHash,
    pub balance: Amount,
    pub block_count: u64,
    pub confirmation_height: u64,
}

impl AccountInfo {
    /// Quiescent per §4.3: fully confirmed and carrying no balance or pending.
    pub fn is_quiescent(&self, pending: Amount) -> bool {
        self.block_count == self.confirmation_height && self.balance == 0 && pending == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSubtype {
    Send,
    Receive,
    Change,
    Open,
    Epoch,
}

#[derive(Clone, Debug)]
pub struct BlockInfo {
    pub subtype: BlockSubtype,
    pub amount: Amount,
    pub block_account: Address,
    pub link: [u8; 32],
    pub previous: BlockHash,
}

/// A confirmation event pushed by the chain's WebSocket feed (§3).
#[derive(Clone, Debug)]
pub struct Confirmation {
    pub account: Address,
    pub link_as_account: Address,
    pub amount: Amount,
    pub block_hash: BlockHash,
    pub link: [u8; 32],
    pub balance: Amount,
    pub link_block: Option<BlockHash>,
}
