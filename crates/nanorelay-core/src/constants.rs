//! Protocol constants for the payment-coordination server.

/// Address display-string prefix (e.g. `nano_...`-style checksummed base-32).
pub const ADDRESS_PREFIX: &str = "xrb";

/// Base-unit exponent used when converting the HTTP layer's decimal display
/// amounts to/from raw integer amounts. 10^30 matches the target ledger's
/// raw-unit convention; only the HTTP boundary ever performs this conversion.
pub const RAW_EXPONENT: u32 = 30;

/// Per-subscriber WS multiplexer channel capacity (§4.5).
pub const WS_CHANNEL_CAPACITY: usize = 32;

/// Default `wait` timeout in seconds when the caller does not specify one.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 1800;

/// `sendBlock`'s internal confirmation-wait bound (§4.6).
pub const SEND_CONFIRMATION_TIMEOUT_SECS: u64 = 60;

/// Scavenger tick interval (§4.10).
pub const SCAVENGER_TICK_SECS: u64 = 60;

/// Age threshold past which an allocation is considered stale (§4.10).
pub const ALLOCATION_EXPIRY_SECS: i64 = 3600;

/// Config-table key under which the hex-encoded master seed is stored (§6).
pub const CONFIG_KEY_WALLET_SEED: &str = "wallet_seed";

/// Sentinel value for an unassigned allocation row (§3).
pub const ALLOCATION_FREE_SENTINEL: &str = "";
