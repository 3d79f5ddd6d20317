//! Wall-clock access, isolated so callers can see where "now" enters the system.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Timestamp;

pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as Timestamp
}
