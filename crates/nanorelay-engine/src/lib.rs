//! Payment orchestration: the Key-Lock Table, the Reconciler (`waitReceive`),
//! the refund path, the Lifecycle Controller, and the Scavenger (§4.1,
//! §4.7–§4.10).

pub mod key_lock;
pub mod lifecycle;
pub mod reconciler;
pub mod refund;
pub mod scavenger;

pub use key_lock::{KeyLockGuard, KeyLockTable};
pub use lifecycle::LifecycleController;

#[cfg(test)]
mod tests;
