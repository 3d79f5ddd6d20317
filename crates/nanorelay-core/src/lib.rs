pub mod address;
pub mod amount;
pub mod constants;
pub mod error;
pub mod time;
pub mod types;

pub use amount::{display_to_raw, raw_to_display};
pub use constants::*;
pub use error::PaymentError;
pub use time::unix_now;
pub use types::*;
