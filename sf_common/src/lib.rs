mod helpers;
mod money;
mod secret;

pub use helpers::{parse_boolean_flag, parse_duration_secs};
pub use money::{Money, MoneyConversionError};
pub use secret::Secret;
