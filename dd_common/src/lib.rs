mod helpers;
mod money;

pub mod op;
mod secret;

pub use helpers::{parse_boolean_flag, parse_env_or_default};
pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE, MINOR_UNITS_PER_MAJOR};
pub use secret::Secret;
