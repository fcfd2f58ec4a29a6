mod fee_split;
mod passwords;
mod payment_signature;

pub use fee_split::{FeeSchedule, DEFAULT_ADMIN_FEE, DEFAULT_GATEWAY_FEE_BPS};
pub use passwords::{hash_password, verify_password, PasswordError};
pub use payment_signature::{sign_payment, verify_payment_signature, PaymentSignatureError};
