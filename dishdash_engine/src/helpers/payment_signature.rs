//! # Gateway payment signatures
//!
//! After a customer completes payment, the gateway hands the client three values: the intent (gateway order) id, the
//! payment id, and a signature. The signature is
//!
//! ```text
//!    hex(HMAC-SHA256(key_secret, "{intent_id}|{payment_id}"))
//! ```
//!
//! in lowercase hex. Only the gateway and this server know `key_secret`, so a valid signature proves the gateway
//! issued this payment id for this intent. Comparison is constant time.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentSignatureError {
    #[error("The signing key is empty")]
    EmptyKey,
    #[error("The signature is not valid hex")]
    MalformedSignature,
    #[error("The signature does not match")]
    Mismatch,
}

fn mac_for(key_secret: &str, intent_id: &str, payment_id: &str) -> Result<HmacSha256, PaymentSignatureError> {
    if key_secret.is_empty() {
        return Err(PaymentSignatureError::EmptyKey);
    }
    let mut mac = HmacSha256::new_from_slice(key_secret.as_bytes()).map_err(|_| PaymentSignatureError::EmptyKey)?;
    mac.update(intent_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Produces the signature the gateway would attach to `payment_id` for `intent_id`.
pub fn sign_payment(key_secret: &str, intent_id: &str, payment_id: &str) -> Result<String, PaymentSignatureError> {
    let mac = mac_for(key_secret, intent_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_payment_signature(
    key_secret: &str,
    intent_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), PaymentSignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| PaymentSignatureError::MalformedSignature)?;
    let mac = mac_for(key_secret, intent_id, payment_id)?;
    mac.verify_slice(&expected).map_err(|_| PaymentSignatureError::Mismatch)
}
