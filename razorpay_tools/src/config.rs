use dd_common::Secret;
use log::*;

pub const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Default)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_url: String,
}

impl RazorpayConfig {
    pub fn new(key_id: &str, key_secret: &str) -> Self {
        Self { key_id: key_id.to_string(), key_secret: Secret::from(key_secret), api_url: DEFAULT_API_URL.to_string() }
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("DD_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("💳️ DD_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("DD_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("💳️ DD_RAZORPAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let api_url = std::env::var("DD_RAZORPAY_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self { key_id, key_secret, api_url }
    }
}
