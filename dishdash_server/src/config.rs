use std::{env, io::Write};

use chrono::Duration;
use dd_common::{parse_boolean_flag, parse_env_or_default, Money, Secret, DEFAULT_CURRENCY_CODE};
use dishdash_engine::helpers::{FeeSchedule, DEFAULT_ADMIN_FEE, DEFAULT_GATEWAY_FEE_BPS};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use razorpay_tools::RazorpayConfig;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_DD_HOST: &str = "127.0.0.1";
const DEFAULT_DD_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/dishdash.db";
const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;
const DEFAULT_AVAILABILITY_TIMEOUT_MINS: i64 = 30;
const DEFAULT_EXPIRY_SWEEP_SECONDS: u64 = 60;
/// HS256 secrets shorter than this are refused.
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Bring the schema up to date before accepting requests.
    pub run_migrations: bool,
    pub auth: AuthConfig,
    /// How long a vendor has to answer an availability request before it expires.
    pub availability_timeout: Duration,
    /// How often the expiry worker looks for stale availability requests.
    pub expiry_sweep_interval: std::time::Duration,
    pub fees: FeeSchedule,
    pub currency: String,
    pub razorpay: RazorpayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DD_HOST.to_string(),
            port: DEFAULT_DD_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            run_migrations: true,
            auth: AuthConfig::default(),
            availability_timeout: Duration::minutes(DEFAULT_AVAILABILITY_TIMEOUT_MINS),
            expiry_sweep_interval: std::time::Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECONDS),
            fees: FeeSchedule::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            razorpay: RazorpayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DD_HOST").ok().unwrap_or_else(|| DEFAULT_DD_HOST.into());
        let port = parse_env_or_default("DD_PORT", DEFAULT_DD_PORT);
        let database_url = env::var("DD_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ DD_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let run_migrations = parse_boolean_flag(env::var("DD_RUN_MIGRATIONS").ok(), true);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let (availability_timeout, expiry_sweep_interval) = configure_expiry();
        let fees = configure_fees();
        let currency = env::var("DD_CURRENCY")
            .map(|s| s.trim().to_ascii_uppercase())
            .ok()
            .filter(|s| s.len() == 3)
            .unwrap_or_else(|| {
                info!("🪛️ DD_CURRENCY is not set or invalid. Using {DEFAULT_CURRENCY_CODE}.");
                DEFAULT_CURRENCY_CODE.to_string()
            });
        let razorpay = RazorpayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            run_migrations,
            auth,
            availability_timeout,
            expiry_sweep_interval,
            fees,
            currency,
            razorpay,
        }
    }
}

fn configure_expiry() -> (Duration, std::time::Duration) {
    let mins = parse_env_or_default("DD_AVAILABILITY_TIMEOUT", DEFAULT_AVAILABILITY_TIMEOUT_MINS);
    let mins = if mins > 0 {
        mins
    } else {
        warn!("🪛️ DD_AVAILABILITY_TIMEOUT must be positive. Using {DEFAULT_AVAILABILITY_TIMEOUT_MINS} minutes.");
        DEFAULT_AVAILABILITY_TIMEOUT_MINS
    };
    let secs = parse_env_or_default("DD_EXPIRY_SWEEP_SECONDS", DEFAULT_EXPIRY_SWEEP_SECONDS).max(1);
    info!("🪛️ Availability requests expire after {mins} minutes. Sweeping every {secs}s.");
    (Duration::minutes(mins), std::time::Duration::from_secs(secs))
}

fn configure_fees() -> FeeSchedule {
    let admin_fee = parse_env_or_default("DD_ADMIN_FEE", DEFAULT_ADMIN_FEE);
    let admin_fee = if admin_fee >= 0 {
        admin_fee
    } else {
        warn!("🪛️ DD_ADMIN_FEE cannot be negative. Using {DEFAULT_ADMIN_FEE}.");
        DEFAULT_ADMIN_FEE
    };
    let bps = parse_env_or_default("DD_GATEWAY_FEE_BPS", DEFAULT_GATEWAY_FEE_BPS);
    let bps = if bps <= 10_000 {
        bps
    } else {
        warn!("🪛️ DD_GATEWAY_FEE_BPS cannot exceed 10000. Using {DEFAULT_GATEWAY_FEE_BPS}.");
        DEFAULT_GATEWAY_FEE_BPS
    };
    let fees = FeeSchedule::new(Money::from(admin_fee), bps);
    info!("🪛️ Fee schedule: admin fee {}, gateway fee {bps} bps", fees.admin_fee);
    fees
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC secret used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    pub token_expiry: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every restart will sign all users out. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the DD_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret), token_expiry: Duration::hours(DEFAULT_TOKEN_EXPIRY_HOURS) }
    }
}

impl AuthConfig {
    pub fn new(secret: &str, token_expiry: Duration) -> Self {
        Self { jwt_secret: Secret::from(secret), token_expiry }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("DD_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [DD_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "DD_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        let hours = parse_env_or_default("DD_JWT_EXPIRY_HOURS", DEFAULT_TOKEN_EXPIRY_HOURS).max(1);
        Ok(Self { jwt_secret: Secret::new(secret), token_expiry: Duration::hours(hours) })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that handlers need. Secrets are deliberately left out.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// The public gateway key the client needs to open the payment checkout.
    pub gateway_key_id: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { gateway_key_id: config.razorpay.key_id.clone() }
    }
}
