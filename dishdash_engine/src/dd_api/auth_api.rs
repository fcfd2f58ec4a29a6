use std::fmt::Debug;

use log::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewProfile, Profile, Role},
    helpers::{hash_password, verify_password},
    traits::{AuthApiError, AuthManagement},
};

const MIN_PASSWORD_LENGTH: usize = 8;
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// The details a new user signs up with.
#[derive(Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"****")
            .field("role", &self.role)
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// `AuthApi` registers users and checks their credentials. Token issuance is left to the host.
pub struct AuthApi<B> {
    db: B,
    email_re: Regex,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        // constant pattern
        let email_re = Regex::new(EMAIL_PATTERN).unwrap();
        Self { db, email_re }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn validate(&self, account: &NewAccount) -> Result<(), AuthApiError> {
        if !self.email_re.is_match(account.email.trim()) {
            return Err(AuthApiError::InvalidDetails("email address is not valid".into()));
        }
        if account.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthApiError::InvalidDetails(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        if account.full_name.trim().is_empty() {
            return Err(AuthApiError::InvalidDetails("a name is required".into()));
        }
        if account.role == Role::Admin {
            return Err(AuthApiError::InvalidDetails("admin accounts cannot be created by sign-up".into()));
        }
        Ok(())
    }
}

impl<B: AuthManagement> AuthApi<B> {
    pub async fn sign_up(&self, account: NewAccount) -> Result<Profile, AuthApiError> {
        self.validate(&account)?;
        let password_hash = hash_password(&account.password).map_err(|e| AuthApiError::DatabaseError(e.to_string()))?;
        let profile = NewProfile {
            email: account.email.trim().to_lowercase(),
            password_hash,
            role: account.role,
            full_name: account.full_name.trim().to_string(),
            phone: account.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
        };
        let profile = self.db.insert_profile(profile).await?;
        info!("🔑️ New {} account #{} created", profile.role, profile.id);
        Ok(profile)
    }

    /// Checks credentials. Unknown emails and wrong passwords produce the same error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, AuthApiError> {
        let email = email.trim().to_lowercase();
        let Some(profile) = self.db.fetch_profile_by_email(&email).await? else {
            debug!("🔑️ Sign-in attempt for unknown email");
            return Err(AuthApiError::InvalidCredentials);
        };
        if !verify_password(password, &profile.password_hash) {
            debug!("🔑️ Wrong password for account #{}", profile.id);
            return Err(AuthApiError::InvalidCredentials);
        }
        Ok(profile)
    }

    pub async fn profile(&self, user_id: i64) -> Result<Option<Profile>, AuthApiError> {
        self.db.fetch_profile(user_id).await
    }
}
