use thiserror::Error;

use crate::db_types::{NewProfile, Profile};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("An account with this email address already exists")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid sign-up details: {0}")]
    InvalidDetails(String),
    #[error("Profile {0} does not exist")]
    ProfileNotFound(i64),
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, AuthApiError>;

    async fn fetch_profile(&self, user_id: i64) -> Result<Option<Profile>, AuthApiError>;

    async fn fetch_profile_by_email(&self, email: &str) -> Result<Option<Profile>, AuthApiError>;
}
