use sqlx::SqliteConnection;

use super::is_unique_violation_on;
use crate::{
    db_types::{NewProfile, Profile},
    traits::AuthApiError,
};

/// Emails are stored lower-cased; lookups must normalise the same way.
pub async fn insert_profile(profile: NewProfile, conn: &mut SqliteConnection) -> Result<Profile, AuthApiError> {
    sqlx::query_as(
        r#"
            INSERT INTO profiles (email, password_hash, role, full_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(profile.email.trim().to_lowercase())
    .bind(profile.password_hash)
    .bind(profile.role)
    .bind(profile.full_name)
    .bind(profile.phone)
    .fetch_one(conn)
    .await
    .map_err(|e| if is_unique_violation_on(&e, "email") { AuthApiError::DuplicateEmail } else { e.into() })
}

pub async fn fetch_profile(id: i64, conn: &mut SqliteConnection) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM profiles WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_profile_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM profiles WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(conn)
        .await
}
