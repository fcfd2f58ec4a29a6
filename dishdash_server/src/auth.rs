//! Access tokens.
//!
//! Users sign in with their email and password and receive an HS256 JWT carrying their profile id and role. The
//! [`crate::middleware::JwtMiddlewareFactory`] validates the bearer token on every `/api` request and stores the
//! [`JwtClaims`] in the request extensions, where handlers pick them up as an extractor.
//!
//! Signing out revokes every token issued to the user up to that moment. Revocations are held in memory by the
//! [`TokenIssuer`], so a restart forgets them; tokens still expire on their own.
use std::{
    collections::HashMap,
    future::{ready, Ready},
    sync::{Arc, RwLock},
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use dishdash_engine::db_types::{CurrentUser, Profile, Role};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The profile id
    pub sub: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn user(&self) -> CurrentUser {
        CurrentUser::new(self.sub, self.role)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("💻️ No JWT claims found in request extensions for {}", req.path());
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

/// Issues and validates access tokens, and remembers sign-outs.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
    // user id -> unix time of their last sign-out
    revoked: Arc<RwLock<HashMap<i64, i64>>>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenIssuer(expiry: {}h)", self.expiry.num_hours())
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry: config.token_expiry,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn revoked_at(&self, user_id: i64) -> Option<i64> {
        let revoked = self.revoked.read().unwrap_or_else(|e| e.into_inner());
        revoked.get(&user_id).copied()
    }

    /// Issues a new access token for the given profile.
    /// This method DOES NOT check the user's credentials. That must be done prior to calling `issue_token`.
    pub fn issue_token(&self, profile: &Profile) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        // A token must post-date the user's last sign-out, even within the same second
        let iat = match self.revoked_at(profile.id) {
            Some(t) if t >= now => t + 1,
            _ => now,
        };
        let claims = JwtClaims { sub: profile.id, role: profile.role, iat, exp: iat + self.expiry.num_seconds() };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))?;
        debug!("🔑️ Issued access token for user #{} ({})", profile.id, profile.role);
        Ok(token)
    }

    /// Checks the token's signature, expiry and revocation status, returning its claims.
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        let claims = data.claims;
        if self.revoked_at(claims.sub).is_some_and(|t| claims.iat <= t) {
            debug!("🔑️ Rejected revoked token for user #{}", claims.sub);
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    /// Revokes every token issued to `user_id` up to now.
    pub fn revoke_all(&self, user_id: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().unwrap_or_else(|e| e.into_inner());
        revoked.insert(user_id, now);
        info!("🔑️ All tokens for user #{user_id} revoked");
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}
