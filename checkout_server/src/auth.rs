//! Bearer token verification.
//!
//! Tokens are issued by the identity service, not by this server. They are HS256 JWTs carrying the user id in `sub`
//! and the caller's roles. The identity middleware verifies the token and stores the resulting [`Identity`] in the
//! request extensions, from where handlers extract it.
use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use checkout_common::Secret;
use checkout_engine::db_types::{Caller, Role};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id, as a string
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Expiry, in seconds since the Unix epoch
    pub exp: i64,
}

/// The verified caller behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(Caller);

impl Identity {
    pub fn new(caller: Caller) -> Self {
        Self(caller)
    }
}

impl Deref for Identity {
    type Target = Caller;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<JwtClaims> for Identity {
    type Error = AuthError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|e| AuthError::ValidationError(format!("Subject '{}' is not a user id. {e}", claims.sub)))?;
        Ok(Self(Caller { user_id, roles: claims.roles }))
    }
}

impl FromRequest for Identity {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().cloned().ok_or_else(|| {
            warn!("💻️ No identity found in request extensions. Is the identity middleware installed?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(identity)
    }
}

/// Verifies HS256 bearer tokens against the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &Secret<String>) -> Self {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        let identity = Identity::try_from(data.claims)?;
        trace!("💻️ Access token verified for user {}", identity.user_id);
        Ok(identity)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a bearer token".to_string()))
}
