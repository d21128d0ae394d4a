//! Access token verification.
//!
//! Tokens are minted by the identity provider and signed with a shared HMAC
//! secret; the API only verifies them. [`JwtService::issue_dev_token`] lets
//! local tooling hand out tokens for seeded users.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Claims;
use crate::config::JwtSettings;

/// Verification settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Required `iss` claim, if the provider sets one.
    pub issuer: Option<String>,
    /// Clock skew tolerated on `exp`.
    pub leeway_secs: u64,
    /// Lifetime of tokens issued for local tooling.
    pub dev_token_ttl_secs: i64,
}

impl From<&JwtSettings> for JwtConfig {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            secret: settings.secret.clone(),
            issuer: settings.issuer.clone(),
            leeway_secs: settings.leeway_secs,
            dev_token_ttl_secs: settings.dev_token_ttl_secs,
        }
    }
}

/// Why a token was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwtError {
    /// `exp` is in the past, beyond the leeway.
    #[error("token has expired")]
    Expired,

    /// `iss` is missing or names another issuer.
    #[error("token issuer is not trusted")]
    UntrustedIssuer,

    /// Bad signature, bad encoding or missing claims.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signing a development token failed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Verifies access tokens against the shared secret.
#[derive(Clone)]
pub struct JwtService {
    issuer: Option<String>,
    dev_token_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Builds a verifier for HS256 tokens.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            dev_token_ttl: Duration::seconds(config.dev_token_ttl_secs),
            issuer: config.issuer,
            validation,
        }
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// * `Expired` once `exp` plus the leeway has passed
    /// * `UntrustedIssuer` if an issuer is configured and the token's differs
    /// * `Malformed` for anything else
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                ErrorKind::InvalidIssuer => JwtError::UntrustedIssuer,
                ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => {
                    JwtError::UntrustedIssuer
                }
                _ => JwtError::Malformed(e.to_string()),
            })
    }

    /// Signs claims with the shared secret, stamping the configured issuer.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        let claims = match (&self.issuer, &claims.iss) {
            (Some(issuer), None) => claims.clone().with_issuer(issuer.clone()),
            _ => claims.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Issues a short-lived token for a seeded user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn issue_dev_token(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: &str,
        name: Option<&str>,
    ) -> Result<String, JwtError> {
        let mut claims = Claims::new(user_id, tenant_id, role, Utc::now() + self.dev_token_ttl);
        if let Some(name) = name {
            claims = claims.with_name(name);
        }
        self.sign(&claims)
    }
}
