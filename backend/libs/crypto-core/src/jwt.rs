/// Shared JWT issuance and validation for Ridehail services
///
/// Tokens are HS256-signed JSON claim sets. The signing secret and issuer are
/// injected through [`TokenConfig`] when the issuer is constructed; nothing is
/// read from process-wide state.
///
/// ## Security Design
///
/// - **Typed claims**: access and refresh tokens have distinct claim structures
/// - **Minimal refresh claims**: refresh tokens carry no email or role
/// - **Single failure signal**: every verification failure (forged, malformed,
///   expired, wrong issuer, wrong token kind) is reported as the same [`TokenError`]
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use crypto_core::{SystemClock, TokenConfig, TokenIssuer};
/// use uuid::Uuid;
///
/// let config = TokenConfig::new("a-very-long-development-secret-value!!", "ridehail");
/// let issuer = TokenIssuer::new(config, Arc::new(SystemClock));
///
/// let user_id = Uuid::new_v4();
/// let token = issuer.issue_access(user_id, "rider@example.com", "rider").unwrap();
/// let claims = issuer.verify_access(&token).unwrap();
/// assert_eq!(claims.subject_id, user_id);
/// ```
use crate::clock::Clock;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

pub const ACCESS_TOKEN_EXPIRY_HOURS: i64 = 24;
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Errors
// ============================================================================

/// Token verification failure
///
/// Deliberately carries no detail: callers cannot tell an expired token from a
/// forged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct TokenError;

/// Token signing failure (key misconfiguration)
#[derive(Debug, thiserror::Error)]
#[error("failed to sign {kind} token: {message}")]
pub struct SigningError {
    pub kind: TokenKind,
    pub message: String,
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims embedded in an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "sub")]
    pub subject_id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub token_type: TokenKind,
}

/// Claims embedded in a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "sub")]
    pub subject_id: Uuid,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    pub token_type: TokenKind,
}

/// Token pair response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

trait ClaimSet: DeserializeOwned {
    const KIND: TokenKind;

    fn issuer(&self) -> &str;
    fn expires_at(&self) -> i64;
    fn token_type(&self) -> TokenKind;
}

impl ClaimSet for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn expires_at(&self) -> i64 {
        self.expires_at
    }

    fn token_type(&self) -> TokenKind {
        self.token_type
    }
}

impl ClaimSet for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn expires_at(&self) -> i64 {
        self.expires_at
    }

    fn token_type(&self) -> TokenKind {
        self.token_type
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Signing context handed to [`TokenIssuer::new`]
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Config with the default lifetimes (24h access, 7d refresh)
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            access_ttl: Duration::hours(ACCESS_TOKEN_EXPIRY_HOURS),
            refresh_ttl: Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

// ============================================================================
// Issuer
// ============================================================================

/// Builds, signs and verifies access and refresh tokens
///
/// Immutable after construction and safe to share across tasks.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(JWT_ALGORITHM);
        // Expiry and issuer are checked by `verify` after the signature, against the injected clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            clock,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Generate a new access token
    ///
    /// Claims: subject, email, role, issuer, expiry = now + access TTL.
    pub fn issue_access(
        &self,
        subject_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<String, SigningError> {
        let now = self.clock.now();
        let claims = AccessClaims {
            subject_id,
            email: email.to_string(),
            role: role.to_string(),
            issuer: self.issuer.clone(),
            issued_at: now.timestamp(),
            expires_at: (now + self.access_ttl).timestamp(),
            token_type: TokenKind::Access,
        };
        self.sign(&claims, TokenKind::Access)
    }

    /// Generate a new refresh token
    ///
    /// Carries only subject, issuer and expiry so a leaked refresh token
    /// discloses nothing about the account.
    pub fn issue_refresh(&self, subject_id: Uuid) -> Result<String, SigningError> {
        let now = self.clock.now();
        let claims = RefreshClaims {
            subject_id,
            issuer: self.issuer.clone(),
            issued_at: now.timestamp(),
            expires_at: (now + self.refresh_ttl).timestamp(),
            token_type: TokenKind::Refresh,
        };
        self.sign(&claims, TokenKind::Refresh)
    }

    /// Generate both access and refresh tokens
    pub fn issue_pair(
        &self,
        subject_id: Uuid,
        email: &str,
        role: &str,
    ) -> Result<TokenPair, SigningError> {
        let access_token = self.issue_access(subject_id, email, role)?;
        let refresh_token = self.issue_refresh(subject_id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Validate and decode an access token
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token)
    }

    /// Validate and decode a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token)
    }

    fn sign<C: Serialize>(&self, claims: &C, kind: TokenKind) -> Result<String, SigningError> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding_key).map_err(|e| {
            SigningError {
                kind,
                message: e.to_string(),
            }
        })
    }

    /// Signature first, then expiry, then issuer and token kind
    fn verify<C: ClaimSet>(&self, token: &str) -> Result<C, TokenError> {
        let claims = decode::<C>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, kind = %C::KIND, "token rejected: signature or structure");
                TokenError
            })?
            .claims;

        if claims.expires_at() <= self.clock.now().timestamp() {
            debug!(kind = %C::KIND, "token rejected: expired");
            return Err(TokenError);
        }

        if claims.issuer() != self.issuer {
            debug!(kind = %C::KIND, "token rejected: issuer mismatch");
            return Err(TokenError);
        }

        if claims.token_type() != C::KIND {
            debug!(kind = %C::KIND, "token rejected: wrong token kind");
            return Err(TokenError);
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
