/// Bearer token validation
///
/// Tokens are issued by the external OpenID Connect provider and signed with
/// a shared HS256 secret. This module validates them and exposes the claims
/// the backend cares about (`sub`, `name`, `email`). Token minting is only
/// used by tests and local tooling.
///
/// # Example
///
/// ```
/// use vesselmark_shared::auth::jwt::{create_token, Claims, TokenValidator};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-development-secret-of-at-least-32-bytes";
/// let claims = Claims::new("oidc|alice", "https://id.example.org").with_name("Alice");
/// let token = create_token(&claims, secret)?;
///
/// let validator = TokenValidator::new(secret, "https://id.example.org", None);
/// let validated = validator.validate(&token)?;
/// assert_eq!(validated.sub, "oidc|alice");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Issuer does not match the configured provider
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Audience does not match the configured client
    #[error("Invalid audience")]
    InvalidAudience,
}

/// `aud` claim, which providers send either as one string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Claims read from identity-provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - stable external user identity
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience (client id), when the provider sets one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp); optional in OIDC tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    /// Claims valid for one hour from now
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self::with_expiration(subject, issuer, Duration::hours(1))
    }

    /// Claims valid for `expires_in` from now
    pub fn with_expiration(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.into(),
            iss: issuer.into(),
            aud: None,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: Some(now.timestamp()),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.aud = Some(Audience::One(audience.into()));
        self
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates tokens against one issuer and optional audience
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    issuer: String,
    audience: Option<String>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(secret: &str, issuer: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience,
        }
    }

    /// Verifies signature, expiry, not-before, issuer and audience
    ///
    /// # Errors
    ///
    /// Returns `Expired`, `InvalidIssuer`, `InvalidAudience` or a generic
    /// `ValidationError` describing the failure.
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        match &self.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Claims>(token, &self.key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                    expected: self.issuer.clone(),
                },
                jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
                _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
            }
        })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(JwtError::ValidationError("Token has an empty subject".to_string()));
        }

        Ok(token_data.claims)
    }
}
