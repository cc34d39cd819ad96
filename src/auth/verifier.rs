use crate::auth::keys::{KeyFetchError, PublicKeyCache};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenVerificationError {
    #[error("key fetch error: {0}")]
    KeyFetchError(#[from] KeyFetchError),
    #[error("JWT validation error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Decoded ID-token claims. Custom claims (the `roles` array among them) land
/// in the flattened map.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub user_id: String,
    pub email: Option<String>,
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Verifies caller ID tokens against the project's issuer and Google's
/// published certificates.
#[derive(Clone)]
pub struct IdTokenVerifier {
    project_id: String,
    keys: PublicKeyCache,
}

impl IdTokenVerifier {
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            keys: PublicKeyCache::new(),
        }
    }

    pub fn new_with_keys(project_id: String, keys: PublicKeyCache) -> Self {
        Self { project_id, keys }
    }

    pub async fn verify(&self, token: &str) -> Result<IdTokenClaims, TokenVerificationError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or_else(|| {
            TokenVerificationError::InvalidToken("missing kid in header".to_string())
        })?;

        let pem = self.keys.get_key(&kid).await?;
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let data = decode::<IdTokenClaims>(token, &key, &validation)?;
        if data.claims.sub.is_empty() {
            return Err(TokenVerificationError::InvalidToken(
                "empty subject claim".to_string(),
            ));
        }
        Ok(data.claims)
    }
}
