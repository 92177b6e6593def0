use crate::{credentials::Credentials, error::ConfigError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Seconds a token stays valid after it was issued.
pub const TOKEN_LIFETIME_SECS: i64 = 60;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub exp: i64,
}

/// A compact HS256 JWT together with the claims it was built from.
#[derive(Debug, Clone)]
pub struct SignedToken {
    token: String,
    claims: Claims,
}

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Issues a fresh token for `credentials` that expires a minute from now.
pub fn issue_token(credentials: &Credentials) -> Result<SignedToken, ConfigError> {
    issue_token_at(credentials, Utc::now().timestamp())
}

pub(crate) fn issue_token_at(
    credentials: &Credentials,
    now: i64,
) -> Result<SignedToken, ConfigError> {
    credentials.validate_signing()?;

    let claims = Claims {
        iss: credentials.api_key().to_string(),
        exp: now + TOKEN_LIFETIME_SECS,
    };
    let payload = serde_json::json!({ "iss": &claims.iss, "exp": claims.exp }).to_string();

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let mut mac = HmacSha256::new_from_slice(credentials.api_secret().as_bytes())
        .map_err(|_| ConfigError::InvalidSecret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(SignedToken {
        token: format!("{}.{}", signing_input, signature),
        claims,
    })
}

/// Checks the signature of a compact token and returns its claims.
#[cfg(test)]
pub(crate) fn verify(token: &str, secret: &str) -> Option<Claims> {
    let (signing_input, signature) = token.rsplit_once('.')?;
    let (header, payload) = signing_input.split_once('.')?;
    if URL_SAFE_NO_PAD.decode(header).ok()? != HEADER.as_bytes() {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&URL_SAFE_NO_PAD.decode(signature).ok()?).ok()?;

    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()
}
