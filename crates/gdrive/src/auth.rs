//! Service-account authentication.
//!
//! Implements the OAuth 2.0 JWT bearer grant: a claim set naming the
//! service account and the requested scope is signed with the account's
//! RSA key and exchanged at the token endpoint for a short-lived access
//! token. Tokens are cached and refreshed shortly before they expire.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires.
const EXPIRY_SLACK_SECS: i64 = 60;

/// A Google service-account key, as downloaded from the Cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Credential type. Must be `service_account`.
    #[serde(rename = "type", default)]
    pub key_type: String,
    /// Service account email, used as the JWT issuer.
    #[serde(default)]
    pub client_email: String,
    /// PEM-encoded RSA private key.
    #[serde(default)]
    pub private_key: String,
    /// Key id, sent as the JWT `kid` header.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse and validate a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidKey(e.to_string()))?;

        if key.key_type != "service_account" {
            return Err(Error::InvalidKey(format!(
                "'type' field is {:?} (expected \"service_account\")",
                key.key_type
            )));
        }
        if key.client_email.is_empty() {
            return Err(Error::InvalidKey("missing 'client_email'".to_string()));
        }
        if key.private_key.is_empty() {
            return Err(Error::InvalidKey("missing 'private_key'".to_string()));
        }

        Ok(key)
    }

    /// Token endpoint for this key.
    pub fn token_uri(&self) -> &str {
        match self.token_uri.as_deref() {
            Some(uri) if !uri.is_empty() => uri,
            _ => DEFAULT_TOKEN_URI,
        }
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri())
            .finish_non_exhaustive()
    }
}

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token.
    pub token: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token can still be used at `now`, leaving some slack.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SLACK_SECS) < self.expires_at
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Produces access tokens for a service account.
pub struct Authenticator {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    agent: ureq::Agent,
    cached: Mutex<Option<AccessToken>>,
}

impl Authenticator {
    /// Prepare an authenticator for `scope`.
    ///
    /// Fails if the private key is not a valid RSA PEM. No network call is
    /// made until the first token is requested.
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            agent: ureq::Agent::new_with_defaults(),
            cached: Mutex::new(None),
        })
    }

    /// The service account this authenticator signs for.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Build a signed JWT assertion issued at `now`.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri().to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    /// Return a valid access token, exchanging a new assertion if needed.
    pub fn token(&self) -> Result<String> {
        let now = Utc::now();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange(now)?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let assertion = self.assertion(now)?;
        log::info!("Requesting access token for {}", self.key.client_email);

        let response: TokenResponse = self
            .agent
            .post(self.key.token_uri())
            .send_form([("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .map_err(|e| Error::TokenExchange(e.to_string()))?
            .body_mut()
            .read_json()
            .map_err(|e| Error::TokenExchange(e.to_string()))?;

        Ok(AccessToken {
            token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        })
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("client_email", &self.key.client_email)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const KEY_JSON: &str = include_str!("../tests/fixtures/service_account.json");

    #[test]
    fn test_parse_service_account_key() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        assert_eq!(
            key.client_email,
            "sweeper@drive-sweep-tests.iam.gserviceaccount.com"
        );
        assert_eq!(key.private_key_id.as_deref(), Some("0123456789abcdef"));
        assert_eq!(key.token_uri(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_rejects_wrong_type() {
        let json = r#"{"type": "authorized_user", "client_email": "a@b", "private_key": "x"}"#;
        let err = ServiceAccountKey::from_json(json).unwrap_err();
        assert!(err.to_string().contains("authorized_user"));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let json = r#"{"type": "service_account", "private_key": "x"}"#;
        assert!(ServiceAccountKey::from_json(json).is_err());

        let json = r#"{"type": "service_account", "client_email": "a@b"}"#;
        assert!(ServiceAccountKey::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(ServiceAccountKey::from_json("not json at all").is_err());
    }

    #[test]
    fn test_default_token_uri() {
        let json = r#"{"type": "service_account", "client_email": "a@b", "private_key": "x"}"#;
        let key = ServiceAccountKey::from_json(json).unwrap();
        assert_eq!(key.token_uri(), DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_invalid_pem_is_rejected() {
        let json = r#"{"type": "service_account", "client_email": "a@b", "private_key": "x"}"#;
        let key = ServiceAccountKey::from_json(json).unwrap();
        let err = Authenticator::new(key, crate::DRIVE_SCOPE).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn test_assertion_header_and_claims() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let auth = Authenticator::new(key, crate::DRIVE_SCOPE).unwrap();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let jwt = auth.assertion(now).unwrap();
        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

        let payload = jwt.split('.').nth(1).unwrap();
        let claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(claims.iss, auth.client_email());
        assert_eq!(claims.scope, "https://www.googleapis.com/auth/drive");
        assert_eq!(claims.aud, DEFAULT_TOKEN_URI);
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_003_600);
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc::now();
        let token = AccessToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(3600),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(3550)));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let auth = Authenticator::new(key, crate::DRIVE_SCOPE).unwrap();
        let debug = format!("{:?}", auth);
        assert!(debug.contains("sweeper@"));
        assert!(!debug.contains("PRIVATE KEY"));

        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        assert!(!format!("{:?}", key).contains("PRIVATE KEY"));
    }
}
