//! Signed access token issuance.
//!
//! Tokens are compact HS256 JWTs. The issuer assigns `sub`, `jti`, `iss`, `aud`
//! and `exp`; every other claim is exactly what the caller supplied. A claim
//! name supplied more than once (e.g. one `scope` per granted scope) is written
//! as a JSON array under that name.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use crate::config::JwtConfig;
use crate::error::AuthError;

pub const DEFAULT_ISSUER: &str = "techfood-jwts";
pub const DEFAULT_AUDIENCE: &str = "techfood";
/// Lifetime of every token issued by both grants.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::minutes(30);
/// Longest lifetime a configuration may ask for.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::days(1);
/// Minimum signing key length in bytes.
pub const MIN_KEY_LEN: usize = 32;
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

const REGISTERED_CLAIMS: [&str; 7] = ["sub", "jti", "iss", "aud", "exp", "nbf", "iat"];

/// A single name/value assertion carried by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Token response handed to callers of either grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

/// A freshly signed token and the parameters it was signed with.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: OffsetDateTime,
    pub expires_in: i64,
    pub issuer: String,
    pub audience: String,
}

/// A token that passed signature, issuer, audience and expiry checks.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub subject: String,
    pub token_id: String,
    pub issuer: String,
    pub audience: String,
    pub expires_at: OffsetDateTime,
    /// Non-registered claims; arrays are flattened back into repeated claims.
    pub claims: Vec<Claim>,
}

impl DecodedToken {
    /// All values carried under `name`, in token order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.value.as_str())
            .collect()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).into_iter().next()
    }
}

/// Signs tokens with a shared symmetric key.
///
/// Any holder of the same key can validate both user and service tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(
        key: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, AuthError> {
        if key.len() < MIN_KEY_LEN {
            return Err(AuthError::Configuration(format!(
                "signing key must be at least {MIN_KEY_LEN} bytes"
            )));
        }
        if !lifetime.is_positive() {
            return Err(AuthError::Configuration(
                "token lifetime must be positive".into(),
            ));
        }
        if lifetime > MAX_TOKEN_LIFETIME {
            return Err(AuthError::Configuration(format!(
                "token lifetime must not exceed {} seconds",
                MAX_TOKEN_LIFETIME.whole_seconds()
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime,
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        Self::new(
            config.key.as_bytes(),
            config.issuer.clone(),
            config.audience.clone(),
            Duration::seconds(config.token_lifetime_secs),
        )
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a token for `subject` carrying `claims`.
    pub fn issue(&self, subject: &str, claims: &[Claim]) -> Result<SignedToken, AuthError> {
        let mut payload = Map::new();
        for claim in claims {
            if REGISTERED_CLAIMS.contains(&claim.name.as_str()) {
                tracing::warn!(claim = %claim.name, "ignoring caller-supplied registered claim");
                continue;
            }
            let value = Value::String(claim.value.clone());
            match payload.get_mut(&claim.name) {
                None => {
                    payload.insert(claim.name.clone(), value);
                }
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }

        let token_id = uuid::Uuid::new_v4().to_string();
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(self.lifetime)
            .ok_or_else(|| AuthError::Configuration("token expiry is out of range".into()))?;

        payload.insert("sub".into(), Value::String(subject.to_string()));
        payload.insert("jti".into(), Value::String(token_id.clone()));
        payload.insert("iss".into(), Value::String(self.issuer.clone()));
        payload.insert("aud".into(), Value::String(self.audience.clone()));
        payload.insert("exp".into(), Value::from(expires_at.unix_timestamp()));

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|e| AuthError::Configuration(format!("failed to sign token: {e}")))?;

        Ok(SignedToken {
            token,
            token_id,
            expires_at,
            expires_in: self.lifetime.whole_seconds(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        })
    }

    /// Validate a token signed with this issuer's key and settings.
    pub fn decode(&self, token: &str) -> Result<DecodedToken, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let mut payload = decode::<Map<String, Value>>(token, &self.decoding, &validation)?.claims;

        let subject = take_string(&mut payload, "sub")?;
        let token_id = take_string(&mut payload, "jti")?;
        let issuer = take_string(&mut payload, "iss")?;
        let audience = take_string(&mut payload, "aud")?;
        let expires_at = payload
            .remove("exp")
            .and_then(|v| v.as_i64())
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
            .ok_or_else(|| JwtError::from(ErrorKind::InvalidToken))?;

        let mut claims = Vec::new();
        for (name, value) in payload {
            if REGISTERED_CLAIMS.contains(&name.as_str()) {
                continue;
            }
            match value {
                Value::Array(values) => {
                    claims.extend(values.into_iter().map(|v| Claim::new(&name, value_text(v))))
                }
                other => claims.push(Claim::new(&name, value_text(other))),
            }
        }

        Ok(DecodedToken {
            subject,
            token_id,
            issuer,
            audience,
            expires_at,
            claims,
        })
    }
}

fn take_string(payload: &mut Map<String, Value>, name: &str) -> Result<String, JwtError> {
    match payload.remove(name) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(JwtError::from(ErrorKind::InvalidToken)),
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
