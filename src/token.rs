//! Issue and verify the signed bearer tokens that vouch for a logged-in
//! account.
//!
//! A token is three unpadded url-safe base64 segments joined by dots: a json
//! header naming the signing algorithm, a json claim payload carrying the
//! account id, display handle, and expiry, and a mac over the first two
//! segments. Interoperable with any standard JWT tooling, but verification
//! here pins the algorithm from local configuration. The header's `alg` field
//! never *selects* an algorithm, it only has to match the configured one, so a
//! token claiming `"alg": "none"` (or anything else we didn't sign with) dies
//! the same death as a forged signature.
//!
//! Verification is total: every way a presented token can be bad maps to a
//! [`VerificationOutcome`] variant instead of an error, and nothing is
//! extracted from a token that didn't fully pass.

use crate::{
    error::{Error, Result},
    util::ser,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_derive::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default lifetime stamped into issued tokens, in minutes (7 days).
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

type HmacSha256 = Hmac<Sha256>;

/// A secret used to sign and verify tokens. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw secret bytes. An empty secret is refused outright, because it
    /// means somebody forgot to configure one.
    pub fn from_bytes<T: Into<Vec<u8>>>(bytes: T) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Err(Error::SigningSecretEmpty)?;
        }
        Ok(Self(bytes))
    }

    /// Get the raw secret bytes.
    pub(crate) fn expose_secret(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(..)")
    }
}

/// The algorithms we can sign tokens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// HMAC-SHA256
    Hs256,
}

impl SigningAlgorithm {
    /// The label this algorithm goes by in a token header.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
        }
    }

    /// Produce the raw mac bytes over `data`.
    pub(crate) fn sign(&self, secret: &SigningSecret, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Hs256 => {
                let mut mac = HmacSha256::new_from_slice(secret.expose_secret()).map_err(|_| Error::TokenSignFailed)?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }

    /// Verify `candidate` as the mac over `data`. Comparison happens in
    /// constant time down in the mac crate.
    pub(crate) fn verify(&self, secret: &SigningSecret, data: &[u8], candidate: &[u8]) -> bool {
        match self {
            Self::Hs256 => {
                let mut mac = match HmacSha256::new_from_slice(secret.expose_secret()) {
                    Ok(mac) => mac,
                    Err(_) => return false,
                };
                mac.update(data);
                mac.verify_slice(candidate).is_ok()
            }
        }
    }
}

/// The set of claims a token vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Claims {
    /// Unique id of the account this token speaks for
    user_id: i64,
    /// The account's display handle
    username: String,
}

impl Claims {
    /// Create a new claim set.
    pub fn new<T: Into<String>>(user_id: i64, username: T) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// What a fully-verified token tells us: the claims that were issued into it,
/// plus when it stops being any good.
#[derive(Debug, Clone, PartialEq, Eq, getset::Getters)]
#[getset(get = "pub")]
pub struct TokenData {
    /// The verified claim set
    claims: Claims,
    /// The embedded expiry
    expires_at: DateTime<Utc>,
}

impl TokenData {
    /// Create a new token data set.
    pub fn new(claims: Claims, expires_at: DateTime<Utc>) -> Self {
        Self { claims, expires_at }
    }
}

/// Every way presenting a token can turn out. Exactly one of these holds for
/// any input string, and only [`Valid`][VerificationOutcome::Valid] exposes
/// anything read from the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Correctly signed, well formed, not expired.
    Valid(TokenData),
    /// Correctly signed and well formed, but its expiry is at or before the
    /// verification instant.
    Expired,
    /// Not structurally a token we could have issued: wrong segment count,
    /// bad base64, json that doesn't parse, or a claim set missing required
    /// fields.
    Malformed,
    /// The mac doesn't verify under our secret, or the header names an
    /// algorithm other than the one we're pinned to.
    SignatureMismatch,
    /// Nothing was presented (or only whitespace was).
    Absent,
}

impl VerificationOutcome {
    /// True if this outcome vouches for the bearer.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Unwrap the verified token data, if there is any.
    pub fn into_token_data(self) -> Option<TokenData> {
        match self {
            Self::Valid(data) => Some(data),
            _ => None,
        }
    }
}

/// A signed, encoded bearer token, ready to travel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    /// The encoded token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// The json header segment of a token.
#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// The json payload segment of a token. Unknown extra fields are tolerated on
/// the way in so old verifiers keep working if claims grow.
#[derive(Serialize, Deserialize)]
struct Payload {
    user_id: i64,
    username: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    exp: DateTime<Utc>,
}

/// Static configuration for a [`TokenAuthority`].
#[derive(Debug, Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct TokenConfig {
    /// The shared signing secret
    #[getset(skip)]
    secret: SigningSecret,
    /// The one algorithm tokens are signed with and verified against
    algorithm: SigningAlgorithm,
    /// Default lifetime for issued tokens
    ttl: Duration,
}

impl TokenConfig {
    /// Create a config around a secret, with HMAC-SHA256 signing and the
    /// default ttl.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            algorithm: SigningAlgorithm::Hs256,
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }

    /// Override the default lifetime stamped into issued tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub(crate) fn secret(&self) -> &SigningSecret {
        &self.secret
    }
}

/// Issues tokens for authenticated accounts and verifies presented ones.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    config: TokenConfig,
}

impl TokenAuthority {
    /// Create an authority from its config.
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Issue a signed token for `claims`, expiring `ttl` from now (or the
    /// configured default lifetime if `None`).
    pub fn issue(&self, claims: &Claims, ttl: Option<Duration>) -> Result<Token> {
        self.issue_at(claims, ttl, Utc::now())
    }

    /// Check a presented token string. Total: every input maps to an outcome.
    pub fn verify(&self, presented: &str) -> VerificationOutcome {
        self.verify_at(presented, Utc::now())
    }

    /// [`issue`][TokenAuthority::issue] against an explicit clock.
    pub(crate) fn issue_at(&self, claims: &Claims, ttl: Option<Duration>, now: DateTime<Utc>) -> Result<Token> {
        let ttl = ttl.unwrap_or(*self.config.ttl());
        let expires_at = now + ttl;
        let header = Header {
            alg: self.config.algorithm().label().into(),
            typ: Some("JWT".into()),
        };
        let payload = Payload {
            user_id: *claims.user_id(),
            username: claims.username().clone(),
            exp: expires_at,
        };
        let signing_input = format!(
            "{}.{}",
            ser::base64_encode(ser::serialize_json(&header)?),
            ser::base64_encode(ser::serialize_json(&payload)?),
        );
        let mac = self.config.algorithm().sign(self.config.secret(), signing_input.as_bytes())?;
        Ok(Token(format!("{}.{}", signing_input, ser::base64_encode(mac))))
    }

    /// [`verify`][TokenAuthority::verify] against an explicit clock.
    pub(crate) fn verify_at(&self, presented: &str, now: DateTime<Utc>) -> VerificationOutcome {
        let presented = presented.trim();
        if presented.is_empty() {
            return VerificationOutcome::Absent;
        }
        let segments: Vec<&str> = presented.split('.').collect();
        let (header_b64, payload_b64, mac_b64) = match segments.as_slice() {
            [header_b64, payload_b64, mac_b64] => (*header_b64, *payload_b64, *mac_b64),
            _ => return VerificationOutcome::Malformed,
        };
        let header: Header = match ser::base64_decode(header_b64).and_then(|bytes| ser::deserialize_json(&bytes)) {
            Ok(header) => header,
            Err(_) => return VerificationOutcome::Malformed,
        };
        if header.alg != self.config.algorithm().label() {
            return VerificationOutcome::SignatureMismatch;
        }
        let mac = match ser::base64_decode(mac_b64) {
            Ok(mac) => mac,
            Err(_) => return VerificationOutcome::Malformed,
        };
        let signing_input = format!("{}.{}", header_b64, payload_b64);
        if !self.config.algorithm().verify(self.config.secret(), signing_input.as_bytes(), &mac) {
            return VerificationOutcome::SignatureMismatch;
        }
        // the signature covers the payload bytes, so nothing below here is
        // attacker-shaped. it can still be *old*, or signed by a buggy
        // issuer.
        let payload: Payload = match ser::base64_decode(payload_b64).and_then(|bytes| ser::deserialize_json(&bytes)) {
            Ok(payload) => payload,
            Err(_) => return VerificationOutcome::Malformed,
        };
        if payload.exp <= now {
            return VerificationOutcome::Expired;
        }
        VerificationOutcome::Valid(TokenData {
            claims: Claims {
                user_id: payload.user_id,
                username: payload.username,
            },
            expires_at: payload.exp,
        })
    }
}
