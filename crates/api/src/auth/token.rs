//! Signed bearer tokens.
//!
//! Wire shape: `base64url(header) "." base64url(claims) "." hex(signature)`,
//! where the signature is HMAC-SHA256 over the first two segments exactly as
//! they appear on the wire. The header is always `{"alg":"HS256","typ":"JWT"}`.
//!
//! Tokens are never revoked here. A token only names a row (admin, login
//! token or session); the authorities re-check that row on every use.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use gatekeep_core::error::CoreError;
use gatekeep_core::types::{EntityId, Timestamp};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm issued or accepted.
const ALGORITHM: &str = "HS256";

/// Default tolerance for `iat` values slightly ahead of the local clock.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 0;

/// Default admin token lifetime in hours (7 days).
pub const DEFAULT_ADMIN_TOKEN_TTL_HOURS: i64 = 24 * 7;

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// What a token refers to. Serialized with a `kind` tag next to `iat`/`exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    Admin { admin_id: EntityId },
    /// Handed back to the requesting device; redeemed for a session.
    Login { login_token_id: EntityId },
    /// Mailed to the address owner; approves or denies the request.
    Approval { login_token_id: EntityId },
    Session { session_id: EntityId },
}

/// Claims payload of every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub subject: Subject,
    /// Issued-at (UTC Unix seconds).
    pub iat: i64,
    /// Expires-at (UTC Unix seconds).
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: Subject, issued_at: Timestamp, ttl: Duration) -> Self {
        Self {
            subject,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn admin_id(&self) -> Option<EntityId> {
        match self.subject {
            Subject::Admin { admin_id } => Some(admin_id),
            _ => None,
        }
    }

    pub fn login_token_id(&self) -> Option<EntityId> {
        match self.subject {
            Subject::Login { login_token_id } => Some(login_token_id),
            _ => None,
        }
    }

    pub fn approval_id(&self) -> Option<EntityId> {
        match self.subject {
            Subject::Approval { login_token_id } => Some(login_token_id),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<EntityId> {
        match self.subject {
            Subject::Session { session_id } => Some(session_id),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token segment could not be decoded: {0}")]
    Decode(String),

    #[error("Token was issued in the future")]
    IssuedInFuture,

    #[error("Token has expired")]
    Expired,

    #[error("Token could not be encoded: {0}")]
    Encode(String),
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => CoreError::Expired("Token has expired".into()),
            TokenError::Encode(msg) => CoreError::Internal(format!("Token encoding failed: {msg}")),
            _ => CoreError::Unauthorized("Invalid token".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Signing configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 secret.
    pub secret: String,
    /// How far `iat` may lie ahead of the local clock.
    pub clock_skew_secs: i64,
    /// Lifetime of admin tokens.
    pub admin_token_ttl_hours: i64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("admin_token_ttl_hours", &self.admin_token_ttl_hours)
            .finish()
    }
}

impl TokenConfig {
    /// Load token configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default |
    /// |-------------------------|----------|---------|
    /// | `TOKEN_SECRET`          | **yes**  | --      |
    /// | `TOKEN_CLOCK_SKEW_SECS` | no       | `0`     |
    /// | `ADMIN_TOKEN_TTL_HOURS` | no       | `168`   |
    ///
    /// # Panics
    ///
    /// Panics if `TOKEN_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("TOKEN_SECRET").expect("TOKEN_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "TOKEN_SECRET must not be empty");

        let clock_skew_secs: i64 = std::env::var("TOKEN_CLOCK_SKEW_SECS")
            .unwrap_or_else(|_| DEFAULT_CLOCK_SKEW_SECS.to_string())
            .parse()
            .expect("TOKEN_CLOCK_SKEW_SECS must be a valid i64");
        assert!(clock_skew_secs >= 0, "TOKEN_CLOCK_SKEW_SECS must not be negative");

        let admin_token_ttl_hours: i64 = std::env::var("ADMIN_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| DEFAULT_ADMIN_TOKEN_TTL_HOURS.to_string())
            .parse()
            .expect("ADMIN_TOKEN_TTL_HOURS must be a valid i64");

        Self {
            secret,
            clock_skew_secs,
            admin_token_ttl_hours,
        }
    }

    pub fn admin_token_ttl(&self) -> Duration {
        Duration::hours(self.admin_token_ttl_hours)
    }
}

// ---------------------------------------------------------------------------
// TokenCodec
// ---------------------------------------------------------------------------

/// Signs and verifies bearer tokens with the process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    clock_skew: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            clock_skew: Duration::seconds(config.clock_skew_secs),
        }
    }

    /// Encode and sign a claims payload.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let header = encode_segment(&header)?;
        let payload = encode_segment(claims)?;

        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{header}.{payload}.{signature}"))
    }

    /// Build claims for `subject` valid from `now` for `ttl` and sign them.
    pub fn issue(&self, subject: Subject, now: Timestamp, ttl: Duration) -> Result<String, TokenError> {
        self.sign(&Claims::new(subject, now, ttl))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked (in constant time) before any segment is
    /// decoded, so nothing in an unauthenticated payload is ever parsed.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        // Only the canonical lowercase rendering is accepted.
        if signature.is_empty() || !signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(TokenError::Malformed);
        }
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let claims: Claims = decode_segment(payload)?;
        let now = now.timestamp();
        if claims.iat > now + self.clock_skew.num_seconds() {
            return Err(TokenError::IssuedInFuture);
        }
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| TokenError::Encode(e.to_string()))
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Encode(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Decode(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            clock_skew_secs: 0,
            admin_token_ttl_hours: DEFAULT_ADMIN_TOKEN_TTL_HOURS,
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn session_claims() -> Claims {
        Claims::new(
            Subject::Session {
                session_id: Uuid::new_v4(),
            },
            now(),
            Duration::days(33),
        )
    }

    // -- round trip --------------------------------------------------------

    #[test]
    fn verify_returns_signed_claims() {
        let codec = TokenCodec::new(&test_config());
        for subject in [
            Subject::Admin {
                admin_id: Uuid::new_v4(),
            },
            Subject::Login {
                login_token_id: Uuid::new_v4(),
            },
            Subject::Approval {
                login_token_id: Uuid::new_v4(),
            },
            Subject::Session {
                session_id: Uuid::new_v4(),
            },
        ] {
            let claims = Claims::new(subject, now(), Duration::minutes(10));
            let token = codec.sign(&claims).unwrap();
            assert_eq!(codec.verify(&token, now()).unwrap(), claims);
        }
    }

    #[test]
    fn wire_shape_is_base64url_json_and_lowercase_hex() {
        let codec = TokenCodec::new(&test_config());
        let claims = session_claims();
        let token = codec.sign(&claims).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);

        let payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(payload["kind"], "session");
        assert_eq!(payload["iat"], claims.iat);

        assert_eq!(parts[2].len(), 64);
        assert!(parts[2].bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    // -- tampering ---------------------------------------------------------

    #[test]
    fn any_signature_mutation_fails() {
        let codec = TokenCodec::new(&test_config());
        let token = codec.sign(&session_claims()).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            for replacement in ['0', 'f', 'A', 'g', '.'] {
                if token.as_bytes()[i] == replacement as u8 {
                    continue;
                }
                let mut mutated = token.clone();
                mutated.replace_range(i..=i, &replacement.to_string());
                assert!(
                    codec.verify(&mutated, now()).is_err(),
                    "mutation at {i} to {replacement} must fail"
                );
            }
        }
    }

    #[test]
    fn modified_payload_fails_signature() {
        let codec = TokenCodec::new(&test_config());
        let token = codec.sign(&session_claims()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged = Claims::new(
            Subject::Admin {
                admin_id: Uuid::new_v4(),
            },
            now(),
            Duration::days(1),
        );
        let forged_payload = encode_segment(&forged).unwrap();
        let forged_token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_matches!(codec.verify(&forged_token, now()), Err(TokenError::BadSignature));
    }

    #[test]
    fn different_secret_fails() {
        let codec_a = TokenCodec::new(&test_config());
        let codec_b = TokenCodec::new(&TokenConfig {
            secret: "secret-bravo".to_string(),
            ..test_config()
        });
        let token = codec_a.sign(&session_claims()).unwrap();
        assert_matches!(codec_b.verify(&token, now()), Err(TokenError::BadSignature));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let codec = TokenCodec::new(&test_config());
        let token = codec.sign(&session_claims()).unwrap();
        assert_matches!(codec.verify("", now()), Err(TokenError::Malformed));
        assert_matches!(codec.verify("a.b", now()), Err(TokenError::Malformed));
        assert_matches!(
            codec.verify(&format!("{token}.extra"), now()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn signed_foreign_algorithm_is_rejected() {
        let codec = TokenCodec::new(&test_config());
        let header = encode_segment(&Header {
            alg: "none".into(),
            typ: "JWT".into(),
        })
        .unwrap();
        let payload = encode_segment(&session_claims()).unwrap();
        let mut mac = codec.mac().unwrap();
        mac.update(format!("{header}.{payload}").as_bytes());
        let token = format!("{header}.{payload}.{}", hex::encode(mac.finalize().into_bytes()));

        assert_matches!(
            codec.verify(&token, now()),
            Err(TokenError::UnsupportedAlgorithm(alg)) if alg == "none"
        );
    }

    // -- time ----------------------------------------------------------------

    #[test]
    fn expiry_is_exclusive() {
        let codec = TokenCodec::new(&test_config());
        let claims = Claims::new(
            Subject::Login {
                login_token_id: Uuid::new_v4(),
            },
            now(),
            Duration::minutes(10),
        );
        let token = codec.sign(&claims).unwrap();

        let just_before = now() + Duration::minutes(10) - Duration::seconds(1);
        assert!(codec.verify(&token, just_before).is_ok());
        assert_matches!(
            codec.verify(&token, now() + Duration::minutes(10)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn future_issue_time_respects_skew() {
        let strict = TokenCodec::new(&test_config());
        let lenient = TokenCodec::new(&TokenConfig {
            clock_skew_secs: 30,
            ..test_config()
        });
        let token = strict.sign(&session_claims()).unwrap();
        let earlier = now() - Duration::seconds(10);

        assert_matches!(strict.verify(&token, earlier), Err(TokenError::IssuedInFuture));
        assert!(lenient.verify(&token, earlier).is_ok());
    }

    #[test]
    fn errors_map_to_core_variants() {
        assert_matches!(CoreError::from(TokenError::Expired), CoreError::Expired(_));
        assert_matches!(CoreError::from(TokenError::BadSignature), CoreError::Unauthorized(_));
        assert_matches!(CoreError::from(TokenError::IssuedInFuture), CoreError::Unauthorized(_));
    }
}
