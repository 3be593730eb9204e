use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::util::now_ts;

/// Minimal HS256 session tokens.
///
/// The session identity is a signed claims object carried in a cookie. Only
/// JSON objects are supported for header/payload, base64url WITHOUT padding,
/// and signature verification goes through `Hmac::verify_slice`. There is no
/// expiry beyond what the cookie transport provides.

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Claims bound to a session cookie: the user id and when it was issued.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i32,
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid token JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid token format")]
    Format,
    #[error("unsupported token header")]
    Header,
    #[error("invalid signature")]
    Signature,
    #[error("invalid HMAC key")]
    Key,
}

fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, SessionError> {
    Ok(URL_SAFE_NO_PAD.decode(s.as_bytes())?)
}

/// Encode claims as an HS256-signed token.
pub fn encode_hs256<T: Serialize>(secret: &[u8], claims: &T) -> Result<String, SessionError> {
    let header = TokenHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header)?;
    let claims_json = serde_json::to_vec(claims)?;

    let header_b64 = b64url_encode(&header_json);
    let claims_b64 = b64url_encode(&claims_json);
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| SessionError::Key)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let sig_b64 = b64url_encode(&signature);

    Ok(format!("{signing_input}.{sig_b64}"))
}

/// Decode an HS256 token and verify its signature.
pub fn decode_hs256<T: DeserializeOwned>(secret: &[u8], token: &str) -> Result<T, SessionError> {
    let token = token.replace(char::is_whitespace, "");
    let mut parts = token.split('.');
    let Some(header_b64) = parts.next() else {
        return Err(SessionError::Format);
    };
    let Some(payload_b64) = parts.next() else {
        return Err(SessionError::Format);
    };
    let Some(sig_b64) = parts.next() else {
        return Err(SessionError::Format);
    };
    if parts.next().is_some() {
        return Err(SessionError::Format);
    }

    let header_raw = b64url_decode(header_b64)?;
    let header: TokenHeader = serde_json::from_slice(&header_raw)?;
    if header.alg != "HS256" || header.typ.to_ascii_uppercase() != "JWT" {
        return Err(SessionError::Header);
    }

    // Verify signature before touching the payload.
    let signing_input = format!("{header_b64}.{payload_b64}");
    let sig = b64url_decode(sig_b64)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| SessionError::Key)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&sig).map_err(|_| SessionError::Signature)?;

    let payload_raw = b64url_decode(payload_b64)?;
    let claims: T = serde_json::from_slice(&payload_raw)?;

    Ok(claims)
}

/// Issue a session token for a freshly authenticated user.
pub fn issue(secret: &[u8], user_id: i32) -> Result<String, SessionError> {
    encode_hs256(
        secret,
        &SessionClaims {
            sub: user_id,
            iat: now_ts(),
        },
    )
}

/// Tolerant decode for per-request resolution: any failure means anonymous.
pub fn user_id_from_token(secret: &[u8], token: &str) -> Option<i32> {
    decode_hs256::<SessionClaims>(secret, token)
        .ok()
        .map(|claims| claims.sub)
}

pub fn cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit test secret";

    #[test]
    fn issued_token_resolves_to_the_user() {
        let token = issue(SECRET, 42).unwrap();
        assert_eq!(user_id_from_token(SECRET, &token), Some(42));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = issue(SECRET, 42).unwrap();
        let tampered = format!("{token}x");
        assert_eq!(user_id_from_token(SECRET, &tampered), None);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue(b"other secret", 42).unwrap();
        assert_eq!(user_id_from_token(SECRET, &token), None);
    }

    #[test]
    fn garbage_tokens_resolve_to_anonymous() {
        for garbage in ["", "not-a-token", "a.b", "a.b.c.d", "%%%.%%%.%%%"] {
            assert_eq!(user_id_from_token(SECRET, garbage), None);
        }
    }
}
