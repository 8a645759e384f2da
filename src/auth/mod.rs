/*!
 * # Session boundary
 *
 * Authentication proper (login, password handling, the session store) lives
 * in a separate identity service. This module consumes its output: a signed
 * cookie carrying `{id, email, role, isLoggedIn}`. We verify the signature,
 * reject tampered or stale payloads, and expose extractors for the two
 * access levels the API distinguishes.
 */

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{entities::user::UserRole, errors::ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie issued by the identity service.
pub const SESSION_COOKIE: &str = "cx_session";

/// The session payload carried by the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub is_logged_in: bool,
}

/// Any logged-in user (parents included).
#[derive(Debug, Clone)]
pub struct SessionUser(pub Session);

/// A logged-in staff or admin user; required by the administration routes.
#[derive(Debug, Clone)]
pub struct StaffUser(pub Session);

/// Serializes and signs a session into cookie-value form:
/// `base64url(json).hex(hmac)`.
pub fn encode_session(secret: &str, session: &Session) -> String {
    let payload = serde_json::to_vec(session).expect("session serializes");
    let encoded = URL_SAFE_NO_PAD.encode(&payload);
    let signature = sign(secret, encoded.as_bytes());
    format!("{}.{}", encoded, signature)
}

/// Verifies and decodes a cookie value produced by [`encode_session`].
pub fn decode_session(secret: &str, value: &str) -> Option<Session> {
    let (encoded, signature) = value.split_once('.')?;
    let expected = sign(secret, encoded.as_bytes());
    if !constant_time_eq(&expected, signature) {
        return None;
    }
    let payload = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    serde_json::from_slice(&payload).ok()
}

fn sign(secret: &str, data: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

fn session_from_parts(parts: &Parts, secret: &str) -> Option<Session> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    let value = header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value)
    })?;
    let session = decode_session(secret, value)?;
    session.is_logged_in.then_some(session)
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, &state.config.session_secret)
            .map(SessionUser)
            .ok_or(ApiError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(session) = SessionUser::from_request_parts(parts, state).await?;
        if !session.role.is_staff() {
            return Err(ApiError::Forbidden);
        }
        Ok(StaffUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret";

    fn session(role: UserRole) -> Session {
        Session {
            id: Uuid::new_v4(),
            email: "parent@example.com".into(),
            role,
            is_logged_in: true,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = session(UserRole::Parent);
        let cookie = encode_session(SECRET, &original);
        let decoded = decode_session(SECRET, &cookie).expect("valid cookie decodes");
        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.email, original.email);
        assert_eq!(decoded.role, original.role);
    }

    #[test]
    fn tampered_payload_rejected() {
        let cookie = encode_session(SECRET, &session(UserRole::Parent));
        let (payload, sig) = cookie.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(
            String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap())
                .unwrap()
                .replace("parent", "admin"),
        );
        assert!(decode_session(SECRET, &format!("{}.{}", forged, sig)).is_none());
    }

    #[test]
    fn wrong_secret_rejected() {
        let cookie = encode_session(SECRET, &session(UserRole::Staff));
        assert!(decode_session("another-secret", &cookie).is_none());
    }

    #[test]
    fn malformed_values_rejected() {
        assert!(decode_session(SECRET, "").is_none());
        assert!(decode_session(SECRET, "no-dot-here").is_none());
        assert!(decode_session(SECRET, "abc.def").is_none());
    }

    #[test]
    fn staff_roles() {
        assert!(!UserRole::Parent.is_staff());
        assert!(UserRole::Staff.is_staff());
        assert!(UserRole::Admin.is_staff());
    }
}
