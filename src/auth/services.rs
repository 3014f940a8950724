use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::errors::VerifyError;
use crate::auth::repo_types::User;
use crate::auth::session::SessionData;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";

/// 6-digit verification code, each digit drawn independently. Meant to
/// be typed from an SMS, not to act as a secret capability token.
pub fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    (0..6).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

/// Compare a submitted code against the session's pending verification.
/// Returns the pending phone number on success so the caller can finish
/// the login.
pub fn check_pending_code(
    session: &SessionData,
    submitted: &str,
    ttl: Duration,
    now: OffsetDateTime,
) -> Result<String, VerifyError> {
    let (phone, code, issued_at) = match (
        &session.pending_phone,
        &session.pending_code,
        session.code_issued_at,
    ) {
        (Some(phone), Some(code), Some(issued_at)) => (phone, code, issued_at),
        _ => return Err(VerifyError::NoPending),
    };
    if now - issued_at > ttl {
        return Err(VerifyError::Expired);
    }
    if code != submitted {
        return Err(VerifyError::Mismatch);
    }
    Ok(phone.clone())
}

/// Claims inside the session cookie. `sub` is the server-side session
/// id, not a user id.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    iat: usize,
    exp: usize,
}

/// Signs and verifies the session id carried in the `sid` cookie.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: std::time::Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: std::time::Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }

    pub fn sign(&self, sid: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::seconds(self.ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: sid,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(session_id = %sid, "session cookie signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Uuid> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims.sub)
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let session = &state.config.session;
        Self::new(&session.secret, session.ttl_minutes)
    }
}

/// `Set-Cookie` value installing the signed session id.
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value expiring the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

fn session_cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|kv| kv.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(|v| v.to_string())
}

/// Session id from a validly signed cookie, if any. Tampered or absent
/// cookies resolve to `None`; the store is not consulted here.
fn session_id_from_parts(parts: &Parts, state: &AppState) -> Option<Uuid> {
    let token = session_cookie_value(&parts.headers)?;
    SessionKeys::from_ref(state).verify(&token).ok()
}

/// Extracts the session id from the signed cookie. Never rejects.
pub struct ClientSession(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(ClientSession(session_id_from_parts(parts, &state)))
    }
}

/// The user bound to the current session, when there is one. Malformed
/// cookies, stale session ids and unknown user ids all resolve to an
/// anonymous request.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let sid = match session_id_from_parts(parts, &state) {
            Some(sid) => sid,
            None => return Ok(MaybeUser(None)),
        };
        let user_id = match state.sessions.get(sid).await.and_then(|s| s.user_id) {
            Some(user_id) => user_id,
            None => return Ok(MaybeUser(None)),
        };
        let user = User::load_by_id(&state.db, user_id).await.ok().flatten();
        Ok(MaybeUser(user))
    }
}

/// Like `MaybeUser`, but anonymous requests are bounced to the login
/// form (the login-required contract).
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await {
            Ok(MaybeUser(Some(user))) => Ok(CurrentUser(user)),
            _ => {
                warn!("login required");
                Err(Redirect::to("/login"))
            }
        }
    }
}


#[cfg(test)]
mod pending_tests {
    use super::*;

    fn pending(code: &str, issued_at: OffsetDateTime) -> SessionData {
        SessionData {
            user_id: None,
            pending_phone: Some("+15551234567".into()),
            pending_code: Some(code.into()),
            code_issued_at: Some(issued_at),
        }
    }

    #[test]
    fn empty_session_has_no_pending_verification() {
        let err = check_pending_code(
            &SessionData::default(),
            "123456",
            Duration::minutes(10),
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert_eq!(err, VerifyError::NoPending);
    }

    #[test]
    fn exact_match_returns_pending_phone() {
        let now = OffsetDateTime::now_utc();
        let phone = check_pending_code(&pending("123456", now), "123456", Duration::minutes(10), now)
            .expect("code matches");
        assert_eq!(phone, "+15551234567");
    }

    #[test]
    fn wrong_code_is_a_mismatch() {
        let now = OffsetDateTime::now_utc();
        let err = check_pending_code(&pending("123456", now), "654321", Duration::minutes(10), now)
            .unwrap_err();
        assert_eq!(err, VerifyError::Mismatch);
    }

    #[test]
    fn stale_code_is_expired() {
        let now = OffsetDateTime::now_utc();
        let issued = now - Duration::minutes(11);
        let err = check_pending_code(&pending("123456", issued), "123456", Duration::minutes(10), now)
            .unwrap_err();
        assert_eq!(err, VerifyError::Expired);
    }
}

#[cfg(test)]
mod cookie_tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = SessionKeys::new("test-secret", 60);
        let sid = Uuid::new_v4();
        let token = keys.sign(sid).expect("sign");
        assert_eq!(keys.verify(&token).expect("verify"), sid);
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = SessionKeys::new("test-secret", 60);
        let mut token = keys.sign(Uuid::new_v4()).expect("sign");
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let keys = SessionKeys::new("test-secret", 60);
        let other = SessionKeys::new("other-secret", 60);
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn cookie_value_is_parsed_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sid=token123; lang=en"),
        );
        assert_eq!(session_cookie_value(&headers).as_deref(), Some("token123"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_cookie_value(&headers).is_none());
    }

    #[test]
    fn set_cookie_values() {
        assert_eq!(
            session_cookie("tok"),
            "sid=tok; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
