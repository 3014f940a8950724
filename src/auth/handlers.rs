use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm, VerifyForm},
        errors::{RegisterError, VerifyError},
        pages,
        password::hash_password,
        repo_types::User,
        services::{
            check_pending_code, clear_session_cookie, generate_verification_code, is_valid_phone,
            session_cookie, ClientSession, CurrentUser, MaybeUser, SessionKeys,
        },
    },
    sms::verification_message,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/verify", get(verify_page).post(verify))
        .route("/logout", get(logout))
}

/// Reuse the caller's session when the cookie still maps to live state,
/// otherwise start a fresh one.
async fn resolve_session(state: &AppState, sid: Option<Uuid>) -> Uuid {
    if let Some(sid) = sid {
        if state.sessions.get(sid).await.is_some() {
            return sid;
        }
    }
    state.sessions.create().await
}

/// Issue a verification code for `phone`, park it in the session and
/// dispatch the SMS. Returns the `Set-Cookie` value for the session.
async fn start_verification(
    state: &AppState,
    sid: Uuid,
    phone: &str,
) -> Result<String, (StatusCode, String)> {
    let code = generate_verification_code();
    state
        .sessions
        .set_pending(sid, phone, &code, OffsetDateTime::now_utc())
        .await;

    // Provider failures abort the request; there are no retry semantics.
    if let Err(e) = state.sms.send(phone, &verification_message(&code)).await {
        error!(error = %e, "sms send failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    let keys = SessionKeys::from_ref(state);
    match keys.sign(sid) {
        Ok(token) => Ok(session_cookie(&token)),
        Err(e) => {
            error!(error = %e, "session cookie signing failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub async fn index(MaybeUser(user): MaybeUser) -> Html<String> {
    pages::home(user.as_ref().map(|u| u.login_name.as_str()))
}

pub async fn register_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    pages::register_form().into_response()
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ClientSession(sid): ClientSession,
    MaybeUser(current): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> Result<Response, (StatusCode, String)> {
    if current.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let login_name = form.login_name.trim();
    let phone_number = form.phone_number.trim();
    if login_name.is_empty() || form.password.is_empty() || phone_number.is_empty() {
        warn!("registration form incomplete");
        return Ok(Redirect::to("/register").into_response());
    }
    if !is_valid_phone(phone_number) {
        warn!(phone = %phone_number, "invalid phone number");
        return Ok(Redirect::to("/register").into_response());
    }

    if let Ok(Some(_)) = User::find_by_login_name(&state.db, login_name).await {
        warn!(login_name = %login_name, "login name already taken");
        return Ok(Redirect::to("/register").into_response());
    }

    let hash = match hash_password(&form.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let user = match User::create(&state.db, login_name, phone_number, &hash).await {
        Ok(u) => u,
        // The unique constraint backstops the lookup above.
        Err(RegisterError::NameTaken) => {
            warn!(login_name = %login_name, "login name already taken");
            return Ok(Redirect::to("/register").into_response());
        }
        Err(RegisterError::Other(e)) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    // Registration lands on the verify page, so it needs pending state.
    let sid = resolve_session(&state, sid).await;
    let cookie = start_verification(&state, sid, &user.phone_number).await?;

    info!(user_id = %user.id, login_name = %user.login_name, "user registered");
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/verify")).into_response())
}

pub async fn login_page() -> Html<String> {
    pages::login_form()
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ClientSession(sid): ClientSession,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let phone_number = form.phone_number.trim();
    if !is_valid_phone(phone_number) {
        warn!(phone = %phone_number, "invalid phone number");
        return Ok(Redirect::to("/login").into_response());
    }

    let user = match User::find_by_phone(&state.db, phone_number).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(phone = %phone_number, "no user with this phone number");
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => {
            error!(error = %e, "find_by_phone failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let sid = resolve_session(&state, sid).await;
    let cookie = start_verification(&state, sid, phone_number).await?;

    info!(user_id = %user.id, "verification code issued");
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/verify")).into_response())
}

pub async fn verify_page() -> Html<String> {
    pages::verify_form()
}

#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    ClientSession(sid): ClientSession,
    Form(form): Form<VerifyForm>,
) -> Result<Response, (StatusCode, String)> {
    let session = match sid {
        Some(sid) => state.sessions.get(sid).await,
        None => None,
    };
    let (sid, session) = match sid.zip(session) {
        Some(pair) => pair,
        None => {
            warn!("verification attempted without a session");
            return Ok(Redirect::to("/login").into_response());
        }
    };

    let ttl = Duration::minutes(state.config.code_ttl_minutes);
    let phone = match check_pending_code(
        &session,
        form.verification_code.trim(),
        ttl,
        OffsetDateTime::now_utc(),
    ) {
        Ok(phone) => phone,
        Err(VerifyError::NoPending) => {
            warn!("no verification in progress");
            return Ok(Redirect::to("/login").into_response());
        }
        Err(VerifyError::Expired) => {
            warn!("verification code expired");
            return Ok(Redirect::to("/login").into_response());
        }
        // The code stays pending; the user can try again.
        Err(VerifyError::Mismatch) => {
            warn!("wrong verification code");
            return Ok(pages::verify_form().into_response());
        }
    };

    let user = match User::find_by_phone(&state.db, &phone).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(phone = %phone, "verified phone no longer on file");
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => {
            error!(error = %e, "find_by_phone failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    state.sessions.authenticate(sid, user.id).await;
    if let Err(e) = User::set_authenticated(&state.db, user.id, true).await {
        error!(error = %e, "set_authenticated failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    info!(user_id = %user.id, "phone number verified, session authenticated");
    Ok(Redirect::to("/").into_response())
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    ClientSession(sid): ClientSession,
    CurrentUser(user): CurrentUser,
) -> Result<Response, (StatusCode, String)> {
    if let Some(sid) = sid {
        state.sessions.remove(sid).await;
    }
    if let Err(e) = User::set_authenticated(&state.db, user.id, false).await {
        error!(error = %e, "set_authenticated failed");
        return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    info!(user_id = %user.id, "user logged out");
    Ok((
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Redirect::to("/"),
    )
        .into_response())
}
