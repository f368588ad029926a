//! Browser session handoff: authorization-code login → staged voice
//! credential → one-shot claim.
//!
//! Per login attempt the flow is
//! `Initiated → CodeReceived → Exchanged → Staged → Claimed | Expired`:
//!
//! - `/login` redirects to the provider's authorization endpoint.
//! - `/oauth/callback` exchanges the returned code server-to-server, resolves
//!   the profile, mints the voice credential, and stages it in signed,
//!   HTTP-only, SameSite cookies with a short max-age. The redirect back to
//!   the application root carries no secrets in the URL.
//! - `/auth/session` returns the staged values exactly once and expires the
//!   cookies in the same response; a reload after the claim finds no session.
//!   The cookies are the only copy — an unclaimed session simply ages out of
//!   the browser's store with no server-side cleanup.

use crate::errors::PsError;
use crate::models::SessionClaimResponse;
use crate::observability::metrics;
use crate::routes::AppState;
use crate::services::voice_token;
use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Staged-session cookie names. Four cookies, one claim.
const TOKEN_COOKIE: &str = "ps_session_token";
const USER_COOKIE: &str = "ps_session_user";
const USERNAME_COOKIE: &str = "ps_session_username";
const VOICE_URL_COOKIE: &str = "ps_session_voice_url";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// Start a login attempt.
///
/// GET /login
pub async fn login(State(state): State<AppState>) -> Result<Redirect, PsError> {
    let oauth = state
        .oauth_client
        .as_ref()
        .ok_or(PsError::MissingConfig("oauth provider"))?;

    let url = oauth.authorize_redirect_url()?;
    Ok(Redirect::temporary(&url))
}

/// Complete a login attempt: exchange the code, stage the credential.
///
/// GET /oauth/callback
#[instrument(
    skip_all,
    name = "ps.session.callback",
    fields(method = "GET", endpoint = "/oauth/callback")
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(SignedCookieJar, Redirect), PsError> {
    let oauth = state
        .oauth_client
        .as_ref()
        .ok_or(PsError::MissingConfig("oauth provider"))?;
    let voice = state
        .config
        .voice
        .as_ref()
        .ok_or(PsError::MissingConfig("voice issuer"))?;

    // No code is a terminal client error; nothing has been staged.
    let code = query
        .code
        .ok_or_else(|| PsError::BadRequest("missing authorization code".to_string()))?;

    let start = Instant::now();
    let exchange = async {
        let access_token = oauth.exchange_code(&code).await?;
        oauth.fetch_profile(&access_token).await
    }
    .await;
    metrics::record_upstream_request("session_exchange", exchange.is_ok(), start.elapsed());

    let profile = exchange?;
    let username = profile.display_name().to_string();
    let token = voice_token::mint_voice_token(voice, &profile.sub, &username)?;

    let max_age = time::Duration::seconds(state.config.session_max_age_seconds);
    let jar = jar
        .add(session_cookie(TOKEN_COOKIE, token, max_age))
        .add(session_cookie(USER_COOKIE, profile.sub.clone(), max_age))
        .add(session_cookie(USERNAME_COOKIE, username, max_age))
        .add(session_cookie(VOICE_URL_COOKIE, voice.url.clone(), max_age));

    info!(
        target: "ps.handlers.session",
        user_id = %profile.sub,
        "Voice session staged"
    );

    Ok((jar, Redirect::to("/")))
}

/// Claim the staged credential. Works at most once.
///
/// GET /auth/session
#[instrument(skip_all, name = "ps.session.claim")]
pub async fn claim_session(
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<SessionClaimResponse>), PsError> {
    let staged = (
        jar.get(TOKEN_COOKIE),
        jar.get(USER_COOKIE),
        jar.get(USERNAME_COOKIE),
        jar.get(VOICE_URL_COOKIE),
    );

    let (Some(token), Some(user), Some(username), Some(voice_url)) = staged else {
        metrics::record_session_claim(false);
        return Err(PsError::NoSession);
    };

    let response = SessionClaimResponse {
        token: token.value().to_string(),
        url: voice_url.value().to_string(),
        username: username.value().to_string(),
        user_id: user.value().to_string(),
    };

    // Expire every staged cookie in the claiming response so the credential
    // cannot be read from the browser's store a second time.
    let jar = jar
        .remove(removal_cookie(TOKEN_COOKIE))
        .remove(removal_cookie(USER_COOKIE))
        .remove(removal_cookie(USERNAME_COOKIE))
        .remove(removal_cookie(VOICE_URL_COOKIE));

    metrics::record_session_claim(true);

    Ok((jar, Json(response)))
}

fn session_cookie(name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
