//! Authentication endpoints
//!
//! Login issues a one-time code; verify and refresh hand back a bearer
//! credential in the body and the session hash in the `_refresh` cookie.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireClaims;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SessionResponse, UserResponse};
use crate::infrastructure::services::{AuthOutcome, LoginAck, LoginRequest, VerifyRequest};

/// Cookie carrying the refresh session hash
pub const REFRESH_COOKIE: &str = "_refresh";

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/refresh", post(refresh))
        .route("/sessions", get(sessions))
        .route("/logout", delete(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutParams {
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginAck>, ApiError> {
    let ack = state
        .auth_service
        .login(LoginRequest {
            email: body.email,
            avatar: body.avatar,
            username: body.username,
        })
        .await?;

    Ok(Json(ack))
}

/// GET /auth/verify?code=..&email=..
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let outcome = state
        .auth_service
        .verify(VerifyRequest {
            code: params.code,
            email: params.email,
            ip: client_ip(&headers),
            user_agent: header_str(&headers, header::USER_AGENT.as_str()),
        })
        .await?;

    authenticated(&state, outcome)
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let hash = read_cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| ApiError::bad_request("refresh token missing"))?;

    let outcome = state.auth_service.refresh(&hash).await?;
    authenticated(&state, outcome)
}

/// GET /auth/sessions
pub async fn sessions(
    State(state): State<AppState>,
    RequireClaims { user_id, .. }: RequireClaims,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let current = read_cookie(&headers, REFRESH_COOKIE);
    let sessions = state.auth_service.sessions(&user_id).await?;

    Ok(Json(
        sessions
            .iter()
            .map(|s| SessionResponse::new(s, current.as_deref()))
            .collect(),
    ))
}

/// DELETE /auth/logout[?session=..]
///
/// Without `session` the cookie's session is revoked and the cookie cleared.
pub async fn logout(
    State(state): State<AppState>,
    RequireClaims { user_id, .. }: RequireClaims,
    Query(params): Query<LogoutParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (hash, from_cookie) = match params.session.filter(|s| !s.is_empty()) {
        Some(hash) => (hash, false),
        None => {
            let hash = read_cookie(&headers, REFRESH_COOKIE)
                .ok_or_else(|| ApiError::bad_request("refresh token missing"))?;
            (hash, true)
        }
    };

    state.auth_service.logout(&user_id, &hash).await?;

    if from_cookie {
        let cleared = refresh_cookie("", Utc::now())?;
        Ok(([(header::SET_COOKIE, cleared)], StatusCode::OK).into_response())
    } else {
        Ok(StatusCode::OK.into_response())
    }
}

fn authenticated(state: &AppState, outcome: AuthOutcome) -> Result<Response, ApiError> {
    let cookie = refresh_cookie(outcome.session.hash(), outcome.session.expires_at())?;
    let body = AuthResponse {
        access_token: outcome.credential,
        token_type: "Bearer",
        expires_in: state.credentials().default_ttl().num_seconds(),
        user: UserResponse::from(&outcome.user),
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

fn refresh_cookie(value: &str, expires: DateTime<Utc>) -> Result<HeaderValue, ApiError> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Expires={}",
        REFRESH_COOKIE,
        value,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal(e.to_string()))
}

/// Value of the named cookie from any `Cookie` header
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
