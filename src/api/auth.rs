use crate::api::errors::ApiError;
use crate::ingest::handler::AppState;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SESSION_COOKIE: &str = "tripdesk_session";
const MIN_PASSWORD_LEN: usize = 8;

/// In-memory admin sessions keyed by opaque token.
///
/// Sessions do not survive a restart; the admin logs in again.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return its token (64 hex characters).
    pub fn create(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.sessions
            .lock()
            .insert(token.clone(), Instant::now() + self.ttl);
        token
    }

    /// `true` when the token names a live session. Expired tokens are removed.
    pub fn validate(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get(token) {
            Some(expires) if *expires > Instant::now() => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.lock().remove(token);
    }

    /// Drop expired sessions.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.sessions.lock().retain(|_, expires| *expires > now);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[derive(Debug)]
pub enum AuthError {
    Hash(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(msg) => write!(f, "Password hashing failed: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Hash a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Session token from the `tripdesk_session` cookie or a bearer header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        max_age.as_secs()
    )
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub setup_required: bool,
    pub authenticated: bool,
}

fn session_response(state: &AppState) -> Result<Response, ApiError> {
    let token = state.sessions.create();
    let cookie = HeaderValue::from_str(&session_cookie(&token, state.sessions.ttl()))
        .map_err(|e| ApiError::Internal(format!("Invalid cookie header: {e}")))?;
    Ok(([(header::SET_COOKIE, cookie)], Json(SessionResponse { token })).into_response())
}

/// POST /api/auth/setup: Choose the admin password. Only allowed once.
pub async fn auth_setup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordRequest>,
) -> Result<Response, ApiError> {
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if state.admin_password_hash.lock().is_some() {
        return Err(ApiError::Conflict(
            "admin password is already set".to_string(),
        ));
    }

    let hash = tokio::task::spawn_blocking(move || hash_password(&req.password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hash task panicked: {e}")))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    {
        let mut stored = state.admin_password_hash.lock();
        // A concurrent setup may have won the race while hashing.
        if stored.is_some() {
            return Err(ApiError::Conflict(
                "admin password is already set".to_string(),
            ));
        }
        *stored = Some(hash);
    }
    tracing::info!("Admin password configured");
    session_response(&state)
}

/// POST /api/auth/login: Exchange the admin password for a session.
pub async fn auth_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordRequest>,
) -> Result<Response, ApiError> {
    let Some(hash) = state.admin_password_hash.lock().clone() else {
        return Err(ApiError::Unauthorized(
            "admin password has not been set up".to_string(),
        ));
    };

    let valid = tokio::task::spawn_blocking(move || verify_password(&req.password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verify task panicked: {e}")))?;
    if !valid {
        tracing::warn!("Failed admin login attempt");
        return Err(ApiError::Unauthorized("invalid password".to_string()));
    }
    session_response(&state)
}

/// POST /api/auth/logout: End the current session and clear the cookie.
pub async fn auth_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        state.sessions.revoke(&token);
    }
    let cleared = session_cookie("", Duration::ZERO);
    (
        [(header::SET_COOKIE, cleared)],
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}

/// GET /api/auth/status: Whether setup is pending and the caller is logged in.
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthStatus> {
    let setup_required = state.admin_password_hash.lock().is_none();
    let authenticated = extract_token(&headers).is_some_and(|t| state.sessions.validate(&t));
    Json(AuthStatus {
        setup_required,
        authenticated,
    })
}

/// Middleware guarding admin routes.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = extract_token(request.headers()).is_some_and(|t| state.sessions.validate(&t));
    if authorized {
        next.run(request).await
    } else {
        ApiError::Unauthorized("authentication required".to_string()).into_response()
    }
}

/// Extractor for handlers that share a path with a public route and so
/// cannot sit behind [`require_auth`].
pub struct AdminSession;

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if extract_token(&parts.headers).is_some_and(|t| state.sessions.validate(&t)) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized("authentication required".to_string()))
        }
    }
}
