use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::token::GoogleClaims;
use crate::error::{AppError, AppResult};

pub const SESSION_COOKIE: &str = "session";
pub const STATE_COOKIE: &str = "oauth_state";

const SESSION_TTL_HOURS: i64 = 24;
const STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issues the signed session cookie set after a successful login.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
    secure: bool,
}

impl SessionIssuer {
    pub fn new(secret: impl Into<String>, secure: bool) -> Self {
        Self {
            secret: secret.into(),
            secure,
        }
    }

    pub fn issue(&self, claims: &GoogleClaims) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + chrono::Duration::hours(SESSION_TTL_HOURS);
        let session = SessionClaims {
            sub: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone().unwrap_or_default(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &session,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))
    }

    pub fn validate(&self, token: &str) -> AppResult<SessionClaims> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid session: {}", e)))
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(SESSION_COOKIE, token, "/", SESSION_TTL_HOURS * 3600)
    }

    pub fn clear_session_cookie(&self) -> String {
        self.cookie(SESSION_COOKIE, "", "/", 0)
    }

    pub fn state_cookie(&self, state: &str) -> String {
        self.cookie(STATE_COOKIE, state, "/auth/google", STATE_TTL_SECS)
    }

    pub fn clear_state_cookie(&self) -> String {
        self.cookie(STATE_COOKIE, "", "/auth/google", 0)
    }

    fn cookie(&self, name: &str, value: &str, path: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
            name, value, path, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Reads one cookie out of the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
