use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// How `clerk/user.deleted` treats a user that is not in the database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserDeleteMode {
    /// Delete every matching row; zero matches is not an error.
    #[default]
    Lenient,
    /// Delete exactly one row; a missing user is `NotFound`.
    Strict,
}

impl FromStr for UserDeleteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub frontend_origin: String,
    pub frontend_google_callback_url: String,
    pub google: Option<GoogleOAuthConfig>,
    pub session_secret: String,
    pub session_cookie_secure: bool,
    pub inngest_signing_key: Option<String>,
    pub user_delete_mode: UserDeleteMode,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let session_secret =
            var("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        let server_port = match var("SERVER_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "SERVER_PORT",
                value: raw,
            })?,
            None => 8000,
        };

        let user_delete_mode = match var("USER_DELETE_MODE") {
            Some(raw) => raw.parse().map_err(|value| ConfigError::Invalid {
                name: "USER_DELETE_MODE",
                value,
            })?,
            None => UserDeleteMode::default(),
        };

        let frontend_origin = var("FRONTEND_ORIGIN")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();
        let frontend_google_callback_url = var("FRONTEND_GOOGLE_CALLBACK_URL")
            .unwrap_or_else(|| format!("{}/google/oauth/callback", frontend_origin));

        // Google login is only enabled when the full client triple is present.
        let google = match (
            var("GOOGLE_CLIENT_ID"),
            var("GOOGLE_CLIENT_SECRET"),
            var("GOOGLE_CALLBACK_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(callback_url)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                callback_url,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            frontend_origin,
            frontend_google_callback_url,
            google,
            session_secret,
            session_cookie_secure: parse_bool(var("SESSION_COOKIE_SECURE"), false),
            inngest_signing_key: var("INNGEST_SIGNING_KEY"),
            user_delete_mode,
            run_migrations: parse_bool(var("RUN_MIGRATIONS"), true),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Where the frontend is sent when Google login fails.
    pub fn failure_redirect_url(&self) -> String {
        format!("{}?status=failure", self.frontend_google_callback_url)
    }

    pub fn success_redirect_url(&self) -> String {
        format!("{}?status=success", self.frontend_google_callback_url)
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}
