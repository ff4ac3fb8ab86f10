use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::auth::token::{GoogleClaims, GoogleTokenVerifier};
use crate::config::GoogleOAuthConfig;
use crate::error::{AppError, AppResult};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested at login.
pub const SCOPES: &[&str] = &["profile", "email"];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Authorization-code flow against Google, ending in a verified ID token.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: Client,
    config: GoogleOAuthConfig,
    verifier: GoogleTokenVerifier,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        let verifier = GoogleTokenVerifier::new(http.clone(), config.client_id.clone());
        Ok(Self {
            http,
            config,
            verifier,
        })
    }

    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            GOOGLE_AUTHORIZE_URL,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchanges the authorization code and verifies the returned ID token.
    pub async fn exchange_code(&self, code: &str) -> AppResult<GoogleClaims> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.callback_url.as_str()),
        ];

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = match response.json::<TokenErrorResponse>().await {
                Ok(body) => format!(
                    "{}: {}",
                    body.error,
                    body.error_description.unwrap_or_default()
                ),
                Err(_) => status.to_string(),
            };
            return Err(AppError::OAuth(format!("Token exchange rejected ({})", detail)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to parse token response: {}", e)))?;
        let id_token = token
            .id_token
            .ok_or_else(|| AppError::OAuth("Token response has no id_token".to_string()))?;

        self.verifier.verify(&id_token).await
    }
}
