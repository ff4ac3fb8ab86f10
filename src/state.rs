use std::sync::Arc;

use crate::auth::{GoogleOAuthClient, SessionIssuer};
use crate::config::Config;
use crate::error::AppResult;
use crate::events::{SigningKey, SyncOptions};
use crate::store::IdentityStore;

/// Dependencies shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn IdentityStore>,
    pub google: Option<GoogleOAuthClient>,
    pub sessions: SessionIssuer,
    pub signing_key: Option<Arc<SigningKey>>,
    pub sync_options: SyncOptions,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn IdentityStore>) -> AppResult<Self> {
        let google = match config.google.clone() {
            Some(google_config) => {
                tracing::info!("Google OAuth configured");
                Some(GoogleOAuthClient::new(google_config)?)
            }
            None => {
                tracing::info!("Google OAuth not configured");
                None
            }
        };

        let signing_key = match config.inngest_signing_key.as_deref() {
            Some(key) => Some(Arc::new(SigningKey::new(key))),
            None => {
                tracing::warn!("INNGEST_SIGNING_KEY not set, event signatures will not be verified");
                None
            }
        };

        Ok(Self {
            sessions: SessionIssuer::new(
                config.session_secret.clone(),
                config.session_cookie_secure,
            ),
            sync_options: SyncOptions {
                user_delete_mode: config.user_delete_mode,
            },
            google,
            signing_key,
            store,
            config: Arc::new(config),
        })
    }
}
