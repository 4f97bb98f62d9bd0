//! State shared by all request handlers.

use std::sync::Arc;
use std::time::Duration;

use keyrelay_config::{Config, Secrets};
use keyrelay_store::{KeyPool, KeyStore, UserStore};

use crate::error::{ErrorPolicy, ServerError};
use crate::services::{
    AssignService, ConversationService, RelayService, ReportService, VoiceService,
};
use crate::upstream::{AnthropicClient, ChatBackend, VoiceBackend, VoiceClient};

#[derive(Clone)]
pub struct AppState {
    pub assign: Arc<AssignService>,
    pub relay: Arc<RelayService>,
    /// Client-key gated chat, charged against each key's quota.
    pub conversation: Arc<ConversationService>,
    pub reports: Arc<ReportService>,
    pub voice: Arc<VoiceService>,
    pub clients: Arc<dyn KeyStore>,
    /// Bearer token for admin endpoints. `None` leaves `/admin-data` open
    /// and disables `/generate-api-key`.
    pub admin_password: Option<Arc<str>>,
    pub errors: ErrorPolicy,
}

impl AppState {
    /// Wire services against the real Anthropic and ElevenLabs clients.
    pub fn new(
        config: &Config,
        secrets: &Secrets,
        store: Arc<dyn UserStore>,
        clients: Arc<dyn KeyStore>,
    ) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.request_timeout_secs))
            .build()?;
        let chat = Arc::new(AnthropicClient::new(http.clone(), &config.upstream));
        let voice = Arc::new(VoiceClient::new(http, &config.voice));
        Ok(Self::with_backends(config, secrets, store, clients, chat, voice))
    }

    /// Wire services against arbitrary upstream backends.
    pub fn with_backends(
        config: &Config,
        secrets: &Secrets,
        store: Arc<dyn UserStore>,
        clients: Arc<dyn KeyStore>,
        chat: Arc<dyn ChatBackend>,
        voice: Arc<dyn VoiceBackend>,
    ) -> Self {
        let errors = ErrorPolicy::new(config.server.expose_error_details);
        let pool = KeyPool::new(secrets.claude_keys.iter().cloned());

        Self {
            assign: Arc::new(AssignService::new(store.clone(), pool.clone(), errors)),
            relay: Arc::new(RelayService::new(
                chat.clone(),
                store.clone(),
                pool.clone(),
                errors,
            )),
            conversation: Arc::new(ConversationService::new(
                chat,
                clients.clone(),
                pool.clone(),
                errors,
            )),
            reports: Arc::new(ReportService::new(
                store,
                pool.len(),
                config.admin.recent_activity_limit,
                Duration::from_secs(config.admin.cache_ttl_secs),
                errors,
            )),
            voice: Arc::new(VoiceService::new(voice, secrets, errors)),
            clients,
            admin_password: secrets.admin_password.as_deref().map(Arc::from),
            errors,
        }
    }
}
