//! Shared application state.

use std::sync::Arc;

use vest_auth::TokenSigner;
use vest_config::VestConfig;
use vest_db::helpers::PageRequest;
use vest_db::service::VestService;
use vest_mail::{Mailer, Message};

use crate::error::StartupError;
use crate::extract::PageQuery;
use crate::upload::UploadStore;

/// Cheap-to-clone handle passed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    service: VestService,
    signer: TokenSigner,
    mailer: Mailer,
    uploads: UploadStore,
    config: VestConfig,
}

impl AppState {
    #[must_use]
    pub fn new(service: VestService, signer: TokenSigner, mailer: Mailer, config: VestConfig) -> Self {
        let uploads = UploadStore::new(&config.server.upload_dir, config.server.max_upload_bytes);
        Self {
            inner: Arc::new(Inner {
                service,
                signer,
                mailer,
                uploads,
                config,
            }),
        }
    }

    /// Open the database, validate the signing secret and build the mailer.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if any component cannot be built.
    pub async fn from_config(config: VestConfig) -> Result<Self, StartupError> {
        let signer = TokenSigner::from_config(&config.auth)?;
        let mailer = Mailer::from_config(&config.mail, &config.general)?;
        let service = VestService::from_config(&config).await?;
        tokio::fs::create_dir_all(&config.server.upload_dir).await?;
        Ok(Self::new(service, signer, mailer, config))
    }

    #[must_use]
    pub fn service(&self) -> &VestService {
        &self.inner.service
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }

    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    #[must_use]
    pub fn config(&self) -> &VestConfig {
        &self.inner.config
    }

    /// Clamp pagination parameters to the configured bounds.
    #[must_use]
    pub fn page(&self, query: &PageQuery) -> PageRequest {
        let general = &self.inner.config.general;
        PageRequest::clamped(
            query.page,
            query.per_page,
            general.default_page_size,
            general.max_page_size,
        )
    }

    /// Send an email without failing the request.
    pub async fn notify(&self, to: &str, message: Message<'_>) {
        self.inner.mailer.send_logged(to, &message).await;
    }
}
