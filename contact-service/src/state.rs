//! Application state for the contact service.

use std::sync::Arc;

use common::config::{AppConfig, DbSettings};
use common::errors::AppResult;

use crate::bootstrap::Bootstrap;
use crate::db_manager::DatabaseManager;
use crate::mailer::{DisabledNotifier, Notifier, SmtpMailer};
use crate::service::FormService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub manager: Arc<DatabaseManager>,
    pub notifier: Arc<dyn Notifier>,
    pub bootstrap: Arc<Bootstrap>,
}

impl AppState {
    /// Builds the state from loaded configuration. SMTP stays disabled
    /// without credentials.
    pub fn new(config: AppConfig, db_settings: DbSettings) -> AppResult<Self> {
        let notifier: Arc<dyn Notifier> = if config.mail.is_configured() {
            Arc::new(SmtpMailer::new(&config.mail)?)
        } else {
            tracing::warn!("SMTP credentials not set, contact notifications disabled");
            Arc::new(DisabledNotifier)
        };
        let manager = Arc::new(DatabaseManager::new(db_settings));
        Ok(Self::with_parts(config, manager, notifier))
    }

    pub fn with_parts(
        config: AppConfig,
        manager: Arc<DatabaseManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let bootstrap = Arc::new(Bootstrap::new(
            manager.clone(),
            config.bootstrap_projects.clone(),
        ));
        Self {
            config: Arc::new(config),
            manager,
            notifier,
            bootstrap,
        }
    }

    /// Form service for one project.
    pub fn form_service(&self, project: &str) -> FormService {
        FormService::new(self.manager.clone(), self.notifier.clone(), project)
    }
}
