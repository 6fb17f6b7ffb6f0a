use std::sync::Arc;

use crate::config::Config;
use crate::services::adaptive::AdaptiveCoordinator;
use crate::services::session_service::{SessionService, SessionStore};

pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub coordinator: Arc<AdaptiveCoordinator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let coordinator = if config.learned_enabled {
            AdaptiveCoordinator::from_model_source(config.model_source())
        } else {
            tracing::info!("Learned decisions disabled, using the threshold rule only");
            AdaptiveCoordinator::rule_only()
        };

        Self::with_coordinator(config, coordinator)
    }

    pub fn with_coordinator(config: Config, coordinator: AdaptiveCoordinator) -> Self {
        // Load the model now rather than on the first answer.
        if coordinator.warm_up() {
            tracing::info!("Learned decision provider ready");
        }

        Self {
            config,
            sessions: Arc::new(SessionStore::new()),
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(
            self.sessions.clone(),
            self.coordinator.clone(),
            self.config.session_defaults(),
        )
    }
}

pub mod adaptive;
pub mod export;
pub mod puzzle_generator;
pub mod session_service;
pub mod training;
