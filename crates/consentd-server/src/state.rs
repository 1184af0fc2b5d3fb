//! Shared application state.

use std::sync::Arc;

use consentd_core::ConsentdConfig;
use consentd_engine::{ConsentService, RetentionValidator};
use consentd_store::ConsentStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ConsentdConfig,
    pub service: ConsentService,
    pub validator: RetentionValidator,
}

impl AppState {
    pub fn new(config: ConsentdConfig, store: Arc<ConsentStore>) -> Self {
        let service = ConsentService::new(
            store.clone(),
            config.policy.clone(),
            config.data_controller.clone(),
            config.data_processor.clone(),
        );
        let validator = RetentionValidator::new(store, config.policy.clone());

        Self {
            config,
            service,
            validator,
        }
    }
}
