use std::sync::Arc;

use sa_domain::config::Config;
use sa_registry::ServiceRegistry;

/// Shared application state passed to every API handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ServiceRegistry>,
}
