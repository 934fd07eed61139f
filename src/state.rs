use std::sync::Arc;

use crate::{
    auth::AdminGuard,
    config::SiteConfig,
    notify::LeadNotifier,
    storage::Storage,
};

/// Shared handles passed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub guard: Arc<AdminGuard>,
    pub notifier: Arc<dyn LeadNotifier>,
    pub site: Arc<SiteConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Storage>,
        guard: AdminGuard,
        notifier: Arc<dyn LeadNotifier>,
        site: SiteConfig,
    ) -> Self {
        Self {
            store,
            guard: Arc::new(guard),
            notifier,
            site: Arc::new(site),
        }
    }
}
