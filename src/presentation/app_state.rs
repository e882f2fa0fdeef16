// Application state for HTTP handlers
use crate::application::catalog_service::CatalogService;
use crate::application::dashboard_api::DashboardApi;
use crate::application::dashboard_view::ViewConfig;
use crate::application::view_registry::ViewRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DashboardApi>,
    pub catalog: CatalogService,
    pub view_config: ViewConfig,
    /// Dashboard views mounted by open streams
    pub views: Arc<ViewRegistry>,
}

impl AppState {
    pub fn new(api: Arc<dyn DashboardApi>, view_config: ViewConfig) -> Self {
        Self {
            catalog: CatalogService::new(api.clone()),
            api,
            view_config,
            views: Arc::new(ViewRegistry::new()),
        }
    }
}
