// Application layer - Fetch orchestration, chart state and live refresh
pub mod catalog_service;
pub mod chart_controller;
pub mod chart_editor;
pub mod dashboard_api;
pub mod dashboard_view;
pub mod errors;
pub mod layout_store;
pub mod live_refresh;
pub mod pipeline_runner;
pub mod request_lifecycle;
pub mod update_feed;
pub mod view_registry;

#[cfg(test)]
pub mod test_support;
