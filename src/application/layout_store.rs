// Dashboard layout store - Chart list and grid placement of one dashboard
use crate::application::dashboard_api::DashboardApi;
use crate::application::errors::{FetchError, FetchResult};
use crate::application::request_lifecycle::FetchScope;
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, LayoutEntry, LayoutMismatch};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_GRID_COLUMNS: u32 = 12;

/// Dashboard as loaded, with its layout already reconciled
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub dashboard: Dashboard,
    /// Set when the stored layout did not match the chart list
    pub reconciled: Option<LayoutMismatch>,
}

pub struct DashboardLayoutStore {
    api: Arc<dyn DashboardApi>,
    columns: u32,
    current: RwLock<Option<Dashboard>>,
}

impl DashboardLayoutStore {
    pub fn new(api: Arc<dyn DashboardApi>, columns: u32) -> Self {
        Self {
            api,
            columns,
            current: RwLock::new(None),
        }
    }

    /// Fetch a dashboard and make its layout hold one entry per chart.
    ///
    /// A mismatch is repaired (see [`Dashboard::reconcile_layout`]) and logged;
    /// it never fails the load.
    pub async fn load(&self, dashboard_id: &str, scope: &FetchScope) -> FetchResult<DashboardSnapshot> {
        let mut dashboard = scope.run(self.api.get_dashboard(dashboard_id)).await?;

        let reconciled = dashboard.reconcile_layout(self.columns);
        if let Some(mismatch) = reconciled {
            tracing::warn!(
                "Dashboard {} has {} layout entries for {} charts; layout reconciled",
                dashboard_id,
                mismatch.layout,
                mismatch.charts
            );
        }

        *self.current.write().await = Some(dashboard.clone());
        Ok(DashboardSnapshot {
            dashboard,
            reconciled,
        })
    }

    pub async fn layout(&self) -> Vec<LayoutEntry> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|d| d.charts_layout.clone())
            .unwrap_or_default()
    }

    pub async fn charts(&self) -> Vec<Chart> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|d| d.charts.clone())
            .unwrap_or_default()
    }

    /// Replace the layout locally, then persist it.
    ///
    /// The update is optimistic and is NOT rolled back when persisting fails:
    /// the caller gets [`FetchError::LayoutPersistFailed`] to surface, while the
    /// local layout keeps what the user arranged. Layout is cosmetic state and a
    /// stale server copy is preferred over snapping charts back on screen.
    ///
    /// A layout whose length differs from the chart count is rejected before
    /// anything changes.
    pub async fn update_layout(
        &self,
        dashboard_id: &str,
        new_layout: Vec<LayoutEntry>,
        scope: &FetchScope,
    ) -> FetchResult<()> {
        {
            let mut current = self.current.write().await;
            let dashboard = current
                .as_mut()
                .filter(|d| d.id == dashboard_id)
                .ok_or_else(|| FetchError::NotFound(format!("dashboard {dashboard_id}")))?;

            if new_layout.len() != dashboard.charts.len() {
                return Err(FetchError::IntegrityMismatch(LayoutMismatch {
                    charts: dashboard.charts.len(),
                    layout: new_layout.len(),
                }));
            }
            dashboard.charts_layout = new_layout.clone();
        }

        match scope.run(self.api.patch_layout(dashboard_id, &new_layout)).await {
            Ok(()) => Ok(()),
            Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    "Failed to persist layout of dashboard {}, keeping local layout: {}",
                    dashboard_id,
                    e
                );
                Err(FetchError::LayoutPersistFailed(e.to_string()))
            }
        }
    }
}
