// Dashboard domain model
use super::chart::Chart;
use serde::{Deserialize, Serialize};

/// Placement of one chart on the grid, in grid units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Chart id the entry belongs to
    pub i: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl LayoutEntry {
    pub fn new(chart_id: &str, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            i: chart_id.to_string(),
            x,
            y,
            w,
            h,
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub charts: Vec<Chart>,
    #[serde(default)]
    pub charts_layout: Vec<LayoutEntry>,
}

/// Difference between the chart count and the layout length of a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutMismatch {
    pub charts: usize,
    pub layout: usize,
}

impl Dashboard {
    pub fn layout_mismatch(&self) -> Option<LayoutMismatch> {
        (self.charts.len() != self.charts_layout.len()).then_some(LayoutMismatch {
            charts: self.charts.len(),
            layout: self.charts_layout.len(),
        })
    }

    /// Make the layout hold exactly one entry per chart.
    ///
    /// Surplus entries are dropped from the end. Charts without an entry get a
    /// 1x1 placement, appended in chart order and laid out left to right in
    /// rows below the existing content.
    pub fn reconcile_layout(&mut self, columns: u32) -> Option<LayoutMismatch> {
        let mismatch = self.layout_mismatch()?;
        let columns = columns.max(1);

        self.charts_layout.truncate(self.charts.len());

        let top = self
            .charts_layout
            .iter()
            .map(LayoutEntry::bottom)
            .max()
            .unwrap_or(0);

        let missing = &self.charts[self.charts_layout.len()..];
        let synthesized: Vec<LayoutEntry> = missing
            .iter()
            .enumerate()
            .map(|(k, chart)| {
                let k = k as u32;
                LayoutEntry::new(&chart.id, k % columns, top.saturating_add(k / columns), 1, 1)
            })
            .collect();
        self.charts_layout.extend(synthesized);

        Some(mismatch)
    }
}
