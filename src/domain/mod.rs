// Domain layer - Pipelines, charts, dashboards and derived series
pub mod chart;
pub mod dashboard;
pub mod pipeline;
pub mod series;
