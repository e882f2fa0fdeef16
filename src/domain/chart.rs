// Chart domain model
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartKind {
    #[default]
    TimeseriesLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: String,
    pub key: String,
}

impl Axis {
    pub fn new(label: &str, key: &str) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub pipeline_id: String,
    #[serde(rename = "type_", default)]
    pub kind: ChartKind,
    #[serde(default = "default_x_axis")]
    pub x_axis: Axis,
    #[serde(default = "default_y_axis")]
    pub y_axis: Axis,
    /// Shown and saved by the editor only. Series are always grouped on each
    /// row's own `grouping` value, whatever this field holds.
    #[serde(default)]
    pub grouping: String,
}

fn default_x_axis() -> Axis {
    Axis::new("X-axis", "x")
}

fn default_y_axis() -> Axis {
    Axis::new("Y-axis", "y")
}

impl Chart {
    pub fn new(id: &str, name: &str, pipeline_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            pipeline_id: pipeline_id.to_string(),
            kind: ChartKind::TimeseriesLine,
            x_axis: default_x_axis(),
            y_axis: default_y_axis(),
            grouping: String::new(),
        }
    }
}
