// Pipeline domain model
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Entry of the pipeline listing (no stages)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub collection: String,
}

/// Full pipeline definition. Stages are opaque aggregation documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub stages: Vec<Value>,
}

impl Pipeline {
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            database_name: self.database_name.clone(),
            collection: self.collection.clone(),
        }
    }
}

/// One row produced by executing a pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineResultRow {
    #[serde(default, deserialize_with = "present_scalar")]
    pub x: Option<Value>,
    #[serde(default, deserialize_with = "present_scalar")]
    pub y: Option<Value>,
    #[serde(default, deserialize_with = "grouping_key")]
    pub grouping: Option<String>,
}

impl PipelineResultRow {
    pub fn new(x: impl Into<Value>, y: impl Into<Value>, grouping: Option<&str>) -> Self {
        Self {
            x: Some(x.into()),
            y: Some(y.into()),
            grouping: grouping.map(str::to_string),
        }
    }
}

// An explicit JSON null counts as missing.
fn present_scalar<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(other),
    })
}

/// Grouping values are compared by their textual form, so `1` and `"1"` land in
/// the same series.
fn grouping_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
