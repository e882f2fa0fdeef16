// Series domain model and result grouping
use super::pipeline::PipelineResultRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the series that collects rows without a grouping value
pub const UNGROUPED_SERIES: &str = "";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub x: Vec<Value>,
    pub y: Vec<Value>,
}

impl Series {
    fn empty(name: String) -> Self {
        Self {
            name,
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// What to do with a row whose `x` or `y` is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Skip the row entirely
    #[default]
    Drop,
    /// Keep the row, using `null` for the missing side
    NullFill,
}

/// Splits flat pipeline rows into one series per grouping value.
///
/// Series are emitted in order of first occurrence of their grouping value and
/// every series keeps its rows in input order. Rows without a grouping value
/// form the [`UNGROUPED_SERIES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesGrouper {
    policy: MissingValuePolicy,
}

impl SeriesGrouper {
    pub fn new(policy: MissingValuePolicy) -> Self {
        Self { policy }
    }

    pub fn group(&self, rows: &[PipelineResultRow]) -> Vec<Series> {
        let mut series: Vec<Series> = Vec::new();

        for row in rows {
            let (x, y) = match (&row.x, &row.y, self.policy) {
                (Some(x), Some(y), _) => (x.clone(), y.clone()),
                (_, _, MissingValuePolicy::Drop) => continue,
                (x, y, MissingValuePolicy::NullFill) => (
                    x.clone().unwrap_or(Value::Null),
                    y.clone().unwrap_or(Value::Null),
                ),
            };

            let name = row.grouping.as_deref().unwrap_or(UNGROUPED_SERIES);
            let idx = match series.iter().position(|s| s.name == name) {
                Some(idx) => idx,
                None => {
                    series.push(Series::empty(name.to_string()));
                    series.len() - 1
                }
            };

            series[idx].x.push(x);
            series[idx].y.push(y);
        }

        series
    }
}
