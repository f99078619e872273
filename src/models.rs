use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Normalized, untyped display data produced by a service update.
///
/// An empty payload means the service had nothing to report this cycle.
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Cancelled,
    Crashed,
    Working,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub author: Option<String>,
    pub elapsed: String,
    pub message: String,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildReport {
    pub name: String,
    pub builds: Vec<BuildSummary>,
}

impl BuildReport {
    pub fn into_payload(self) -> Result<Payload> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

/// Everything printed for one dashboard poll.
#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub project_name: String,
    pub style: String,
    pub services: indexmap::IndexMap<String, Payload>,
}
