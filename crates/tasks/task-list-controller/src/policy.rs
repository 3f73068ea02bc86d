//! What to do with a local mutation whose remote call failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Local changes are final. Remote failures are only logged.
    #[default]
    OptimisticAlways,
    /// A failed remote call undoes the local change it belonged to.
    RollbackOnFailure,
}

impl ConsistencyPolicy {
    pub fn rolls_back(self) -> bool {
        matches!(self, ConsistencyPolicy::RollbackOnFailure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConsistencyPolicy::OptimisticAlways => "optimistic_always",
            ConsistencyPolicy::RollbackOnFailure => "rollback_on_failure",
        }
    }
}

impl fmt::Display for ConsistencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsistencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "optimistic_always" | "optimistic" => Ok(ConsistencyPolicy::OptimisticAlways),
            "rollback_on_failure" | "rollback" => Ok(ConsistencyPolicy::RollbackOnFailure),
            other => Err(format!(
                "unknown consistency policy '{other}', expected optimistic_always or rollback_on_failure"
            )),
        }
    }
}
