use crate::error::UnknownPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decides what happens to a test's scratch entries once the test has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// delete regardless of the outcome
    Always,
    /// delete only when the test passed, keep them for inspection otherwise
    #[default]
    #[serde(rename = "passed")]
    IfPassed,
    /// never delete
    Never,
}

impl DeletePolicy {
    pub fn should_delete(self, test_failed: bool) -> bool {
        match self {
            DeletePolicy::Always => true,
            DeletePolicy::IfPassed => !test_failed,
            DeletePolicy::Never => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeletePolicy::Always => "always",
            DeletePolicy::IfPassed => "passed",
            DeletePolicy::Never => "never",
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "always" => Ok(DeletePolicy::Always),
            "passed" => Ok(DeletePolicy::IfPassed),
            "never" => Ok(DeletePolicy::Never),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}
