//! Classification of external tool output
//!
//! Neither VMware tool has a usable exit-status protocol, so success and
//! failure are read from the text. All substring matching lives here.

use anyhow::{bail, Result};
use serde::Serialize;

/// Substring vmrun prints when an operation fails
pub const CONTROL_FAILURE: &str = "Error";
/// Substring vmware-vdiskmanager prints when an operation fails
pub const DISK_FAILURE: &str = "Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The tool ran and changed something
    Changed,
    /// Nothing was changed (no-op, or the tool ran without confirming success)
    Unchanged,
    /// The tool reported a failure
    Failed,
}

/// Result text of one tool invocation together with its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    pub output: String,
    pub verdict: Verdict,
}

impl ToolReport {
    /// Classify vmrun output: anything mentioning `Error` failed
    pub fn control(output: String) -> Self {
        let verdict = if output.contains(CONTROL_FAILURE) {
            Verdict::Failed
        } else {
            Verdict::Changed
        };
        Self { output, verdict }
    }

    /// Classify vmware-vdiskmanager output against the phrase the operation
    /// prints on success
    pub fn disk(output: String, success_phrase: &str) -> Self {
        let verdict = if output.contains(DISK_FAILURE) {
            Verdict::Failed
        } else if output.contains(success_phrase) {
            Verdict::Changed
        } else {
            Verdict::Unchanged
        };
        Self { output, verdict }
    }

    /// Report for an operation that was not sent to the tool
    pub fn skipped() -> Self {
        Self {
            output: String::new(),
            verdict: Verdict::Unchanged,
        }
    }

    pub fn changed(&self) -> bool {
        self.verdict == Verdict::Changed
    }

    pub fn failed(&self) -> bool {
        self.verdict == Verdict::Failed
    }

    /// Turn a failed report into an error carrying the tool output verbatim
    pub fn into_result(self) -> Result<Self> {
        if self.failed() {
            bail!("{}", self.output);
        }
        Ok(self)
    }
}
