use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use super::VirtualMachine;
use crate::commands::vmrun::{self, CloneMode};
use crate::commands::ToolReport;

impl VirtualMachine {
    /// Clone this VM into `{defaultVMPath}\{target}\{target}.vmx`.
    ///
    /// The destination always follows the default VM directory layout; the
    /// inventory is never consulted for it.
    pub fn clone_to(&self, target: &str, mode: CloneMode, snapshot: Option<&str>) -> Result<ToolReport> {
        let Some(source) = self.path() else {
            bail!("Template VM does not exist");
        };
        let Some(destination) = self.context().conventional_path(target)? else {
            bail!("Default VM directory is not configured; cannot place clone {}", target);
        };
        debug!(source, destination = %destination, mode = %mode, "cloning VM");

        let output = self.execute(&vmrun::clone(source, &destination, target, mode, snapshot))?;
        Ok(ToolReport::control(output.trim_matches(['\r', '\n']).to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneOutcome {
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloneresult: Option<String>,
}

/// Clone `template` into a VM called `name`.
///
/// vmrun prints nothing on a successful clone, so only empty output counts
/// as a change. In check mode nothing is run and `changed` reports whether
/// `name` is missing.
pub fn apply_clone(
    template: &VirtualMachine,
    name: &str,
    mode: CloneMode,
    snapshot: Option<&str>,
    check: bool,
) -> Result<CloneOutcome> {
    if check {
        let missing = template.context().resolve_descriptor_path(name)?.is_none();
        return Ok(CloneOutcome {
            changed: missing,
            failed: false,
            cloneresult: None,
        });
    }

    let report = template.clone_to(name, mode, snapshot)?;
    Ok(CloneOutcome {
        changed: report.output.is_empty(),
        failed: report.failed(),
        cloneresult: Some(report.output),
    })
}
