use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::VirtualMachine;
use crate::commands::{vmrun, ToolReport};

/// Parsed `vmrun listSnapshots` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotList {
    /// Header line as printed by vmrun, e.g. `Total snapshots: 2`
    pub total: String,
    pub snapshots: Vec<String>,
}

impl SnapshotList {
    /// First line is the header, every following line one snapshot name
    pub fn parse(output: &str) -> Self {
        let normalized = vmrun::normalize_output(output);
        let mut lines = normalized.split('\n');
        let total = lines.next().unwrap_or_default().to_string();
        let snapshots = lines.map(str::to_string).collect();
        Self { total, snapshots }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshots.iter().any(|s| s == name)
    }
}

impl VirtualMachine {
    /// Fails with the tool output when vmrun reports an error instead of a listing
    pub fn list_snapshots(&self) -> Result<SnapshotList> {
        let report = ToolReport::control(self.execute_verb("listSnapshots", "")?).into_result()?;
        Ok(SnapshotList::parse(&report.output))
    }

    fn snapshot_verb(&self, verb: &str, snapshot: &str) -> Result<ToolReport> {
        let Some(path) = self.path() else {
            bail!("VM {} not found", self.name());
        };
        let output = self.execute(&vmrun::snapshot_command(verb, path, snapshot))?;
        Ok(ToolReport::control(output))
    }

    pub fn create_snapshot(&self, snapshot: &str) -> Result<ToolReport> {
        self.snapshot_verb("snapshot", snapshot)
    }

    pub fn delete_snapshot(&self, snapshot: &str) -> Result<ToolReport> {
        self.snapshot_verb("deleteSnapshot", snapshot)
    }

    pub fn revert_snapshot(&self, snapshot: &str) -> Result<ToolReport> {
        self.snapshot_verb("revertToSnapshot", snapshot)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotAction {
    #[default]
    List,
    Create,
    Delete,
    Revert,
}

impl fmt::Display for SnapshotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Revert => "revert",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotOutcome {
    pub changed: bool,
    #[serde(flatten)]
    pub list: SnapshotList,
}

/// Apply a snapshot action idempotently: `create` is skipped if the snapshot
/// exists, `delete` and `revert` only run if it does.
pub fn apply_snapshot_action(
    vm: &VirtualMachine,
    action: SnapshotAction,
    snapshot: Option<&str>,
    check: bool,
) -> Result<SnapshotOutcome> {
    let name = match (action, snapshot) {
        (SnapshotAction::List, _) => "",
        (_, Some(name)) if !name.is_empty() => name,
        _ => bail!("A snapshot name is required to {}", action),
    };

    let list = vm.list_snapshots()?;
    let exists = list.contains(name);
    let unchanged = |list| Ok(SnapshotOutcome { changed: false, list });

    let report = match action {
        SnapshotAction::List => return unchanged(list),
        SnapshotAction::Create if exists => return unchanged(list),
        SnapshotAction::Delete | SnapshotAction::Revert if !exists => return unchanged(list),
        _ if check => return unchanged(list),
        SnapshotAction::Create => vm.create_snapshot(name)?,
        SnapshotAction::Delete => vm.delete_snapshot(name)?,
        SnapshotAction::Revert => vm.revert_snapshot(name)?,
    };
    report.into_result()?;

    Ok(SnapshotOutcome {
        changed: true,
        list: vm.list_snapshots()?,
    })
}
