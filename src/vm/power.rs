//! Power state and power operations

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::VirtualMachine;
use crate::commands::vmrun::{self, Force, StartMode, PAUSED_PHRASE};
use crate::commands::ToolReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Stopped,
    Started,
    Paused,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State requested by a caller. `Reset` and `Unpaused` are transitions rather
/// than states a VM can be observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PowerTarget {
    Started,
    Stopped,
    Reset,
    Paused,
    Unpaused,
}

impl PowerTarget {
    /// Whether a VM observed in `state` already satisfies this target
    pub fn is_satisfied_by(&self, state: PowerState) -> bool {
        matches!(
            (self, state),
            (Self::Started, PowerState::Started)
                | (Self::Stopped, PowerState::Stopped)
                | (Self::Paused, PowerState::Paused)
        )
    }
}

impl VirtualMachine {
    /// Stopped unless `vmrun list` reported the VM; a running VM is queried
    /// with a guest command to tell paused from started.
    pub fn power_state(&self) -> Result<PowerState> {
        let Some(path) = self.path() else {
            return Ok(PowerState::Stopped);
        };
        if !self.context().running().contains(path) {
            return Ok(PowerState::Stopped);
        }

        let (user, password) = self.context().guest_credentials();
        let listing = self.execute(&vmrun::list_guest_processes(user, password, path))?;
        let state = if listing.contains(PAUSED_PHRASE) {
            PowerState::Paused
        } else {
            PowerState::Started
        };
        debug!(vm = %self.name(), state = %state, "power state");
        Ok(state)
    }

    pub fn start(&self, mode: StartMode) -> Result<ToolReport> {
        Ok(ToolReport::control(self.execute_verb("start", mode.as_str())?))
    }

    pub fn stop(&self, force: Force) -> Result<ToolReport> {
        Ok(ToolReport::control(self.execute_verb("stop", force.as_str())?))
    }

    pub fn reset(&self, force: Force) -> Result<ToolReport> {
        Ok(ToolReport::control(self.execute_verb("reset", force.as_str())?))
    }

    pub fn suspend(&self, force: Force) -> Result<ToolReport> {
        Ok(ToolReport::control(self.execute_verb("suspend", force.as_str())?))
    }

    pub fn pause(&self) -> Result<ToolReport> {
        Ok(ToolReport::control(self.execute_verb("pause", "")?))
    }

    /// Unpause, or do nothing if the VM is already running normally
    pub fn unpause(&self) -> Result<ToolReport> {
        if self.power_state()? == PowerState::Started {
            return Ok(ToolReport::skipped());
        }
        Ok(ToolReport::control(self.execute_verb("unpause", "")?))
    }
}

/// Result of driving a VM towards a power target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerChange {
    pub changed: bool,
    pub before: PowerState,
    pub after: PowerTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Issue the one operation that moves the VM to `target`, if any.
///
/// In check mode nothing is run and `changed` reports whether the observed
/// state differs from the target. A tool failure is returned as an error
/// carrying the tool's message.
pub fn apply_power_target(
    vm: &VirtualMachine,
    target: PowerTarget,
    start_mode: StartMode,
    force: Force,
    check: bool,
) -> Result<PowerChange> {
    if !vm.exists() {
        bail!("VM {} not found", vm.name());
    }

    let before = vm.power_state()?;
    let mut change = PowerChange {
        changed: false,
        before,
        after: target,
        msg: None,
    };

    if check {
        change.changed = !target.is_satisfied_by(before);
        return Ok(change);
    }

    if target == PowerTarget::Unpaused && before == PowerState::Started {
        return Ok(change);
    }
    if target.is_satisfied_by(before) {
        return Ok(change);
    }

    let report = match target {
        PowerTarget::Started => vm.start(start_mode)?,
        PowerTarget::Stopped => vm.stop(force)?,
        PowerTarget::Reset => vm.reset(force)?,
        PowerTarget::Paused => vm.pause()?,
        PowerTarget::Unpaused => vm.unpause()?,
    }
    .into_result()?;

    change.changed = report.changed();
    change.msg = Some(report.output);
    Ok(change)
}
