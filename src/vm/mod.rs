//! Virtual machine facade
//!
//! A [`VirtualMachine`] is a VM name resolved once against the host context.
//! A VM whose descriptor cannot be found is not an error: it simply does not
//! exist, and only the operations that need a source fail.

pub mod clone;
pub mod descriptor;
pub mod devices;
pub mod inventory;
pub mod power;
pub mod running;
pub mod snapshot;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use crate::commands::{vmrun, ToolArgs};
use crate::host::HostContext;

pub use clone::{apply_clone, CloneOutcome};
pub use descriptor::DescriptorMap;
pub use devices::{apply_settings, cdrom_settings, vdisk_settings, CdromMount};
pub use inventory::InventoryIndex;
pub use power::{apply_power_target, PowerChange, PowerState, PowerTarget};
pub use running::RunningSet;
pub use snapshot::{apply_snapshot_action, SnapshotAction, SnapshotList, SnapshotOutcome};

/// Name, descriptor path and parsed descriptor of a VM
#[derive(Debug, Clone, Serialize)]
pub struct VmFacts {
    pub name: String,
    pub vmx: String,
    pub config: DescriptorMap,
}

#[derive(Debug)]
pub struct VirtualMachine {
    name: String,
    descriptor_path: Option<String>,
    ctx: HostContext,
}

impl VirtualMachine {
    /// Resolve `name` on the host. Fails only if the host's config files
    /// cannot be read.
    pub fn new(ctx: HostContext, name: &str) -> Result<Self> {
        let descriptor_path = ctx.resolve_descriptor_path(name)?;
        Ok(Self {
            name: name.to_string(),
            descriptor_path,
            ctx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptor path as VMware stores it
    pub fn path(&self) -> Option<&str> {
        self.descriptor_path.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.descriptor_path.is_some()
    }

    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    fn require_path(&self) -> Result<&str> {
        match self.descriptor_path.as_deref() {
            Some(path) => Ok(path),
            None => bail!("VM {} not found", self.name),
        }
    }

    /// Read the descriptor from disk
    pub fn config(&self) -> Result<DescriptorMap> {
        let path = self.require_path()?;
        self.ctx.read_descriptor(path)
    }

    /// Merge `changes` into the descriptor and rewrite the whole file.
    ///
    /// The file is read, merged and written without any locking: callers must
    /// not run two writers against the same VM at once.
    pub fn set_config(&self, changes: &DescriptorMap) -> Result<Vec<String>> {
        let path = self.require_path()?;
        let mut config = self.ctx.read_descriptor(path)?;
        let changed = config.merge(changes);
        self.ctx.write_descriptor(path, &config)?;
        debug!(vm = %self.name, keys = ?changed, "descriptor updated");
        Ok(changed)
    }

    pub fn facts(&self) -> Result<VmFacts> {
        Ok(VmFacts {
            name: self.name.clone(),
            vmx: self.require_path()?.to_string(),
            config: self.config()?,
        })
    }

    /// Run a vmrun command against this VM, returning normalized output
    pub(crate) fn execute(&self, args: &ToolArgs) -> Result<String> {
        let output = self.ctx.invoke_control(args)?;
        Ok(vmrun::normalize_output(&output))
    }

    /// Run `<verb> "<vmx>" [modifier]`
    pub(crate) fn execute_verb(&self, verb: &str, modifier: &str) -> Result<String> {
        let path = self.require_path()?;
        self.execute(&vmrun::vm_command(verb, path, modifier))
    }
}
