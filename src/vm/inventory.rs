//! VM name resolution
//!
//! `inventory.vmls` has no fixed schema: VMs appear as values under keys like
//! `vmlist3.config` next to folder and tab entries. A VM name is looked up by
//! scanning every value for `\<name>.vmx`, falling back to the directory
//! layout VMware uses for new VMs.

use anyhow::Result;
use tracing::debug;

use super::descriptor::DescriptorMap;
use crate::host::HostContext;

/// Parsed `inventory.vmls`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryIndex {
    entries: DescriptorMap,
}

impl InventoryIndex {
    pub fn new(entries: DescriptorMap) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &DescriptorMap {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First value, in file order, containing `<separator><name>.vmx`
    /// (case-insensitive).
    ///
    /// This is a containment test, so a value such as `x\web.vmx.bak` also
    /// matches `web`.
    pub fn find_vmx(&self, name: &str, separator: char) -> Option<&str> {
        let needle = format!("{}{}.vmx", separator, name).to_lowercase();
        self.entries
            .values()
            .find(|value| value.to_lowercase().contains(&needle))
    }
}

/// Resolve a VM name to its descriptor path: inventory first, then the
/// `{defaultVMPath}\{name}\{name}.vmx` convention if that file exists.
pub fn resolve_descriptor_path(ctx: &HostContext, name: &str) -> Result<Option<String>> {
    let inventory = ctx.inventory()?;
    if let Some(path) = inventory.find_vmx(name, ctx.platform().separator()) {
        debug!(name, path, "resolved from inventory");
        return Ok(Some(path.to_string()));
    }

    if let Some(path) = ctx.conventional_path(name)? {
        if ctx.host_file_exists(&path) {
            debug!(name, path = %path, "resolved from default VM directory");
            return Ok(Some(path));
        }
    }

    debug!(name, "VM not found");
    Ok(None)
}
