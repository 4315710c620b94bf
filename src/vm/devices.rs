//! Device attachment through descriptor keys

use anyhow::Result;
use tracing::debug;

use super::descriptor::{vmx_bool, DescriptorMap};
use super::VirtualMachine;

pub const DEFAULT_CDROM_DEVICE_TYPE: &str = "cdrom-image";

/// CD-ROM image attached to a device slot such as `sata0:1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdromMount {
    pub device_host: String,
    pub path: String,
    pub device_type: String,
    pub present: bool,
    pub start_connected: bool,
}

impl CdromMount {
    pub fn new(device_host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            device_host: device_host.into(),
            path: path.into(),
            device_type: DEFAULT_CDROM_DEVICE_TYPE.to_string(),
            present: true,
            start_connected: true,
        }
    }
}

pub fn cdrom_settings(mount: &CdromMount) -> DescriptorMap {
    let dev = &mount.device_host;
    [
        (format!("{}.fileName", dev), mount.path.clone()),
        (format!("{}.deviceType", dev), mount.device_type.clone()),
        (format!("{}.present", dev), vmx_bool(mount.present).to_string()),
        (format!("{}.startConnected", dev), vmx_bool(mount.start_connected).to_string()),
    ]
    .into_iter()
    .collect()
}

pub fn vdisk_settings(device_host: &str, vmdk: &str, present: bool) -> DescriptorMap {
    [
        (format!("{}.fileName", device_host), vmdk.to_string()),
        (format!("{}.present", device_host), vmx_bool(present).to_string()),
    ]
    .into_iter()
    .collect()
}

/// Merge `settings` into the VM descriptor. Returns whether any key was
/// missing or different; the file is only written when it was and `check`
/// is off.
pub fn apply_settings(vm: &VirtualMachine, settings: &DescriptorMap, check: bool) -> Result<bool> {
    let mut config = vm.config()?;
    let changed = config.merge(settings);
    if changed.is_empty() {
        return Ok(false);
    }
    debug!(vm = %vm.name(), keys = ?changed, check, "device settings differ");
    if !check {
        vm.set_config(settings)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::runner::ScriptedRunner;
    use crate::host::testing::*;
    use std::sync::Arc;

    const VMX: &str = "displayName = \"web\"\n\
sata0:1.deviceType = \"cdrom-image\"\n\
sata0:1.fileName = \"C:\\ISO\\old.iso\"\n\
sata0:1.present = \"TRUE\"\n";

    fn web_vm(host: &ScratchHost) -> (VirtualMachine, String) {
        let path = host.create_conventional_vm("web", VMX);
        let ctx = host.context(Arc::new(host.runner(ScriptedRunner::new(), &[])));
        (VirtualMachine::new(ctx, "web").unwrap(), path)
    }

    #[test]
    fn test_cdrom_settings() {
        let mut mount = CdromMount::new("sata0:1", r"C:\ISO\new.iso");
        mount.start_connected = false;
        let settings = cdrom_settings(&mount);
        assert_eq!(settings.len(), 4);
        assert_eq!(settings.get("sata0:1.fileName"), Some(r"C:\ISO\new.iso"));
        assert_eq!(settings.get("sata0:1.deviceType"), Some("cdrom-image"));
        assert_eq!(settings.get("sata0:1.present"), Some("TRUE"));
        assert_eq!(settings.get("sata0:1.startConnected"), Some("FALSE"));
    }

    #[test]
    fn test_vdisk_settings() {
        let settings = vdisk_settings("nvme0:1", r"C:\VMs\web\data.vmdk", false);
        assert_eq!(settings.get("nvme0:1.fileName"), Some(r"C:\VMs\web\data.vmdk"));
        assert_eq!(settings.get("nvme0:1.present"), Some("FALSE"));
    }

    #[test]
    fn test_apply_writes_when_changed() {
        let host = ScratchHost::new();
        let (vm, path) = web_vm(&host);

        let settings = cdrom_settings(&CdromMount::new("sata0:1", r"C:\ISO\new.iso"));
        assert!(apply_settings(&vm, &settings, false).unwrap());

        let config = vm.config().unwrap();
        assert_eq!(config.get("sata0:1.fileName"), Some(r"C:\ISO\new.iso"));
        assert_eq!(config.get("sata0:1.startConnected"), Some("TRUE"));
        assert_eq!(config.get("displayName"), Some("web"));

        // second run is a no-op and leaves the file untouched
        let before = std::fs::read_to_string(host.local(&path)).unwrap();
        assert!(!apply_settings(&vm, &settings, false).unwrap());
        assert_eq!(std::fs::read_to_string(host.local(&path)).unwrap(), before);
    }

    #[test]
    fn test_apply_check_mode_does_not_write() {
        let host = ScratchHost::new();
        let (vm, path) = web_vm(&host);

        let settings = vdisk_settings("sata0:2", r"C:\VMs\web\data.vmdk", true);
        assert!(apply_settings(&vm, &settings, true).unwrap());
        assert_eq!(std::fs::read_to_string(host.local(&path)).unwrap(), VMX);
    }

    #[test]
    fn test_apply_missing_vm() {
        let host = ScratchHost::new();
        let ctx = host.context(Arc::new(host.runner(ScriptedRunner::new(), &[])));
        let vm = VirtualMachine::new(ctx, "ghost").unwrap();
        assert!(apply_settings(&vm, &DescriptorMap::new(), false).is_err());
    }
}
