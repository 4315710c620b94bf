use anyhow::Result;
use serde::Serialize;

use crate::host::{ConfigFiles, HostContext, InstallInfo};
use crate::vm::{DescriptorMap, RunningSet};

/// Everything discovered about the VMware host
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub wsl: bool,
    pub registry: InstallInfo,
    pub configfiles: Option<ConfigFiles>,
    pub runningvms: RunningSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<DescriptorMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<DescriptorMap>,
}

/// Collect host information; the global config files are only read when asked for
pub fn host_info(ctx: &HostContext, with_inventory: bool, with_preferences: bool) -> Result<HostInfo> {
    let inventory = if with_inventory {
        Some(ctx.inventory()?.entries().clone())
    } else {
        None
    };
    let preferences = if with_preferences {
        Some(ctx.preferences()?)
    } else {
        None
    };

    Ok(HostInfo {
        wsl: ctx.is_compat_layer(),
        registry: ctx.install().clone(),
        configfiles: ctx.config_files().cloned(),
        runningvms: ctx.running().clone(),
        inventory,
        preferences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::runner::ScriptedRunner;
    use crate::host::testing::*;
    use std::sync::Arc;

    #[test]
    fn test_host_info_json() {
        let host = ScratchHost::new();
        host.write_inventory(".encoding = \"UTF-8\"\nvmlist1.config = \"C:\\VMs\\a\\a.vmx\"\n");
        let ctx = host.context(Arc::new(host.runner(ScriptedRunner::new(), &[r"C:\VMs\a\a.vmx"])));

        let info = host_info(&ctx, true, false).unwrap();
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["wsl"], true);
        assert_eq!(json["registry"]["InstallPath"], INSTALL_DIR);
        assert_eq!(
            json["configfiles"]["inventory"],
            format!(r"{}\VMware\inventory.vmls", APPDATA)
        );
        assert_eq!(json["runningvms"][r"C:\VMs\a\a.vmx"], r"C:\VMs\a\a.vmx");
        assert_eq!(json["inventory"]["vmlist1.config"], r"C:\VMs\a\a.vmx");
        assert!(json.get("preferences").is_none());
    }
}
