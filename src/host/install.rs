//! VMware install discovery through the Windows registry and `%appdata%`

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::commands::CommandRunner;

/// Registry key written by the VMware Workstation installer
pub const REGISTRY_KEY: &str = r"HKLM\SOFTWARE\WOW6432Node\VMware, Inc.\VMware Workstation";

const INSTALL_PATH_KEY: &str = "InstallPath";

/// Regex to match a `reg.exe query` value line: `    <name>    REG_<TYPE>    <value>`.
/// The value column is taken verbatim, so values containing runs of spaces survive.
static RE_REG_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+(\S.*?)\s+(REG_[A-Z0-9_]+)(?:\s+(.*))?$").expect("Invalid regex: RE_REG_VALUE")
});

/// Values found under the VMware Workstation registry key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallInfo {
    values: BTreeMap<String, String>,
}

impl InstallInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Install directory in Windows form, usually ending in a backslash
    pub fn install_path(&self) -> Option<&str> {
        self.get(INSTALL_PATH_KEY).filter(|p| !p.is_empty())
    }

    pub fn set_install_path(&mut self, path: impl Into<String>) {
        self.values.insert(INSTALL_PATH_KEY.to_string(), path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse the text printed by `reg.exe query <key>`
pub fn parse_registry_output(text: &str) -> InstallInfo {
    let mut values = BTreeMap::new();
    for line in text.lines() {
        if let Some(caps) = RE_REG_VALUE.captures(line.trim_end()) {
            let name = caps[1].to_string();
            let value = caps.get(3).map(|m| m.as_str()).unwrap_or("").to_string();
            values.insert(name, value);
        }
    }
    InstallInfo { values }
}

/// Query the registry for the VMware Workstation key
pub fn query_registry(runner: &dyn CommandRunner) -> InstallInfo {
    let args = ["query".to_string(), REGISTRY_KEY.to_string()];
    match runner.run("reg.exe", &args) {
        Ok(output) => {
            let info = parse_registry_output(&output.stdout);
            if info.install_path().is_none() {
                warn!(key = REGISTRY_KEY, "VMware install path not found in registry");
            }
            info
        }
        Err(e) => {
            warn!(error = %e, "registry query failed");
            InstallInfo::default()
        }
    }
}

/// Paths of VMware's per-user configuration files, in Windows form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFiles {
    /// The `%appdata%\VMware\` directory
    pub appdata: String,
    pub preferences: String,
    pub inventory: String,
}

impl ConfigFiles {
    pub fn in_directory(dir: &str) -> Self {
        let mut appdata = dir.to_string();
        if !appdata.ends_with('\\') {
            appdata.push('\\');
        }
        Self {
            preferences: format!("{}preferences.ini", appdata),
            inventory: format!("{}inventory.vmls", appdata),
            appdata,
        }
    }
}

/// Ask Windows for `%appdata%` and derive the VMware config file locations
pub fn locate_config_files(runner: &dyn CommandRunner) -> Option<ConfigFiles> {
    let args = ["/c".to_string(), "echo".to_string(), "%appdata%".to_string()];
    let output = match runner.run("cmd.exe", &args) {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "could not query %appdata%");
            return None;
        }
    };

    let appdata = output.stdout.trim_end_matches(['\r', '\n']).trim();
    if appdata.is_empty() || appdata.eq_ignore_ascii_case("%appdata%") {
        warn!("%appdata% is not set on the Windows side");
        return None;
    }

    let files = ConfigFiles::in_directory(&format!("{}\\VMware", appdata));
    debug!(inventory = %files.inventory, preferences = %files.preferences, "VMware config files");
    Some(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::runner::ScriptedRunner;

    const REG_OUTPUT: &str = concat!(
        "\r\n",
        "HKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\VMware, Inc.\\VMware Workstation\r\n",
        "    InstallPath    REG_SZ    C:\\Program Files (x86)\\VMware\\VMware Workstation\\\r\n",
        "    ProductVersion    REG_SZ    17.5.1\r\n",
        "    Core    REG_SZ    \r\n",
        "    Product Name    REG_SZ    VMware   Workstation    Pro\r\n",
        "    InstallSize    REG_DWORD    0x1a2b\r\n",
        "\r\n",
        "HKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\VMware, Inc.\\VMware Workstation\\Dnd\r\n",
    );

    #[test]
    fn test_parse_registry_output() {
        let info = parse_registry_output(REG_OUTPUT);
        assert_eq!(
            info.install_path(),
            Some(r"C:\Program Files (x86)\VMware\VMware Workstation\")
        );
        assert_eq!(info.get("ProductVersion"), Some("17.5.1"));
        assert_eq!(info.get("InstallSize"), Some("0x1a2b"));
        assert_eq!(info.get("Core"), Some(""));
    }

    #[test]
    fn test_value_with_wide_spacing_kept_whole() {
        let info = parse_registry_output(REG_OUTPUT);
        assert_eq!(info.get("Product Name"), Some("VMware   Workstation    Pro"));
    }

    #[test]
    fn test_header_lines_ignored() {
        let info = parse_registry_output("HKEY_LOCAL_MACHINE\\SOFTWARE\\X\r\n\r\n");
        assert!(info.is_empty());
    }

    #[test]
    fn test_query_registry_failure_is_empty() {
        let runner = ScriptedRunner::new().failing("reg.exe", "not found");
        assert!(query_registry(&runner).is_empty());
    }

    #[test]
    fn test_locate_config_files() {
        let runner = ScriptedRunner::new().on_stdout("cmd.exe", "C:\\Users\\bob\\AppData\\Roaming\r\n");
        let files = locate_config_files(&runner).unwrap();
        assert_eq!(files.appdata, r"C:\Users\bob\AppData\Roaming\VMware\");
        assert_eq!(files.preferences, r"C:\Users\bob\AppData\Roaming\VMware\preferences.ini");
        assert_eq!(files.inventory, r"C:\Users\bob\AppData\Roaming\VMware\inventory.vmls");
    }

    #[test]
    fn test_locate_config_files_unset() {
        let runner = ScriptedRunner::new().on_stdout("cmd.exe", "%appdata%\r\n");
        assert!(locate_config_files(&runner).is_none());
    }
}
