//! Host environment detection and path translation
//!
//! VMware Workstation Pro runs on Windows, while automation may run inside WSL.
//! Paths stored by VMware (inventory, preferences, descriptors) are Windows
//! paths; files are opened through their WSL translation.

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::install::{self, ConfigFiles, InstallInfo};
use crate::commands::CommandRunner;

/// Output of `whereis powershell.exe` when running under WSL
const WSL_POWERSHELL: &str =
    "powershell.exe: /mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe";

/// Default mount point of Windows drives inside WSL
pub const WSL_MOUNT_ROOT: &str = "/mnt";

/// Check whether this process runs under WSL.
///
/// Any output other than the expected `whereis` answer, or a failure to run
/// `whereis` at all, means no compatibility layer.
pub fn detect_compat_layer(runner: &dyn CommandRunner) -> bool {
    match runner.run("whereis", &["powershell.exe".to_string()]) {
        Ok(output) => {
            let found = output.stdout.trim() == WSL_POWERSHELL;
            debug!(found, "compatibility layer check");
            found
        }
        Err(e) => {
            debug!(error = %e, "compatibility layer check failed");
            false
        }
    }
}

/// Convert a Windows path to its WSL path (`C:\VMs\a.vmx` -> `/mnt/c/vms/a.vmx`)
pub fn to_compat_path(path: &str) -> String {
    to_compat_path_under(path, WSL_MOUNT_ROOT)
}

/// Convert a WSL path back to a Windows path (`/mnt/c/vms/a.vmx` -> `c:\vms\a.vmx`).
/// Paths outside the drive mounts are returned unchanged.
pub fn to_host_path(path: &str) -> String {
    to_host_path_under(path, WSL_MOUNT_ROOT)
}

fn to_compat_path_under(path: &str, mount_root: &str) -> String {
    let lowered = path.to_lowercase().replace('\\', "/");
    let bytes = lowered.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        format!(
            "{}/{}{}",
            mount_root.trim_end_matches('/'),
            &lowered[..1],
            &lowered[2..]
        )
    } else {
        lowered
    }
}

fn to_host_path_under(path: &str, mount_root: &str) -> String {
    let prefix = format!("{}/", mount_root.trim_end_matches('/'));
    let Some(rest) = path.strip_prefix(&prefix) else {
        return path.to_string();
    };

    let mut chars = rest.chars();
    let drive = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c,
        _ => return path.to_string(),
    };
    let tail = chars.as_str();
    if !(tail.is_empty() || tail.starts_with('/')) {
        return path.to_string();
    }

    let tail = if tail.is_empty() { "/" } else { tail };
    format!("{}:{}", drive, tail.replace('/', "\\"))
}

/// Where VMware lives and how its paths map onto the local filesystem.
///
/// [`WslHost`] is the supported platform. [`NativeHost`] marks the place where
/// running directly on the VMware host would be implemented.
pub trait HostPlatform: fmt::Debug + Send + Sync {
    fn is_compat_layer(&self) -> bool;

    /// Separator VMware uses in the paths it stores
    fn separator(&self) -> char;

    /// Turn a path as VMware stores it into one this process can open
    fn to_local_path(&self, host_path: &str) -> PathBuf;

    /// Turn a locally supplied path into the form VMware expects
    fn to_host_path(&self, local_path: &str) -> String;

    /// Install directory and product metadata
    fn locate_install(&self, runner: &dyn CommandRunner) -> InstallInfo;

    /// Location of `preferences.ini` and `inventory.vmls`
    fn config_files(&self, runner: &dyn CommandRunner) -> Option<ConfigFiles>;
}

/// VMware on Windows, driven from inside WSL
#[derive(Debug, Clone)]
pub struct WslHost {
    mount_root: String,
}

impl Default for WslHost {
    fn default() -> Self {
        Self::with_mount_root(WSL_MOUNT_ROOT)
    }
}

impl WslHost {
    /// Use a different directory as the parent of the drive mounts
    pub fn with_mount_root(mount_root: impl Into<String>) -> Self {
        Self {
            mount_root: mount_root.into(),
        }
    }
}

impl HostPlatform for WslHost {
    fn is_compat_layer(&self) -> bool {
        true
    }

    fn separator(&self) -> char {
        '\\'
    }

    fn to_local_path(&self, host_path: &str) -> PathBuf {
        PathBuf::from(to_compat_path_under(host_path, &self.mount_root))
    }

    fn to_host_path(&self, local_path: &str) -> String {
        to_host_path_under(local_path, &self.mount_root)
    }

    fn locate_install(&self, runner: &dyn CommandRunner) -> InstallInfo {
        install::query_registry(runner)
    }

    fn config_files(&self, runner: &dyn CommandRunner) -> Option<ConfigFiles> {
        install::locate_config_files(runner)
    }
}

/// VMware on the machine this process runs on.
///
/// Discovery is not implemented: the install map is empty and no config files
/// are known, so VMs never resolve and tool invocations fail for lack of an
/// install path unless one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHost;

impl HostPlatform for NativeHost {
    fn is_compat_layer(&self) -> bool {
        false
    }

    fn separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }

    fn to_local_path(&self, host_path: &str) -> PathBuf {
        PathBuf::from(host_path)
    }

    fn to_host_path(&self, local_path: &str) -> String {
        local_path.to_string()
    }

    fn locate_install(&self, _runner: &dyn CommandRunner) -> InstallInfo {
        warn!("VMware install discovery is only supported under WSL");
        InstallInfo::default()
    }

    fn config_files(&self, _runner: &dyn CommandRunner) -> Option<ConfigFiles> {
        None
    }
}
