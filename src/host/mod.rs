//! Host context shared by the VM and disk facades
//!
//! A [`HostContext`] captures everything discovered about the VMware host once:
//! the platform (WSL or native), the install directory, the config file
//! locations and the VMs running at construction time. It is immutable;
//! callers that need fresh running state build a new one.

pub mod env;
pub mod install;

use anyhow::{bail, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::commands::{vdiskmanager, vmrun, CommandRunner, ToolArgs};
use crate::config::Config;
use crate::vm::descriptor::{self, DescriptorMap};
use crate::vm::inventory::{self, InventoryIndex};
use crate::vm::running::RunningSet;

pub use env::{detect_compat_layer, to_compat_path, to_host_path, HostPlatform, NativeHost, WslHost};
pub use install::{ConfigFiles, InstallInfo};

/// Preferences key naming the directory new VMs are created in
pub const DEFAULT_VM_PATH_KEY: &str = "prefvmx.defaultVMPath";

pub struct HostContext {
    platform: Box<dyn HostPlatform>,
    runner: Arc<dyn CommandRunner>,
    install: InstallInfo,
    config_files: Option<ConfigFiles>,
    running: RunningSet,
    guest_user: String,
    guest_password: String,
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("platform", &self.platform)
            .field("install", &self.install)
            .field("config_files", &self.config_files)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl HostContext {
    /// Detect the platform and discover the VMware host
    pub fn detect(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        let platform: Box<dyn HostPlatform> = if detect_compat_layer(runner.as_ref()) {
            Box::new(WslHost::default())
        } else {
            Box::new(NativeHost)
        };
        Self::with_platform(runner, platform, config)
    }

    /// Discover the VMware host on a known platform
    pub fn with_platform(runner: Arc<dyn CommandRunner>, platform: Box<dyn HostPlatform>, config: &Config) -> Self {
        let mut install = platform.locate_install(runner.as_ref());
        if let Some(path) = &config.install_path {
            install.set_install_path(path.clone());
        }
        let config_files = platform.config_files(runner.as_ref());

        let mut ctx = Self {
            platform,
            runner,
            install,
            config_files,
            running: RunningSet::default(),
            guest_user: config.guest_user.clone(),
            guest_password: config.guest_password.clone(),
        };
        ctx.running = ctx.load_running_set();
        ctx
    }

    fn load_running_set(&self) -> RunningSet {
        if self.install.install_path().is_none() {
            debug!("no install path, skipping running VM list");
            return RunningSet::default();
        }
        match self.invoke_control(&vmrun::list()) {
            Ok(output) => RunningSet::parse(&output),
            Err(e) => {
                warn!(error = %e, "could not list running VMs");
                RunningSet::default()
            }
        }
    }

    pub fn is_compat_layer(&self) -> bool {
        self.platform.is_compat_layer()
    }

    pub fn platform(&self) -> &dyn HostPlatform {
        self.platform.as_ref()
    }

    pub fn install(&self) -> &InstallInfo {
        &self.install
    }

    pub fn config_files(&self) -> Option<&ConfigFiles> {
        self.config_files.as_ref()
    }

    pub fn running(&self) -> &RunningSet {
        &self.running
    }

    /// Credentials for guest operations
    pub fn guest_credentials(&self) -> (&str, &str) {
        (&self.guest_user, &self.guest_password)
    }

    /// Local path of a tool inside the install directory
    fn tool_program(&self, exe: &str) -> Result<String> {
        let Some(install_path) = self.install.install_path() else {
            bail!("VMware install path is unknown; cannot run {}", exe);
        };
        let mut program = self.platform.to_local_path(install_path).to_string_lossy().into_owned();
        if !program.ends_with('/') && !program.ends_with('\\') {
            program.push(std::path::MAIN_SEPARATOR);
        }
        program.push_str(exe);
        Ok(program)
    }

    /// Run vmrun, returning its raw standard output
    pub fn invoke_control(&self, args: &ToolArgs) -> Result<String> {
        let program = self.tool_program(vmrun::VMRUN_EXE)?;
        vmrun::invoke(self.runner.as_ref(), &program, args)
    }

    /// Run vmware-vdiskmanager, returning stderr if non-empty, else stdout
    pub fn invoke_disk(&self, args: &ToolArgs) -> Result<String> {
        let program = self.tool_program(vdiskmanager::VDISKMANAGER_EXE)?;
        vdiskmanager::invoke(self.runner.as_ref(), &program, args)
    }

    /// Local path for a path as VMware stores it
    pub fn local_path(&self, host_path: &str) -> PathBuf {
        self.platform.to_local_path(host_path)
    }

    pub fn host_file_exists(&self, host_path: &str) -> bool {
        self.local_path(host_path).is_file()
    }

    pub fn read_descriptor(&self, host_path: &str) -> Result<DescriptorMap> {
        descriptor::read_file(&self.local_path(host_path))
    }

    pub fn write_descriptor(&self, host_path: &str, map: &DescriptorMap) -> Result<()> {
        descriptor::write_file(&self.local_path(host_path), map)
    }

    /// Read one of VMware's global config files; a missing file reads as empty
    fn read_global(&self, host_path: &str) -> Result<DescriptorMap> {
        let local = self.local_path(host_path);
        match std::fs::metadata(&local) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %local.display(), "config file not found");
                Ok(DescriptorMap::new())
            }
            _ => descriptor::read_file(&local),
        }
    }

    pub fn inventory(&self) -> Result<InventoryIndex> {
        match &self.config_files {
            Some(files) => Ok(InventoryIndex::new(self.read_global(&files.inventory)?)),
            None => Ok(InventoryIndex::default()),
        }
    }

    pub fn preferences(&self) -> Result<DescriptorMap> {
        match &self.config_files {
            Some(files) => self.read_global(&files.preferences),
            None => Ok(DescriptorMap::new()),
        }
    }

    /// `{defaultVMPath}/{name}/{name}.vmx` in host form, if a default VM
    /// directory is configured
    pub fn conventional_path(&self, name: &str) -> Result<Option<String>> {
        let preferences = self.preferences()?;
        let Some(default_dir) = preferences.get(DEFAULT_VM_PATH_KEY) else {
            return Ok(None);
        };

        let path = format!("{}/{}/{}.vmx", default_dir, name, name);
        if self.is_compat_layer() {
            return Ok(Some(path.replace('/', "\\")));
        }
        Ok(Some(path))
    }

    /// Find the descriptor of a VM by name
    pub fn resolve_descriptor_path(&self, name: &str) -> Result<Option<String>> {
        inventory::resolve_descriptor_path(self, name)
    }
}
