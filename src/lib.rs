//! Inspect and control VMware Workstation Pro virtual machines by driving
//! `vmrun` and `vmware-vdiskmanager`, from Windows or from WSL.

pub mod commands;
pub mod config;
pub mod disk;
pub mod host;
pub mod info;
pub mod vm;

pub use config::Config;
pub use disk::VirtualDisk;
pub use host::HostContext;
pub use vm::VirtualMachine;
