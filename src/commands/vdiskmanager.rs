//! vmware-vdiskmanager operations
//!
//! Provides argument builders for disk creation and maintenance and the disk
//! invocation, which surfaces stderr in preference to stdout.

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::args::ToolArgs;
use super::runner::{render_command_line, CommandRunner};

/// File name of the disk tool inside the install directory
pub const VDISKMANAGER_EXE: &str = "vmware-vdiskmanager.exe";

pub const CREATE_SUCCESS: &str = "Virtual disk creation successful";
pub const SHRINK_SUCCESS: &str = "Shrink completed successfully.";
pub const DEFRAGMENT_SUCCESS: &str = "Defragmentation completed successfully.";

/// Virtual disk adapter type (`-a`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    Ide,
    Buslogic,
    #[default]
    Lsilogic,
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ide => "ide",
            Self::Buslogic => "buslogic",
            Self::Lsilogic => "lsilogic",
        })
    }
}

/// Virtual disk type (`-t`)
///
/// 0: single growable file, 1: growable split in 2GB files,
/// 2: preallocated single file, 3: preallocated split in 2GB files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskType(u8);

impl DiskType {
    pub const MAX: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            bail!("Invalid disk type {} (expected 0-{})", value, Self::MAX);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Maintenance commands on an existing disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiskCommand {
    Shrink,
    Defragment,
}

impl DiskCommand {
    fn flag(&self) -> &'static str {
        match self {
            Self::Shrink => "-k",
            Self::Defragment => "-d",
        }
    }

    /// Phrase the tool prints when the command succeeded
    pub fn success_phrase(&self) -> &'static str {
        match self {
            Self::Shrink => SHRINK_SUCCESS,
            Self::Defragment => DEFRAGMENT_SUCCESS,
        }
    }
}

/// Run vmware-vdiskmanager, returning stderr if it wrote anything, else stdout.
///
/// The tool reports operation failures on stderr even when its exit code
/// looks successful, so the error stream wins when present.
pub fn invoke(runner: &dyn CommandRunner, program: &str, args: &ToolArgs) -> Result<String> {
    let argv = args.to_argv();
    debug!(command = %render_command_line(program, &argv), "invoking vmware-vdiskmanager");
    let output = runner.run(program, &argv)?;
    if !output.stderr.is_empty() {
        return Ok(output.stderr);
    }
    Ok(output.stdout)
}

/// `-c -a <adapter> -s <size> -t <type> "<path>"`
pub fn create(path: &str, size: &str, adapter: Adapter, disk_type: DiskType) -> ToolArgs {
    ToolArgs::new()
        .arg("-c")
        .arg("-a")
        .arg(adapter.to_string())
        .arg("-s")
        .arg(size)
        .arg("-t")
        .arg(disk_type.value().to_string())
        .quoted(path)
}

/// `-k "<path>"` or `-d "<path>"`
pub fn maintain(path: &str, command: DiskCommand) -> ToolArgs {
    ToolArgs::new().arg(command.flag()).quoted(path)
}
