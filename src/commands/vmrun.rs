//! vmrun operations
//!
//! Argument builders for every vmrun subcommand used by the crate, plus the
//! control invocation itself.

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::args::ToolArgs;
use super::runner::{render_command_line, CommandRunner};

/// File name of the control tool inside the install directory
pub const VMRUN_EXE: &str = "vmrun.exe";
/// Header line of `vmrun list`
pub const RUNNING_HEADER: &str = "Total running VMs";
/// Guest listing output when the VM is paused
pub const PAUSED_PHRASE: &str = "virtual machine is paused";

/// How `start` presents the VM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    Gui,
    #[default]
    Nogui,
}

impl StartMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gui => "gui",
            Self::Nogui => "nogui",
        }
    }
}

/// Modifier for stop/reset/suspend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Force {
    #[default]
    Soft,
    Hard,
}

impl Force {
    pub fn from_flag(hard: bool) -> Self {
        if hard {
            Self::Hard
        } else {
            Self::Soft
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloneMode {
    #[default]
    Full,
    Linked,
}

impl fmt::Display for CloneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Linked => "linked",
        })
    }
}

/// Run vmrun and return its standard output untouched
pub fn invoke(runner: &dyn CommandRunner, program: &str, args: &ToolArgs) -> Result<String> {
    let argv = args.to_argv();
    debug!(command = %render_command_line(program, &argv), "invoking vmrun");
    let output = runner.run(program, &argv)?;
    if !output.stderr.is_empty() {
        debug!(stderr = %output.stderr.trim_end(), "vmrun wrote to stderr");
    }
    Ok(output.stdout)
}

/// Drop carriage returns and trailing newlines from tool output
pub fn normalize_output(output: &str) -> String {
    output.replace('\r', "").trim_end_matches('\n').to_string()
}

pub fn list() -> ToolArgs {
    ToolArgs::new().arg("list")
}

/// `<verb> "<vmx>" [modifier]` used by power and snapshot-list commands
pub fn vm_command(verb: &str, vmx: &str, modifier: &str) -> ToolArgs {
    ToolArgs::new().arg(verb).quoted(vmx).optional(modifier)
}

/// `<verb> "<vmx>" "<snapshot>"`
pub fn snapshot_command(verb: &str, vmx: &str, snapshot: &str) -> ToolArgs {
    ToolArgs::new().arg(verb).quoted(vmx).quoted(snapshot)
}

/// Guest process listing, used only to detect whether a running VM is paused
pub fn list_guest_processes(user: &str, password: &str, vmx: &str) -> ToolArgs {
    ToolArgs::new()
        .arg("-gu")
        .arg(user)
        .arg("-gp")
        .arg(password)
        .arg("listProcessesInGuest")
        .quoted(vmx)
}

pub fn clone(source: &str, target: &str, name: &str, mode: CloneMode, snapshot: Option<&str>) -> ToolArgs {
    let args = ToolArgs::new()
        .arg("clone")
        .quoted(source)
        .quoted(target)
        .option("cloneName", name)
        .arg(mode.to_string());

    match snapshot {
        Some(snapshot) if !snapshot.is_empty() => args.option("snapshot", snapshot),
        _ => args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::runner::ScriptedRunner;

    #[test]
    fn test_vm_command_with_and_without_modifier() {
        assert_eq!(
            vm_command("stop", r"C:\VMs\a\a.vmx", Force::Hard.as_str()).to_string(),
            r#"stop "C:\VMs\a\a.vmx" hard"#
        );
        assert_eq!(
            vm_command("pause", r"C:\VMs\a\a.vmx", "").to_string(),
            r#"pause "C:\VMs\a\a.vmx""#
        );
    }

    #[test]
    fn test_clone_with_snapshot() {
        let args = clone(r"C:\VMs\base\base.vmx", r"C:\VMs\web\web.vmx", "web", CloneMode::Linked, Some("clean"));
        assert_eq!(
            args.to_string(),
            r#"clone "C:\VMs\base\base.vmx" "C:\VMs\web\web.vmx" -cloneName="web" linked -snapshot="clean""#
        );

        let args = clone("a.vmx", "b.vmx", "b", CloneMode::Full, Some(""));
        assert_eq!(args.to_string(), r#"clone "a.vmx" "b.vmx" -cloneName="b" full"#);
    }

    #[test]
    fn test_guest_listing_args() {
        let args = list_guest_processes("guest", "guest", "x.vmx");
        assert_eq!(args.to_string(), r#"-gu guest -gp guest listProcessesInGuest "x.vmx""#);
    }

    #[test]
    fn test_guest_args_keep_empty_password() {
        let argv = list_guest_processes("guest", "", "x.vmx").to_argv();
        assert_eq!(argv.len(), 6);
        assert_eq!(argv[2], "-gp");
        assert_eq!(argv[3], "");
        assert_eq!(argv[4], "listProcessesInGuest");
    }

    #[test]
    fn test_invoke_returns_raw_stdout() {
        let runner = ScriptedRunner::new().on_stdout("vmrun.exe\" list", "Total running VMs: 0\r\n");
        let out = invoke(&runner, "/mnt/c/vmware/vmrun.exe", &list()).unwrap();
        assert_eq!(out, "Total running VMs: 0\r\n");
        assert_eq!(normalize_output(&out), "Total running VMs: 0");
    }

    #[test]
    fn test_invoke_runs_the_logged_command_line() {
        let runner = ScriptedRunner::new();
        let args = vm_command("stop", r"C:\VMs\a\a.vmx", Force::Hard.as_str());
        invoke(&runner, "/mnt/c/vmware/vmrun.exe", &args).unwrap();
        assert_eq!(
            runner.calls(),
            vec![render_command_line("/mnt/c/vmware/vmrun.exe", &args.to_argv())]
        );
    }

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("a\r\nb\r\n\n"), "a\nb");
        assert_eq!(normalize_output(""), "");
    }
}
