//! Child process execution
//!
//! Every external tool (vmrun, vmware-vdiskmanager, reg.exe, cmd.exe, whereis)
//! goes through a [`CommandRunner`] so the orchestration code can be driven by a
//! scripted runner in tests.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Captured output of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            stderr: String::new(),
        }
    }
}

/// Runs a program to completion and captures its output.
///
/// Exit status is deliberately not part of the contract: the VMware tools
/// report failures in their text output, so callers classify the text.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands as real child processes, blocking until they exit
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render a program and its arguments the way a shell would show them
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut line = format!("\"{}\"", program);
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(test)]
pub(crate) use scripted::ScriptedRunner;

#[cfg(test)]
mod scripted {
    use super::*;
    use std::sync::Mutex;

    enum Matcher {
        /// Rendered command line contains the needle
        Contains(String),
        /// Program path ends with the needle and the arguments are exactly these
        Exact(String, String),
    }

    impl Matcher {
        fn matches(&self, program: &str, args: &[String], line: &str) -> bool {
            match self {
                Self::Contains(needle) => line.contains(needle.as_str()),
                Self::Exact(exe, expected) => program.ends_with(exe.as_str()) && args.join(" ") == *expected,
            }
        }
    }

    /// Test double answering commands by matching the command line.
    ///
    /// Rules are checked in insertion order; unmatched commands produce empty
    /// output, the same as a tool that printed nothing.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        rules: Vec<(Matcher, Result<CommandOutput, String>)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn on(mut self, needle: &str, output: CommandOutput) -> Self {
            self.rules.push((Matcher::Contains(needle.to_string()), Ok(output)));
            self
        }

        /// Answer `exe` run with exactly `args` (space-joined)
        pub(crate) fn on_exact(mut self, exe: &str, args: &str, stdout: &str) -> Self {
            self.rules.push((
                Matcher::Exact(exe.to_string(), args.to_string()),
                Ok(CommandOutput::stdout(stdout)),
            ));
            self
        }

        pub(crate) fn on_stdout(self, needle: &str, stdout: &str) -> Self {
            self.on(needle, CommandOutput::stdout(stdout))
        }

        pub(crate) fn failing(mut self, needle: &str, message: &str) -> Self {
            self.rules.push((Matcher::Contains(needle.to_string()), Err(message.to_string())));
            self
        }

        /// Every command line run so far, in order
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub(crate) fn calls_matching(&self, needle: &str) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| c.contains(needle))
                .collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            let line = render_command_line(program, args);
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(line.clone());
            }

            for (matcher, response) in &self.rules {
                if matcher.matches(program, args, &line) {
                    return match response {
                        Ok(output) => Ok(output.clone()),
                        Err(message) => Err(anyhow::anyhow!("{}", message)),
                    };
                }
            }
            Ok(CommandOutput::default())
        }
    }
}
