pub mod args;
pub mod report;
pub mod runner;
pub mod vdiskmanager;
pub mod vmrun;

pub use args::ToolArgs;
pub use report::{ToolReport, Verdict};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use vdiskmanager::{Adapter, DiskCommand, DiskType};
pub use vmrun::{CloneMode, Force, StartMode};
