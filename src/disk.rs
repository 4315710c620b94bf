//! Virtual disk facade over vmware-vdiskmanager

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::commands::vdiskmanager::{self, Adapter, DiskCommand, DiskType, CREATE_SUCCESS};
use crate::commands::ToolReport;
use crate::host::HostContext;

#[derive(Debug)]
pub struct VirtualDisk {
    path: String,
    ctx: HostContext,
}

impl VirtualDisk {
    /// `path` may be given in either namespace; it is kept in host form
    /// because that is what the disk tool expects.
    pub fn new(ctx: HostContext, path: &str) -> Self {
        let path = ctx.platform().to_host_path(path);
        Self { path, ctx }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checked against the filesystem on every call
    pub fn exists(&self) -> bool {
        self.ctx.host_file_exists(&self.path)
    }

    pub fn create(&self, size: &str, adapter: Adapter, disk_type: DiskType) -> Result<ToolReport> {
        let output = self
            .ctx
            .invoke_disk(&vdiskmanager::create(&self.path, size, adapter, disk_type))?;
        Ok(ToolReport::disk(output, CREATE_SUCCESS))
    }

    pub fn shrink(&self) -> Result<ToolReport> {
        self.maintain(DiskCommand::Shrink)
    }

    pub fn defragment(&self) -> Result<ToolReport> {
        self.maintain(DiskCommand::Defragment)
    }

    fn maintain(&self, command: DiskCommand) -> Result<ToolReport> {
        let output = self.ctx.invoke_disk(&vdiskmanager::maintain(&self.path, command))?;
        Ok(ToolReport::disk(output, command.success_phrase()))
    }
}

/// What to do with a disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskRequest {
    Create {
        size: String,
        adapter: Adapter,
        disk_type: DiskType,
    },
    Maintain(DiskCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskOutcome {
    pub exists: bool,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdisk: Option<String>,
}

/// Run `request` against the disk. `exists` is sampled before anything runs;
/// check mode stops there. A `Failed` report is returned as an error.
pub fn apply_disk_request(disk: &VirtualDisk, request: &DiskRequest, check: bool) -> Result<DiskOutcome> {
    let exists = disk.exists();
    if check {
        return Ok(DiskOutcome {
            exists,
            changed: false,
            vdisk: None,
        });
    }

    let report = match request {
        DiskRequest::Create {
            size,
            adapter,
            disk_type,
        } => disk.create(size, *adapter, *disk_type)?,
        DiskRequest::Maintain(command) => disk.maintain(*command)?,
    }
    .into_result()?;
    debug!(path = %disk.path(), verdict = ?report.verdict, "disk operation finished");

    Ok(DiskOutcome {
        exists,
        changed: report.changed(),
        vdisk: Some(report.output),
    })
}
