use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vmware_wpro::commands::{Adapter, CloneMode, DiskCommand, DiskType, Force, StartMode, SystemRunner};
use vmware_wpro::disk::{apply_disk_request, DiskRequest};
use vmware_wpro::vm::devices::DEFAULT_CDROM_DEVICE_TYPE;
use vmware_wpro::vm::{
    apply_clone, apply_power_target, apply_settings, apply_snapshot_action, cdrom_settings, vdisk_settings,
    CdromMount, PowerTarget, SnapshotAction,
};
use vmware_wpro::{info, Config, HostContext, VirtualDisk, VirtualMachine};

#[derive(Parser)]
#[command(name = "vmware-wpro")]
#[command(version)]
#[command(about = "Inspect and control VMware Workstation Pro virtual machines")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    check: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the VMware installation, config files and running VMs
    Info {
        /// Include the parsed inventory
        #[arg(long)]
        inventory: bool,
        /// Include the parsed preferences
        #[arg(long)]
        preferences: bool,
    },

    /// Show a VM's descriptor
    Vm {
        /// VM name
        name: String,
    },

    /// Bring a VM to a power state
    Power {
        /// VM name
        name: String,
        #[arg(value_enum)]
        state: PowerTarget,
        /// How to start the VM (defaults to the configured mode)
        #[arg(long, value_enum)]
        start_with: Option<StartMode>,
        /// Hard stop/reset instead of a guest shutdown
        #[arg(long)]
        force: bool,
    },

    /// List, create, delete or revert snapshots
    Snapshot {
        /// VM name
        name: String,
        #[arg(long, value_enum, default_value_t = SnapshotAction::List)]
        action: SnapshotAction,
        /// Snapshot name, required unless listing
        #[arg(long, required_if_eq_any = [("action", "create"), ("action", "delete"), ("action", "revert")])]
        snapshot: Option<String>,
    },

    /// Clone a template VM into the default VM directory
    Clone {
        /// Name of the new VM
        name: String,
        /// VM to clone from
        #[arg(long)]
        template: String,
        #[arg(long, value_enum, default_value_t = CloneMode::Full)]
        mode: CloneMode,
        /// Snapshot of the template to clone from
        #[arg(long)]
        snapshot: Option<String>,
    },

    /// Create or maintain a virtual disk
    Vdisk {
        /// Path of the .vmdk file
        vmdk: String,
        /// Create the disk with this size (e.g. 20GB)
        #[arg(long, value_name = "SIZE", conflicts_with = "cmd", required_unless_present = "cmd")]
        create: Option<String>,
        #[arg(long, value_enum, default_value_t = Adapter::Lsilogic, requires = "create")]
        adapter: Adapter,
        /// 0: growable, 1: growable 2GB split, 2: preallocated, 3: preallocated 2GB split
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3), requires = "create")]
        disktype: u8,
        #[arg(long, value_enum)]
        cmd: Option<DiskCommand>,
    },

    /// Attach an ISO image to a VM's CD-ROM device
    CdromMount {
        /// VM name
        name: String,
        /// Path of the ISO image
        #[arg(long)]
        path: String,
        /// Device slot, e.g. sata0:1
        #[arg(long)]
        device_host: String,
        #[arg(long, default_value = DEFAULT_CDROM_DEVICE_TYPE)]
        device_type: String,
        /// Mark the device as not present
        #[arg(long)]
        absent: bool,
        /// Do not connect the device at power on
        #[arg(long)]
        disconnected: bool,
    },

    /// Attach a virtual disk to a VM
    VdiskMount {
        /// VM name
        name: String,
        /// Path of the .vmdk file
        #[arg(long)]
        vmdk: String,
        /// Device slot, e.g. nvme0:1
        #[arg(long)]
        device_host: String,
        /// Mark the device as not present
        #[arg(long)]
        absent: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Serialize)]
struct Changed {
    changed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Commands::Config { write } = cli.command {
        return cmd_config(&config, cli.config.as_deref(), write && !cli.check);
    }

    let ctx = HostContext::detect(Arc::new(SystemRunner), &config);
    let check = cli.check;

    match cli.command {
        Commands::Info { inventory, preferences } => print_json(&info::host_info(&ctx, inventory, preferences)?),
        Commands::Vm { name } => {
            let vm = find_vm(ctx, &name)?;
            print_json(&vm.facts()?)
        }
        Commands::Power {
            name,
            state,
            start_with,
            force,
        } => {
            let vm = find_vm(ctx, &name)?;
            let start_mode = start_with.unwrap_or(config.default_start_mode);
            let change = apply_power_target(&vm, state, start_mode, Force::from_flag(force), check)?;
            print_json(&change)
        }
        Commands::Snapshot { name, action, snapshot } => {
            let vm = find_vm(ctx, &name)?;
            print_json(&apply_snapshot_action(&vm, action, snapshot.as_deref(), check)?)
        }
        Commands::Clone {
            name,
            template,
            mode,
            snapshot,
        } => {
            let template = VirtualMachine::new(ctx, &template)?;
            let outcome = apply_clone(&template, &name, mode, snapshot.as_deref(), check)?;
            print_json(&outcome)?;
            if outcome.failed {
                bail!("Clone of {} failed", name);
            }
            Ok(())
        }
        Commands::Vdisk {
            vmdk,
            create,
            adapter,
            disktype,
            cmd,
        } => {
            let request = match (create, cmd) {
                (Some(size), _) => DiskRequest::Create {
                    size,
                    adapter,
                    disk_type: DiskType::new(disktype)?,
                },
                (None, Some(command)) => DiskRequest::Maintain(command),
                (None, None) => bail!("Either --create or --cmd is required"),
            };
            let disk = VirtualDisk::new(ctx, &vmdk);
            print_json(&apply_disk_request(&disk, &request, check)?)
        }
        Commands::CdromMount {
            name,
            path,
            device_host,
            device_type,
            absent,
            disconnected,
        } => {
            let vm = find_vm(ctx, &name)?;
            let mount = CdromMount {
                device_host,
                path,
                device_type,
                present: !absent,
                start_connected: !disconnected,
            };
            let changed = apply_settings(&vm, &cdrom_settings(&mount), check)?;
            print_json(&Changed { changed })
        }
        Commands::VdiskMount {
            name,
            vmdk,
            device_host,
            absent,
        } => {
            let vm = find_vm(ctx, &name)?;
            let changed = apply_settings(&vm, &vdisk_settings(&device_host, &vmdk, !absent), check)?;
            print_json(&Changed { changed })
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn find_vm(ctx: HostContext, name: &str) -> Result<VirtualMachine> {
    let vm = VirtualMachine::new(ctx, name)?;
    if !vm.exists() {
        bail!("VM {} not found", name);
    }
    Ok(vm)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&std::path::Path>, write: bool) -> Result<()> {
    if write {
        let path = path.map(PathBuf::from).unwrap_or_else(Config::config_file_path);
        config.save(&path)?;
        eprintln!("Configuration written to {:?}", path);
    }
    print_json(&config.redacted())
}
