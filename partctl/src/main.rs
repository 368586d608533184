// SPDX-License-Identifier: MIT

mod config;
mod machine;
mod mounted;
mod probe;
mod report;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use partlist::prelude::*;

use crate::config::{MachineConfig, parse_size_bytes};
use crate::machine::Machine;
use crate::mounted::MountedDevicesFile;
use crate::probe::BootSectorProbe;
use crate::utils::LogLevel;

#[derive(Parser)]
#[command(name = "partctl", version, about = "MBR partition list tool", long_about = None)]
struct Cli {
    /// Machine description
    #[arg(short, long, default_value = "machine.toml", global = true)]
    config: PathBuf,

    /// Commit modified partition tables to the images
    #[arg(long, global = true)]
    write: bool,

    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every disk and its partitions
    List {
        /// Also show the sector layout of each disk
        #[arg(long)]
        layout: bool,
    },
    /// Create a primary partition in a free region
    CreatePrimary {
        #[command(flatten)]
        target: Target,
    },
    /// Create the extended partition in a free region
    CreateExtended {
        #[command(flatten)]
        target: Target,
    },
    /// Create a logical partition inside the extended partition
    CreateLogical {
        #[command(flatten)]
        target: Target,
    },
    /// Delete a partition
    Delete {
        #[arg(short, long)]
        disk: u32,
        /// On-disk partition number
        #[arg(short, long)]
        partition: u32,
    },
    /// Change the type byte of a partition
    SetType {
        #[arg(short, long)]
        disk: u32,
        #[arg(short, long)]
        partition: u32,
        /// Type code, decimal or 0x-prefixed hex
        #[arg(short = 't', long = "type", value_parser = parse_type)]
        ty: u8,
    },
    /// Pick the system partition and make it active
    CheckSystem,
    /// Read the file system of every partition from its boot sector
    Probe,
    /// Record drive-letter mappings in a registry file
    MountMap {
        /// Registry file (default: options.mounted_devices of the description)
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct Target {
    /// OS disk number
    #[arg(short, long)]
    disk: u32,
    /// Free region holding this LBA (default: first free region)
    #[arg(long)]
    at: Option<u64>,
    /// Size like 512M or 2G (default: the whole region)
    #[arg(short, long, default_value = "0")]
    size: String,
    /// Mark the partition as created automatically
    #[arg(long)]
    auto: bool,
}

fn parse_type(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid partition type '{s}': {e}"))
}

#[derive(Clone, Copy)]
enum Kind {
    Primary,
    Extended,
    Logical,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::set_log_level(if cli.verbose {
        LogLevel::Verbose
    } else if cli.quiet {
        LogLevel::Quiet
    } else {
        LogLevel::Normal
    });

    let config = MachineConfig::from_file(&cli.config)?;
    let mut machine = Machine::open(config, cli.write)?;
    crate::log_verbose!(
        "{} disk(s) listed from {}",
        machine.list.disks().len(),
        machine.config.base_dir.display()
    );

    match cli.command {
        Commands::List { layout } => {
            report::print_list(&machine.list, layout);
            return Ok(());
        }
        Commands::CreatePrimary { target } => create(&mut machine, &target, Kind::Primary)?,
        Commands::CreateExtended { target } => create(&mut machine, &target, Kind::Extended)?,
        Commands::CreateLogical { target } => create(&mut machine, &target, Kind::Logical)?,
        Commands::Delete { disk, partition } => {
            let handle = partition_handle(&machine, disk, partition)?;
            machine.list.delete_partition(handle)?;
            crate::log_info!("Deleted partition {partition} of disk {disk}");
        }
        Commands::SetType { disk, partition, ty } => {
            let handle = partition_handle(&machine, disk, partition)?;
            machine.list.set_partition_type(handle, PartitionType::from(ty))?;
            crate::log_info!("Partition {partition} of disk {disk} is now {}", PartitionType::from(ty));
        }
        Commands::CheckSystem => {
            if machine.list.check_active_system_partition()?.is_none() {
                crate::log_info!("No usable system partition.");
            }
        }
        Commands::Probe => {
            let Machine { io, list, .. } = &mut machine;
            list.refresh_volume_info(&mut BootSectorProbe::new(io));
            report::print_volumes(list);
            return Ok(());
        }
        Commands::MountMap { store } => {
            if cli.write {
                machine.commit()?;
            }
            let store = store.unwrap_or_else(|| machine.config.mounted_devices_path());
            let mut registry = MountedDevicesFile::load(&store)?;
            machine.list.set_mounted_device_values(&mut registry)?;
            registry.save(&store)?;
            crate::log_info!(
                "{} mapping(s) saved to {}",
                registry.mappings.len(),
                store.display()
            );
            return Ok(());
        }
    }

    report::print_list(&machine.list, false);
    if cli.write {
        machine.commit()?;
    } else {
        crate::log_info!("Dry run: nothing written (pass --write to commit).");
    }
    Ok(())
}

fn create(machine: &mut Machine, target: &Target, kind: Kind) -> anyhow::Result<()> {
    let disk = machine.disk_index(target.disk)?;
    let region = machine.free_region(disk, matches!(kind, Kind::Logical), target.at)?;
    let sectors = machine.sectors(disk, parse_size_bytes(&target.size)?);

    let list = &mut machine.list;
    let handle = match kind {
        Kind::Primary => list.create_primary_partition(region, sectors, target.auto),
        Kind::Extended => list.create_extended_partition(region, sectors),
        Kind::Logical => list.create_logical_partition(region, sectors, target.auto),
    }
    .map_err(|e| match e.creation() {
        Some(reason) => anyhow::anyhow!("cannot create partition: {reason}"),
        None => e.into(),
    })?;

    if let Some(e) = list.entry(handle) {
        crate::log_info!(
            "Created {} at LBA {} ({} sectors)",
            e.partition_type,
            e.start_sector,
            e.sector_count
        );
    }
    Ok(())
}

fn partition_handle(machine: &Machine, disk: u32, partition: u32) -> anyhow::Result<PartHandle> {
    machine
        .list
        .partition(disk, partition)
        .ok_or_else(|| anyhow::anyhow!("disk {disk} has no partition {partition}"))
}
