// SPDX-License-Identifier: MIT

//! Human-readable views of the partition list.

use colored::Colorize;

use partlist::disk::PrettyBytes;
use partlist::prelude::*;

pub fn print_list(list: &PartitionList, layout: bool) {
    for disk in list.disks() {
        print!("{disk}");
        if let Some(n) = disk.bios_disk_number {
            println!("  firmware disk 0x{n:02X}, signature {:08X}", disk.signature);
        } else {
            println!("  {} signature {:08X}", "not reported by the firmware,".yellow(), disk.signature);
        }
        if layout {
            print_layout(disk);
        }
        println!();
    }
    print_markers(list);
}

fn print_layout(disk: &DiskEntry) {
    let bps = disk.geometry.bytes_per_sector;
    for segment in disk.layout() {
        let kind = match segment.kind {
            LayoutKind::Reserved => "reserved".dimmed(),
            LayoutKind::Unusable => "unusable".dimmed(),
            LayoutKind::BootRecord => "EBR".yellow(),
            LayoutKind::Free(_) => "free".cyan(),
            LayoutKind::Partition(id) => {
                let ty = disk
                    .entry(id)
                    .map(|e| e.partition_type.to_string())
                    .unwrap_or_default();
                ty.green()
            }
        };
        println!(
            "    {:>10} .. {:>10}  {:>11}  {kind}",
            segment.start,
            segment.end(),
            PrettyBytes(segment.count * bps as u64).to_string(),
        );
    }
}

fn print_markers(list: &PartitionList) {
    let describe = |h: PartHandle| {
        list.entry(h)
            .map(|e| {
                let disk = list.disk(h.disk).map(|d| d.disk_number).unwrap_or_default();
                format!(
                    "disk {disk} partition {} ({})",
                    e.on_disk_partition_number, e.partition_type
                )
            })
            .unwrap_or_else(|| "?".into())
    };
    if let Some(h) = list.system_partition() {
        println!("System partition: {}", describe(h).bold());
    }
    if let Some(h) = list.original_system_partition() {
        println!("Replaced system partition: {}", describe(h));
    }
}

/// One line per partition with its format and check state.
pub fn print_volumes(list: &PartitionList) {
    for disk in list.disks() {
        for e in disk.partitions() {
            let state = match e.format_state {
                FormatState::Formatted | FormatState::Preformatted => {
                    format!("{:?}", e.format_state).green()
                }
                FormatState::UnknownFormat => format!("{:?}", e.format_state).yellow(),
                _ => format!("{:?}", e.format_state).red(),
            };
            println!(
                "  disk {} #{:<2} {:<3} {:<8} {:<12} {state}{}",
                disk.disk_number,
                e.on_disk_partition_number,
                e.drive_letter.map(|c| format!("{c}:")).unwrap_or_default(),
                e.file_system,
                e.volume_label,
                if e.needs_check { " (check pending)" } else { "" },
            );
        }
    }
}
