// SPDX-License-Identifier: MIT

//! Write-back of partition tables and drive-letter mappings.
//!
//! Disks are committed one by one with no rollback: when a disk fails,
//! the disks written before it stay written and the failing disk keeps
//! its dirty flag so the commit can be retried.

use partio::DiskIO;

use crate::disk::DiskStyle;
use crate::errors::*;
use crate::io_ext::DiskIOLbaExt;
use crate::list::PartitionList;

/// Persistent drive-letter registry of the installed system.
pub trait MountedDevices {
    /// Associates `letter` with the partition at byte `offset` on the disk
    /// carrying `signature`.
    fn set_mapping(&mut self, letter: char, signature: u32, offset: u64) -> PartResult;
}

/// Records a single mapping. Letters must be `A`..`Z`.
pub fn set_mounted_device_value<M: MountedDevices + ?Sized>(
    store: &mut M,
    letter: char,
    signature: u32,
    offset: u64,
) -> PartResult {
    if !letter.is_ascii_uppercase() {
        return Err(PartError::InvalidArgument("drive letter must be A-Z"));
    }
    store.set_mapping(letter, signature, offset)
}

impl PartitionList {
    /// Writes the MBR and EBR chain of disk `disk` (list index).
    ///
    /// The EBR chain goes first, then sector 0, then the device is flushed.
    /// A disk without a signature gets one that no other disk uses.
    pub fn write_partitions<IO: DiskIO + ?Sized>(&mut self, io: &mut IO, disk: usize) -> PartResult {
        let style = self.disks.get(disk).ok_or(PartError::NotFound)?.style;
        if style == DiskStyle::Gpt {
            return Err(PartError::Unsupported);
        }
        if self.disks[disk].signature == 0 {
            let signature = self.unique_signature(disk);
            self.disks[disk].signature = signature;
        }

        let d = &self.disks[disk];
        let mbr = d.build_mbr()?;
        let chain = d.build_ebr_chain()?;
        let (number, bps) = (d.disk_number, d.geometry.bytes_per_sector);

        for (lba, ebr) in &chain {
            io.write_boot_record(number, *lba, bps, ebr)?;
        }
        io.write_boot_record(number, 0, bps, &mbr)?;
        io.flush(number)?;

        self.disks[disk].mark_committed();
        log_info!(
            "disk {number}: partition table written ({} EBR(s))",
            chain.len()
        );
        Ok(())
    }

    /// Writes every dirty disk in list order and stops at the first failure.
    pub fn write_partitions_to_disk<IO: DiskIO + ?Sized>(&mut self, io: &mut IO) -> PartResult {
        for disk in 0..self.disks.len() {
            if !self.disks[disk].dirty {
                continue;
            }
            if let Err(e) = self.write_partitions(io, disk) {
                log_warn!("disk {}: write failed: {e}", self.disks[disk].disk_number);
                return Err(e);
            }
        }
        Ok(())
    }

    /// One mapping per lettered partition: disk signature and the byte
    /// offset of the partition.
    pub fn set_mounted_device_values<M: MountedDevices + ?Sized>(&self, store: &mut M) -> PartResult {
        for disk in self.disks.iter().filter(|d| d.style != DiskStyle::Gpt) {
            let bps = disk.geometry.bytes_per_sector as u64;
            for e in disk.partitions() {
                let Some(letter) = e.drive_letter else {
                    continue;
                };
                let offset = e
                    .start_sector
                    .checked_mul(bps)
                    .ok_or(PartError::GeometryMismatch("partition offset overflow"))?;
                set_mounted_device_value(store, letter, disk.signature, offset)?;
                log_verbose!("{letter}: -> {:08X} @ {offset}", disk.signature);
            }
        }
        Ok(())
    }

    /// Non-zero signature not used by any other disk, derived from the
    /// disk number and size.
    fn unique_signature(&self, disk: usize) -> u32 {
        let d = &self.disks[disk];
        let mut attempt = 0u32;
        loop {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&d.disk_number.to_le_bytes());
            hasher.update(&d.sector_count.to_le_bytes());
            hasher.update(&attempt.to_le_bytes());
            let signature = hasher.finalize();
            let taken = self
                .disks
                .iter()
                .any(|other| other.index != disk && other.signature == signature);
            if signature != 0 && !taken {
                return signature;
            }
            attempt = attempt.wrapping_add(1);
        }
    }
}
