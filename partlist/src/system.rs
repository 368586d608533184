// SPDX-License-Identifier: MIT

//! Selection of the partition that will host the boot manager.

use crate::disk::DiskStyle;
use crate::errors::*;
use crate::list::PartitionList;
use crate::partition::{FormatState, PartEntry, PartHandle};

/// Whether the running environment can write boot files to `entry`.
pub fn can_host_boot_files(entry: &PartEntry) -> bool {
    if !entry.is_partitioned {
        return false;
    }
    if !entry.file_system.is_empty() {
        return ["FAT", "FAT12", "FAT16", "FAT32"]
            .iter()
            .any(|fs| entry.file_system.eq_ignore_ascii_case(fs));
    }
    entry.format_state == FormatState::Unformatted || entry.partition_type.is_fat()
}

enum Candidate {
    Partition(PartHandle),
    Free(PartHandle),
}

impl PartitionList {
    /// Disk the firmware boots from: the lowest firmware number among
    /// correlated disks, else the first disk.
    pub fn system_disk(&self) -> Option<usize> {
        self.disks
            .iter()
            .filter_map(|d| d.bios_disk_number.map(|n| (n, d.index)))
            .min()
            .map(|(_, index)| index)
            .or(if self.disks.is_empty() { None } else { Some(0) })
    }

    /// Finds (or creates) the system partition and makes it the only active
    /// primary on the system disk.
    ///
    /// When the natural candidate cannot host boot files it is kept as the
    /// original system partition and the first suitable primary, or one
    /// auto-created in free space, takes its place.
    pub fn check_active_system_partition(&mut self) -> PartResult<Option<PartHandle>> {
        self.system_partition = None;
        self.original_system_partition = None;

        let Some(disk) = self.system_disk() else {
            log_warn!("no disk to hold the system partition");
            return Ok(None);
        };
        if self.disks[disk].style == DiskStyle::Gpt || self.disks[disk].primaries.is_empty() {
            log_info!("disk {}: no usable system partition", self.disks[disk].disk_number);
            return Ok(None);
        }

        let candidate = match self.system_candidate(disk) {
            Some(Candidate::Partition(h)) => h,
            Some(Candidate::Free(h)) => self.create_primary_partition(h, 0, true)?,
            None => return Ok(None),
        };

        let chosen = if self.entry(candidate).is_some_and(can_host_boot_files) {
            candidate
        } else {
            self.original_system_partition = Some(candidate);
            match self.substitute_system_partition(disk, candidate)? {
                Some(h) => h,
                None => {
                    log_warn!("no partition can host the boot files");
                    return Ok(None);
                }
            }
        };

        self.make_active(chosen);
        self.system_partition = Some(chosen);
        Ok(Some(chosen))
    }

    fn system_candidate(&self, disk: usize) -> Option<Candidate> {
        let d = &self.disks[disk];
        let data = || {
            d.primaries
                .iter()
                .filter(move |e| e.is_partitioned && !d.is_container(e))
        };

        if let Some(active) = data().find(|e| e.boot_indicator) {
            return Some(Candidate::Partition(active.handle()));
        }
        if let Some(first) = data().next() {
            return Some(Candidate::Partition(first.handle()));
        }
        self.first_creatable(disk).map(Candidate::Free)
    }

    fn first_creatable(&self, disk: usize) -> Option<PartHandle> {
        self.disks[disk]
            .primaries
            .iter()
            .filter(|e| e.is_free())
            .map(PartEntry::handle)
            .find(|h| self.primary_partition_creation_checks(*h, 0).is_ok())
    }

    fn substitute_system_partition(
        &mut self,
        disk: usize,
        original: PartHandle,
    ) -> PartResult<Option<PartHandle>> {
        let d = &self.disks[disk];
        let existing = d
            .primaries
            .iter()
            .filter(|e| e.id != original.id && !d.is_container(e))
            .find(|e| can_host_boot_files(e))
            .map(PartEntry::handle);
        if existing.is_some() {
            return Ok(existing);
        }
        match self.first_creatable(disk) {
            Some(free) => Ok(Some(self.create_primary_partition(free, 0, true)?)),
            None => Ok(None),
        }
    }

    /// Sets the boot flag on `chosen` and clears it on every other primary
    /// of the disk. Dirty only when a flag actually changed.
    fn make_active(&mut self, chosen: PartHandle) {
        let Some(disk) = self.disks.get_mut(chosen.disk) else {
            return;
        };
        let mut changed = false;
        for e in disk.primaries.iter_mut().filter(|e| e.is_partitioned) {
            let active = e.id == chosen.id;
            if e.boot_indicator != active {
                e.boot_indicator = active;
                changed = true;
            }
        }
        if changed {
            disk.dirty = true;
            log_info!("disk {}: active partition changed", disk.disk_number);
        }
    }
}
