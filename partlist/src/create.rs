// SPDX-License-Identifier: MIT

//! Creation checks and creation of primary, extended and logical partitions.
//!
//! Creation converts the selected free region (or its leading part) in
//! place: the handle passed in designates the new partition on success.

use crate::disk::{DiskEntry, DiskStyle};
use crate::errors::*;
use crate::geometry::{align_down, align_up};
use crate::list::PartitionList;
use crate::partition::{FormatState, PartEntry, PartHandle};
use crate::types::PartitionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Primary,
    Extended,
    Logical,
}

/// `(start, count)` of the partition `kind` would create in `free`.
/// `requested == 0` takes the whole region.
fn placement(
    disk: &DiskEntry,
    free: &PartEntry,
    kind: Kind,
    requested: u64,
) -> Result<(u64, u64), CreationError> {
    if disk.style == DiskStyle::Gpt {
        return Err(CreationError::GptDisk);
    }
    if free.is_partitioned {
        return Err(CreationError::AlreadyPartitioned);
    }

    match kind {
        Kind::Primary | Kind::Extended => {
            if free.logical {
                return Err(CreationError::InsideExtended);
            }
            if disk.used_slots() >= 4 || disk.is_super_floppy() {
                return Err(CreationError::PartitionTableFull);
            }
            if kind == Kind::Extended && disk.extended_id().is_some() {
                return Err(CreationError::OnlyOneExtended);
            }
        }
        Kind::Logical => {
            let container = disk
                .extended_entry()
                .ok_or(CreationError::NotInsideExtended)?;
            if !free.logical
                || free.start_sector < container.start_sector
                || free.end_sector() > container.end_sector()
            {
                return Err(CreationError::NotInsideExtended);
            }
            let overlaps = disk.logicals().iter().any(|l| {
                l.is_partitioned
                    && l.extent_start() < free.end_sector()
                    && free.start_sector < l.end_sector()
            });
            if overlaps {
                return Err(CreationError::OverlapsLogical);
            }
        }
    }

    // logical partitions leave room for their EBR at the region start
    let start = match kind {
        Kind::Logical => align_up(free.start_sector + 1, disk.cylinder_alignment)
            .map_err(|_| CreationError::InsufficientSpace)?,
        _ => free.start_sector,
    };
    if start >= free.end_sector() {
        return Err(CreationError::InsufficientSpace);
    }
    let available = free.end_sector() - start;
    let requested = if requested == 0 { available } else { requested };
    if requested > available {
        return Err(CreationError::InsufficientSpace);
    }

    let end = align_down(start + requested, disk.sector_alignment)
        .map_err(|_| CreationError::SizeBelowMinimum)?;
    if end <= start {
        return Err(CreationError::SizeBelowMinimum);
    }
    Ok((start, end - start))
}

impl PartitionList {
    fn creation_placement(
        &self,
        handle: PartHandle,
        sector_count: u64,
        kind: Kind,
    ) -> PartResult<(u64, u64)> {
        let disk = self.disks.get(handle.disk).ok_or(PartError::NotFound)?;
        let free = disk.entry(handle.id).ok_or(PartError::NotFound)?;
        Ok(placement(disk, free, kind, sector_count)?)
    }

    /// Checks whether a primary partition of `sector_count` sectors (0 = the
    /// whole region) can be created in the free region `handle`.
    /// Policy rejections come back as [`PartError::Creation`].
    pub fn primary_partition_creation_checks(&self, handle: PartHandle, sector_count: u64) -> PartResult {
        self.creation_placement(handle, sector_count, Kind::Primary)
            .map(|_| ())
    }

    pub fn extended_partition_creation_checks(&self, handle: PartHandle, sector_count: u64) -> PartResult {
        self.creation_placement(handle, sector_count, Kind::Extended)
            .map(|_| ())
    }

    pub fn logical_partition_creation_checks(&self, handle: PartHandle, sector_count: u64) -> PartResult {
        self.creation_placement(handle, sector_count, Kind::Logical)
            .map(|_| ())
    }

    pub fn create_primary_partition(
        &mut self,
        handle: PartHandle,
        sector_count: u64,
        auto_create: bool,
    ) -> PartResult<PartHandle> {
        self.create_partition(handle, sector_count, Kind::Primary, auto_create)
    }

    /// The new container gets one free logical region covering it.
    pub fn create_extended_partition(&mut self, handle: PartHandle, sector_count: u64) -> PartResult<PartHandle> {
        self.create_partition(handle, sector_count, Kind::Extended, false)
    }

    pub fn create_logical_partition(
        &mut self,
        handle: PartHandle,
        sector_count: u64,
        auto_create: bool,
    ) -> PartResult<PartHandle> {
        self.create_partition(handle, sector_count, Kind::Logical, auto_create)
    }

    fn create_partition(
        &mut self,
        handle: PartHandle,
        sector_count: u64,
        kind: Kind,
        auto_create: bool,
    ) -> PartResult<PartHandle> {
        let (start, count) = self.creation_placement(handle, sector_count, kind)?;
        let ty = match kind {
            Kind::Extended => PartitionType::extended_for(start),
            _ => PartitionType::infer_fat(start, count),
        };

        let disk = self.disks.get_mut(handle.disk).ok_or(PartError::NotFound)?;
        let entry = disk.entry_mut(handle.id).ok_or(PartError::NotFound)?;
        entry.convert_to_partition(start, count, ty, auto_create);
        if kind == Kind::Extended {
            entry.format_state = FormatState::Formatted;
            disk.extended = Some(handle.id);
        }
        disk.dirty = true;
        disk.refresh_free_space()?;
        log_info!(
            "disk {}: new {:?} partition at {start}, {count} sectors ({ty})",
            disk.disk_number,
            kind
        );

        self.after_change(handle.disk);
        Ok(handle)
    }
}
