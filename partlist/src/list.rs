// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use partio::DiskIO;

use crate::bios::{self, BiosDiskEntry};
use crate::disk::{DiskEntry, PhysicalDisk, ScsiAddress};
use crate::errors::*;
use crate::partition::{PartEntry, PartHandle, PartId};
use crate::types::PartitionType;

/// Options for building the partition list.
#[derive(Clone, Copy, Debug)]
pub struct ListOptions {
    /// Upper bound on EBRs followed per disk.
    pub max_logical_chain: usize,
    /// Head of the disk kept free of partitions, in bytes.
    pub head_reserved_bytes: u64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_logical_chain: 128,
            head_reserved_bytes: 1024 * 1024,
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_logical_chain(mut self, n: usize) -> Self {
        self.max_logical_chain = n;
        self
    }

    pub fn with_head_reserved_bytes(mut self, bytes: u64) -> Self {
        self.head_reserved_bytes = bytes;
        self
    }
}

/// Selection state. When `partition` is set it belongs to `disk`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub disk: Option<usize>,
    pub partition: Option<PartId>,
}

impl Cursor {
    #[inline]
    pub fn handle(&self) -> Option<PartHandle> {
        Some(PartHandle::new(self.disk?, self.partition?))
    }
}

/// All disks of the machine with their partition graphs.
#[derive(Debug, Clone)]
pub struct PartitionList {
    pub(crate) disks: Vec<DiskEntry>,
    pub(crate) bios: Vec<BiosDiskEntry>,
    pub(crate) cursor: Cursor,
    pub(crate) system_partition: Option<PartHandle>,
    pub(crate) original_system_partition: Option<PartHandle>,
    pub(crate) options: ListOptions,
}

impl PartitionList {
    /// Reads every disk in `disks` through `io` and correlates it with the
    /// firmware report. Disks that cannot be read are skipped.
    pub fn create<IO: DiskIO + ?Sized>(
        io: &mut IO,
        disks: &[PhysicalDisk],
        bios: Vec<BiosDiskEntry>,
        options: ListOptions,
    ) -> PartResult<Self> {
        if options.max_logical_chain == 0 {
            return Err(PartError::InvalidArgument("max_logical_chain must be non-zero"));
        }

        let mut list = Self {
            disks: Vec::with_capacity(disks.len()),
            bios,
            cursor: Cursor::default(),
            system_partition: None,
            original_system_partition: None,
            options,
        };

        for physical in disks {
            if list.disk_by_number(physical.disk_number).is_some() {
                log_warn!("disk {}: listed twice, skipped", physical.disk_number);
                continue;
            }
            let index = list.disks.len();
            let mut disk = match DiskEntry::new(index, physical, &options) {
                Ok(disk) => disk,
                Err(e) => {
                    log_warn!("disk {}: skipped: {e}", physical.disk_number);
                    continue;
                }
            };
            if let Err(e) = disk.load(io, &options) {
                log_warn!("disk {}: skipped: {e}", physical.disk_number);
                continue;
            }

            disk.bios_disk_number = bios::correlate(&mut list.bios, disk.signature, &disk.geometry);
            match disk.bios_disk_number {
                Some(n) => log_verbose!("disk {}: firmware disk 0x{n:02X}", disk.disk_number),
                None => log_verbose!("disk {}: not reported by the firmware", disk.disk_number),
            }
            list.disks.push(disk);
        }

        list.update_drive_letters();
        if !list.disks.is_empty() {
            list.cursor.disk = Some(0);
        }
        log_info!("{} disk(s) listed", list.disks.len());
        Ok(list)
    }

    #[inline]
    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    // ---------- disks ----------

    #[inline]
    pub fn disks(&self) -> &[DiskEntry] {
        &self.disks
    }

    #[inline]
    pub fn disk(&self, index: usize) -> Option<&DiskEntry> {
        self.disks.get(index)
    }

    #[inline]
    pub fn bios_disks(&self) -> &[BiosDiskEntry] {
        &self.bios
    }

    pub fn disk_by_number(&self, disk_number: u32) -> Option<&DiskEntry> {
        self.disks.iter().find(|d| d.disk_number == disk_number)
    }

    pub fn disk_by_bios_number(&self, bios_number: u32) -> Option<&DiskEntry> {
        self.disks
            .iter()
            .find(|d| d.bios_disk_number == Some(bios_number))
    }

    pub fn disk_by_scsi(&self, address: ScsiAddress) -> Option<&DiskEntry> {
        self.disks.iter().find(|d| d.scsi == address)
    }

    pub fn disk_by_signature(&self, signature: u32) -> Option<&DiskEntry> {
        if signature == 0 {
            return None;
        }
        self.disks.iter().find(|d| d.signature == signature)
    }

    // ---------- entries ----------

    pub fn entry(&self, handle: PartHandle) -> Option<&PartEntry> {
        self.disks.get(handle.disk)?.entry(handle.id)
    }

    pub(crate) fn entry_mut(&mut self, handle: PartHandle) -> Option<&mut PartEntry> {
        self.disks.get_mut(handle.disk)?.entry_mut(handle.id)
    }

    /// Handle of partition `partition_number` on OS disk `disk_number`.
    pub fn partition(&self, disk_number: u32, partition_number: u32) -> Option<PartHandle> {
        self.disk_by_number(disk_number)?
            .partition_by_number(partition_number)
            .map(PartEntry::handle)
    }

    /// Resolves a disk and optionally one of its partitions without moving
    /// the cursor. `None` for the partition means "disk only".
    pub fn get_disk_or_partition(
        &self,
        disk_number: u32,
        partition_number: Option<u32>,
    ) -> PartResult<(&DiskEntry, Option<&PartEntry>)> {
        let disk = self.disk_by_number(disk_number).ok_or(PartError::NotFound)?;
        let Some(number) = partition_number else {
            return Ok((disk, None));
        };
        let part = disk.partition_by_number(number).ok_or(PartError::NotFound)?;
        Ok((disk, Some(part)))
    }

    /// Changes the type byte of a partition. The container and free space
    /// cannot be retyped, nor can a partition become an extended one.
    pub fn set_partition_type(&mut self, handle: PartHandle, ty: PartitionType) -> PartResult {
        let disk = self.disks.get_mut(handle.disk).ok_or(PartError::NotFound)?;
        let is_container = disk.extended == Some(handle.id);
        let entry = disk.entry_mut(handle.id).ok_or(PartError::NotFound)?;
        if !entry.is_partitioned || (is_container && !entry.logical) {
            return Err(PartError::Invalid("entry cannot be retyped"));
        }
        if ty.is_extended() || ty.is_empty() || ty.is_protective() {
            return Err(PartError::InvalidArgument("type not allowed for a data partition"));
        }
        if entry.partition_type != ty {
            entry.partition_type = ty;
            disk.dirty = true;
            self.update_drive_letters();
        }
        Ok(())
    }

    // ---------- cursor ----------

    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current_disk(&self) -> Option<&DiskEntry> {
        self.disks.get(self.cursor.disk?)
    }

    #[inline]
    pub fn current_partition(&self) -> Option<PartHandle> {
        self.cursor.handle()
    }

    #[inline]
    pub fn system_partition(&self) -> Option<PartHandle> {
        self.system_partition
    }

    #[inline]
    pub fn original_system_partition(&self) -> Option<PartHandle> {
        self.original_system_partition
    }

    /// Moves the cursor to `handle` (partition or free region).
    pub fn select(&mut self, handle: PartHandle) -> PartResult {
        if self.entry(handle).is_none() {
            return Err(PartError::NotFound);
        }
        self.cursor = Cursor {
            disk: Some(handle.disk),
            partition: Some(handle.id),
        };
        Ok(())
    }

    /// Moves the cursor to a disk, clearing the partition selection.
    pub fn select_disk(&mut self, index: usize) -> PartResult {
        if index >= self.disks.len() {
            return Err(PartError::NotFound);
        }
        self.cursor = Cursor {
            disk: Some(index),
            partition: None,
        };
        Ok(())
    }

    pub fn select_partition(&mut self, disk_number: u32, partition_number: u32) -> PartResult<PartHandle> {
        let handle = self
            .partition(disk_number, partition_number)
            .ok_or(PartError::NotFound)?;
        self.select(handle)?;
        Ok(handle)
    }

    /// Partitioned entries of every disk in navigation order.
    pub(crate) fn navigation_order(&self) -> Vec<PartHandle> {
        self.disks
            .iter()
            .flat_map(|d| d.entries().filter(|e| e.is_partitioned).map(PartEntry::handle))
            .collect()
    }

    pub fn next_partition(&mut self) -> Option<PartHandle> {
        self.step(true)
    }

    pub fn prev_partition(&mut self) -> Option<PartHandle> {
        self.step(false)
    }

    /// Cyclic move through [`Self::navigation_order`]. With no partition
    /// selected, forward starts at the first entry and backward at the last.
    fn step(&mut self, forward: bool) -> Option<PartHandle> {
        let order = self.navigation_order();
        if order.is_empty() {
            return None;
        }
        let current = self
            .cursor
            .handle()
            .and_then(|h| order.iter().position(|o| *o == h));

        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => order.len() - 1,
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
        };
        let handle = order[next];
        self.cursor = Cursor {
            disk: Some(handle.disk),
            partition: Some(handle.id),
        };
        Some(handle)
    }

    // ---------- bookkeeping ----------

    /// Renumbers `disk`, reassigns drive letters and drops markers whose
    /// entry is gone. Runs after every structural change.
    pub(crate) fn after_change(&mut self, disk: usize) {
        if let Some(d) = self.disks.get_mut(disk) {
            d.renumber();
        }
        self.update_drive_letters();

        let resolves = |list: &Self, h: Option<PartHandle>| h.is_some_and(|h| list.entry(h).is_some());
        if self.cursor.partition.is_some() && !resolves(self, self.cursor.handle()) {
            self.cursor.partition = None;
        }
        if !resolves(self, self.system_partition) {
            self.system_partition = None;
        }
        if !resolves(self, self.original_system_partition) {
            self.original_system_partition = None;
        }
    }

    /// Letters `C`..`Z` over every disk, all primaries before all logicals.
    pub(crate) fn update_drive_letters(&mut self) {
        let mut next = Some('C');
        for logical in [false, true] {
            for disk in &mut self.disks {
                let container = disk.extended;
                let seq = if logical { &mut disk.logicals } else { &mut disk.primaries };
                for e in seq.iter_mut() {
                    e.drive_letter = None;
                    let eligible = e.is_partitioned
                        && !(container == Some(e.id) && !e.logical)
                        && (e.partition_type.is_recognized() || e.new);
                    if !eligible {
                        continue;
                    }
                    if let Some(letter) = next {
                        e.drive_letter = Some(letter);
                        next = match letter {
                            'Z' => None,
                            c => char::from_u32(c as u32 + 1),
                        };
                    }
                }
            }
        }
    }
}
