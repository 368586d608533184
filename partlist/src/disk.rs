// SPDX-License-Identifier: MIT

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use partio::DiskIO;

use crate::errors::*;
use crate::geometry::{DiskGeometry, align_down, align_up};
use crate::io_ext::DiskIOLbaExt;
use crate::list::ListOptions;
use crate::mbr::{BOOT_CODE_SIZE, Mbr, MbrEntry};
use crate::partition::{PartEntry, PartId};
use crate::types::PartitionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskStyle {
    /// No valid partition table (no `0xAA55` magic).
    Uninitialized,
    Mbr,
    /// Protective MBR found. Listed, never edited.
    Gpt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScsiAddress {
    pub port: u16,
    pub bus: u16,
    pub id: u16,
}

/// Disk descriptor handed over by the enumeration collaborator.
#[derive(Debug, Clone)]
pub struct PhysicalDisk {
    pub disk_number: u32,
    pub geometry: DiskGeometry,
    pub scsi: ScsiAddress,
    pub driver_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Head of the disk below the first usable sector (MBR included).
    Reserved,
    /// Alignment slivers and space no entry covers.
    Unusable,
    /// EBR area in front of a logical partition.
    BootRecord,
    Free(PartId),
    Partition(PartId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSegment {
    pub start: u64,
    pub count: u64,
    pub kind: LayoutKind,
}

impl LayoutSegment {
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.count
    }
}

/// One physical disk and its partition graph.
#[derive(Debug, Clone)]
pub struct DiskEntry {
    /// Position in the partition list.
    pub index: usize,
    /// OS disk number.
    pub disk_number: u32,
    pub geometry: DiskGeometry,
    pub sector_count: u64,
    pub sector_alignment: u64,
    pub cylinder_alignment: u64,
    /// First sector a partition may start at.
    pub first_usable: u64,
    pub style: DiskStyle,
    pub new_disk: bool,
    /// Firmware disk number, when the disk was correlated.
    pub bios_disk_number: Option<u32>,
    pub scsi: ScsiAddress,
    pub driver_name: String,
    pub signature: u32,
    pub boot_code: [u8; BOOT_CODE_SIZE],
    pub mbr_reserved: [u8; 2],
    pub dirty: bool,

    pub(crate) primaries: Vec<PartEntry>,
    pub(crate) logicals: Vec<PartEntry>,
    pub(crate) extended: Option<PartId>,
    next_id: u32,
}

impl DiskEntry {
    pub(crate) fn new(index: usize, disk: &PhysicalDisk, opts: &ListOptions) -> PartResult<Self> {
        let geometry = disk.geometry;
        if !geometry.is_valid() {
            return Err(PartError::GeometryMismatch("zero geometry"));
        }
        let sector_alignment = geometry.sector_alignment();
        let reserved = opts.head_reserved_bytes / geometry.bytes_per_sector as u64;
        let first_usable = align_up(reserved.max(sector_alignment), sector_alignment)?;

        Ok(Self {
            index,
            disk_number: disk.disk_number,
            geometry,
            sector_count: geometry.sector_count(),
            sector_alignment,
            cylinder_alignment: geometry.cylinder_alignment(),
            first_usable,
            style: DiskStyle::Uninitialized,
            new_disk: false,
            bios_disk_number: None,
            scsi: disk.scsi,
            driver_name: disk.driver_name.clone(),
            signature: 0,
            boot_code: [0; BOOT_CODE_SIZE],
            mbr_reserved: [0; 2],
            dirty: false,
            primaries: Vec::new(),
            logicals: Vec::new(),
            extended: None,
            next_id: 0,
        })
    }

    #[inline]
    pub(crate) fn alloc_id(&mut self) -> PartId {
        let id = PartId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Reads the partition table and builds the graph.
    pub(crate) fn load<IO: DiskIO + ?Sized>(&mut self, io: &mut IO, opts: &ListOptions) -> PartResult {
        let bps = self.geometry.bytes_per_sector;
        let mbr = io.read_boot_record(self.disk_number, 0, bps)?;

        if let Err(e) = mbr.validate_header() {
            log_info!("disk {}: {e}", self.disk_number);
            self.new_disk = true;
            self.style = DiskStyle::Uninitialized;
            return self.refresh_free_space();
        }

        self.signature = mbr.signature();
        self.boot_code = mbr.boot_code;
        self.mbr_reserved = mbr.reserved;

        if mbr.is_protective() {
            log_info!("disk {}: GPT partitioned, left untouched", self.disk_number);
            self.style = DiskStyle::Gpt;
            return Ok(());
        }
        self.style = DiskStyle::Mbr;

        for (slot, record) in mbr.aligned_entries().iter().enumerate() {
            if record.is_empty() {
                continue;
            }
            if let Err(e) = record.validate_basic() {
                log_warn!("disk {}: slot {slot} skipped: {e}", self.disk_number);
                continue;
            }
            let start = record.start_lba as u64;
            let count = record.sectors as u64;
            if start + count > self.sector_count {
                log_warn!(
                    "disk {}: slot {slot} extends past the end of the disk",
                    self.disk_number
                );
            }

            let ty = record.partition_type();
            let id = self.alloc_id();
            let mut entry = PartEntry::existing(id, self.index, start, count, ty, record.is_active(), start, false);
            entry.table_slot = Some(slot);
            self.primaries.push(entry);

            if ty.is_extended() {
                if self.extended.is_none() {
                    self.extended = Some(id);
                } else {
                    log_warn!(
                        "disk {}: slot {slot} is a second extended partition",
                        self.disk_number
                    );
                }
            }
        }
        self.primaries.sort_by_key(|e| e.start_sector);

        self.load_logical_chain(io, opts.max_logical_chain);

        self.renumber();
        for e in self.primaries.iter_mut().chain(self.logicals.iter_mut()) {
            if e.on_disk_partition_number != 0 {
                e.partition_number = Some(e.on_disk_partition_number);
            }
        }
        log_verbose!(
            "disk {}: {} primary, {} logical partition(s)",
            self.disk_number,
            self.primaries.len(),
            self.logicals.len()
        );
        self.refresh_free_space()
    }

    /// Walks the EBR chain of the container. Broken chains are cut short.
    fn load_logical_chain<IO: DiskIO + ?Sized>(&mut self, io: &mut IO, max_chain: usize) {
        let Some(container) = self.extended_entry() else {
            return;
        };
        let (base, end) = (container.start_sector, container.end_sector());
        let bps = self.geometry.bytes_per_sector;

        let mut visited: Vec<u64> = Vec::new();
        let mut ebr_lba = base;
        loop {
            if visited.len() >= max_chain {
                log_warn!("disk {}: logical chain longer than {max_chain}", self.disk_number);
                break;
            }
            if visited.contains(&ebr_lba) {
                log_warn!("disk {}: logical chain loops at LBA {ebr_lba}", self.disk_number);
                break;
            }
            visited.push(ebr_lba);

            let ebr = match io.read_boot_record(self.disk_number, ebr_lba, bps) {
                Ok(ebr) => ebr,
                Err(e) => {
                    log_warn!("disk {}: EBR at LBA {ebr_lba}: {e}", self.disk_number);
                    break;
                }
            };
            if !ebr.has_valid_magic() {
                log_warn!("disk {}: EBR at LBA {ebr_lba} has no magic", self.disk_number);
                break;
            }

            let [data, link, ..] = ebr.aligned_entries();
            if !data.is_empty() {
                let start = ebr_lba + data.start_lba as u64;
                let count = data.sectors as u64;
                if data.validate_basic().is_err() || data.start_lba == 0 {
                    log_warn!("disk {}: bad logical record at LBA {ebr_lba}", self.disk_number);
                } else if start + count > end {
                    log_warn!(
                        "disk {}: logical partition at LBA {start} leaves the container",
                        self.disk_number
                    );
                    break;
                } else {
                    let id = self.alloc_id();
                    self.logicals.push(PartEntry::existing(
                        id,
                        self.index,
                        start,
                        count,
                        data.partition_type(),
                        data.is_active(),
                        data.start_lba as u64,
                        true,
                    ));
                }
            }

            if link.is_empty() || link.sectors == 0 {
                break;
            }
            let next = base + link.start_lba as u64;
            if next >= end {
                log_warn!("disk {}: EBR link at LBA {next} leaves the container", self.disk_number);
                break;
            }
            ebr_lba = next;
        }
        self.logicals.sort_by_key(|e| e.extent_start());
    }

    // ---------- lookups ----------

    #[inline]
    pub fn primaries(&self) -> &[PartEntry] {
        &self.primaries
    }

    #[inline]
    pub fn logicals(&self) -> &[PartEntry] {
        &self.logicals
    }

    #[inline]
    pub fn extended_id(&self) -> Option<PartId> {
        self.extended
    }

    pub fn extended_entry(&self) -> Option<&PartEntry> {
        let id = self.extended?;
        self.primaries.iter().find(|e| e.id == id)
    }

    #[inline]
    pub fn is_container(&self, entry: &PartEntry) -> bool {
        !entry.logical && self.extended == Some(entry.id)
    }

    pub fn entry(&self, id: PartId) -> Option<&PartEntry> {
        self.primaries
            .iter()
            .chain(self.logicals.iter())
            .find(|e| e.id == id)
    }

    pub(crate) fn entry_mut(&mut self, id: PartId) -> Option<&mut PartEntry> {
        self.primaries
            .iter_mut()
            .chain(self.logicals.iter_mut())
            .find(|e| e.id == id)
    }

    /// Every entry in navigation order: primaries, with the logicals right
    /// after their container.
    pub fn entries(&self) -> impl Iterator<Item = &PartEntry> + '_ {
        self.primaries.iter().flat_map(move |e| {
            let logicals: &[PartEntry] = if self.is_container(e) {
                &self.logicals
            } else {
                &[]
            };
            core::iter::once(e).chain(logicals.iter())
        })
    }

    /// Partitioned entries other than the container.
    pub fn partitions(&self) -> impl Iterator<Item = &PartEntry> + '_ {
        self.entries()
            .filter(move |e| e.is_partitioned && !self.is_container(e))
    }

    pub fn partition_by_number(&self, number: u32) -> Option<&PartEntry> {
        if number == 0 {
            return None;
        }
        self.partitions()
            .find(|e| e.on_disk_partition_number == number)
    }

    /// Primary table slots in use (container included).
    pub fn used_slots(&self) -> usize {
        self.primaries.iter().filter(|e| e.is_partitioned).count()
    }

    /// A single partition covering the disk from sector 0, no table slots free.
    pub fn is_super_floppy(&self) -> bool {
        let mut parts = self.primaries.iter().filter(|e| e.is_partitioned);
        match (parts.next(), parts.next()) {
            (Some(only), None) => only.start_sector == 0 && self.extended.is_none(),
            _ => false,
        }
    }

    pub(crate) fn remove_entry(&mut self, id: PartId) -> Option<PartEntry> {
        if let Some(pos) = self.primaries.iter().position(|e| e.id == id) {
            return Some(self.primaries.remove(pos));
        }
        let pos = self.logicals.iter().position(|e| e.id == id)?;
        Some(self.logicals.remove(pos))
    }

    // ---------- structure maintenance ----------

    /// Rebuilds the free-space entries of both sequences from the gaps
    /// between partitions. Free entries keep their id when their start is
    /// unchanged, so adjacent gaps always come out merged.
    pub(crate) fn refresh_free_space(&mut self) -> PartResult {
        if self.style == DiskStyle::Gpt {
            return Ok(());
        }
        let sa = self.sector_alignment;

        let old_free: Vec<(u64, bool, PartId)> = self
            .primaries
            .iter()
            .chain(self.logicals.iter())
            .filter(|e| e.is_free())
            .map(|e| (e.start_sector, e.logical, e.id))
            .collect();
        self.primaries.retain(|e| e.is_partitioned);
        self.logicals.retain(|e| e.is_partitioned);
        self.primaries.sort_by_key(|e| e.start_sector);
        self.logicals.sort_by_key(|e| e.extent_start());

        let occupied: Vec<(u64, u64)> = self
            .primaries
            .iter()
            .map(|e| (e.start_sector, e.end_sector()))
            .collect();
        let usable_end = align_down(self.sector_count, sa)?;
        let primary_gaps = gaps(&occupied, self.first_usable, usable_end, sa)?;

        let logical_gaps = match self.extended_entry() {
            Some(container) => {
                let occupied: Vec<(u64, u64)> = self
                    .logicals
                    .iter()
                    .map(|e| (e.extent_start(), e.end_sector()))
                    .collect();
                let end = container.end_sector().min(usable_end);
                gaps(&occupied, container.start_sector, end, sa)?
            }
            None => {
                self.logicals.clear();
                Vec::new()
            }
        };

        for (logical, found) in [(false, primary_gaps), (true, logical_gaps)] {
            for (start, end) in found {
                let id = old_free
                    .iter()
                    .find(|(s, l, _)| *s == start && *l == logical)
                    .map(|(_, _, id)| *id)
                    .unwrap_or_else(|| self.alloc_id());
                let entry = PartEntry::free(id, self.index, start, end - start, logical);
                if logical {
                    self.logicals.push(entry);
                } else {
                    self.primaries.push(entry);
                }
            }
        }
        self.primaries.sort_by_key(|e| e.start_sector);
        self.logicals.sort_by_key(|e| e.extent_start());
        Ok(())
    }

    /// On-disk numbers: primaries (container excluded) then logicals.
    pub(crate) fn renumber(&mut self) {
        let container = self.extended;
        let mut number = 1;
        for e in self.primaries.iter_mut().chain(self.logicals.iter_mut()) {
            if e.is_partitioned && !(Some(e.id) == container && !e.logical) {
                e.on_disk_partition_number = number;
                number += 1;
            } else {
                e.on_disk_partition_number = 0;
            }
        }
    }

    pub(crate) fn mark_committed(&mut self) {
        if let Ok(slots) = self.table_slots() {
            for (slot, index) in slots.into_iter().enumerate() {
                if let Some(i) = index {
                    self.primaries[i].table_slot = Some(slot);
                }
            }
        }
        self.dirty = false;
        self.new_disk = false;
        self.style = DiskStyle::Mbr;
        for e in self.primaries.iter_mut().chain(self.logicals.iter_mut()) {
            e.new = false;
            if e.is_partitioned && e.on_disk_partition_number != 0 {
                e.partition_number = Some(e.on_disk_partition_number);
            }
        }
    }

    // ---------- layout ----------

    /// Segments tiling `[0, sector_count)`: every entry, the EBR area in
    /// front of each logical partition, the reserved head and any sliver no
    /// entry covers. The container is replaced by its content. Overlapping
    /// entries (corrupt tables) are reported as they are.
    pub fn layout(&self) -> Vec<LayoutSegment> {
        let mut items: Vec<LayoutSegment> = Vec::new();
        let mut push = |start: u64, end: u64, kind: LayoutKind| {
            if end > start {
                items.push(LayoutSegment {
                    start,
                    count: end - start,
                    kind,
                });
            }
        };

        for e in &self.primaries {
            if self.is_container(e) {
                continue;
            }
            push(e.start_sector, e.end_sector(), entry_kind(e));
        }
        if let Some(container) = self.extended_entry() {
            let mut cursor = container.start_sector;
            for e in &self.logicals {
                let extent = e.extent_start();
                push(cursor, extent, LayoutKind::Unusable);
                push(extent, e.start_sector, LayoutKind::BootRecord);
                push(e.start_sector, e.end_sector(), entry_kind(e));
                cursor = cursor.max(e.end_sector());
            }
            push(cursor, container.end_sector(), LayoutKind::Unusable);
        }
        items.sort_by_key(|s| s.start);

        let mut out = Vec::with_capacity(items.len() * 2 + 2);
        let mut cursor = 0u64;
        for item in items {
            if item.start > cursor {
                self.push_gap(&mut out, cursor, item.start);
            }
            cursor = cursor.max(item.end());
            out.push(item);
        }
        if self.sector_count > cursor {
            self.push_gap(&mut out, cursor, self.sector_count);
        }
        out
    }

    fn push_gap(&self, out: &mut Vec<LayoutSegment>, start: u64, end: u64) {
        let split = self.first_usable.clamp(start, end);
        if split > start {
            out.push(LayoutSegment {
                start,
                count: split - start,
                kind: LayoutKind::Reserved,
            });
        }
        if end > split {
            out.push(LayoutSegment {
                start: split,
                count: end - split,
                kind: LayoutKind::Unusable,
            });
        }
    }

    // ---------- encoding ----------

    fn check_range(&self, e: &PartEntry) -> PartResult {
        if e.end_sector() > self.sector_count {
            return Err(PartError::GeometryMismatch("partition exceeds the disk"));
        }
        Ok(())
    }

    /// Index into `primaries` for each of the four MBR slots. Entries keep
    /// the slot they came from; new ones take the free slots in start order.
    fn table_slots(&self) -> PartResult<[Option<usize>; 4]> {
        let mut slots = [None; 4];
        let mut pending = Vec::new();
        for (i, e) in self.primaries.iter().enumerate() {
            if !e.is_partitioned {
                continue;
            }
            match e.table_slot {
                Some(slot) if slot < 4 && slots[slot].is_none() => slots[slot] = Some(i),
                _ => pending.push(i),
            }
        }
        for i in pending {
            let free = slots
                .iter()
                .position(Option::is_none)
                .ok_or(PartError::Invalid("more than four primary partitions"))?;
            slots[free] = Some(i);
        }
        Ok(slots)
    }

    /// MBR for the current primary sequence. Loaded entries stay in their
    /// slot; boot code, signature and reserved bytes are carried over.
    pub fn build_mbr(&self) -> PartResult<Mbr> {
        let mut entries = [MbrEntry::new_empty(); 4];
        for (slot, index) in self.table_slots()?.into_iter().enumerate() {
            let Some(e) = index.map(|i| &self.primaries[i]) else {
                continue;
            };
            self.check_range(e)?;
            entries[slot] = MbrEntry::for_range(
                e.boot_indicator,
                e.partition_type,
                0,
                e.start_sector,
                e.sector_count,
                &self.geometry,
            )?;
        }

        let mut mbr = Mbr::new_from_entries(entries);
        mbr.boot_code = self.boot_code;
        mbr.reserved = self.mbr_reserved;
        mbr.set_signature(self.signature);
        Ok(mbr)
    }

    /// `(lba, record)` for every EBR of the logical chain, in chain order.
    ///
    /// The first EBR always sits at the container start: when the first
    /// logical partition starts further in, a head EBR with an empty data
    /// record links to it. A container without logicals gets one empty EBR.
    pub fn build_ebr_chain(&self) -> PartResult<Vec<(u64, Mbr)>> {
        let Some(container) = self.extended_entry() else {
            return Ok(Vec::new());
        };
        let base = container.start_sector;
        let logicals: Vec<&PartEntry> = self.logicals.iter().filter(|e| e.is_partitioned).collect();

        let mut chain = Vec::with_capacity(logicals.len() + 1);
        let Some(first) = logicals.first() else {
            chain.push((base, Mbr::new_ebr(MbrEntry::new_empty(), MbrEntry::new_empty())));
            return Ok(chain);
        };
        if first.extent_start() != base {
            let link = self.link_record(base, first)?;
            chain.push((base, Mbr::new_ebr(MbrEntry::new_empty(), link)));
        }

        for (i, e) in logicals.iter().enumerate() {
            self.check_range(e)?;
            let ebr = e.extent_start();
            let data = MbrEntry::for_range(
                e.boot_indicator,
                e.partition_type,
                ebr,
                e.hidden_sectors,
                e.sector_count,
                &self.geometry,
            )?;
            let link = match logicals.get(i + 1) {
                Some(next) => self.link_record(base, next)?,
                None => MbrEntry::new_empty(),
            };
            chain.push((ebr, Mbr::new_ebr(data, link)));
        }
        Ok(chain)
    }

    fn link_record(&self, base: u64, next: &PartEntry) -> PartResult<MbrEntry> {
        let extent = next.extent_start();
        MbrEntry::for_range(
            false,
            PartitionType::Extended,
            base,
            extent - base,
            next.end_sector() - extent,
            &self.geometry,
        )
    }
}

fn entry_kind(e: &PartEntry) -> LayoutKind {
    if e.is_partitioned {
        LayoutKind::Partition(e.id)
    } else {
        LayoutKind::Free(e.id)
    }
}

/// Aligned gaps of at least one `align` unit in `[lo, hi)` not covered by
/// `occupied` (sorted by start).
fn gaps(occupied: &[(u64, u64)], lo: u64, hi: u64, align: u64) -> PartResult<Vec<(u64, u64)>> {
    let mut out = Vec::new();
    let mut push = |start: u64, end: u64| -> PartResult {
        let start = align_up(start, align)?;
        let end = align_down(end, align)?;
        if end > start && end - start >= align {
            out.push((start, end));
        }
        Ok(())
    };

    let mut cursor = lo;
    for &(start, end) in occupied {
        if start > cursor {
            push(cursor, start.min(hi))?;
        }
        cursor = cursor.max(end);
    }
    if hi > cursor {
        push(cursor, hi)?;
    }
    Ok(out)
}

impl fmt::Display for DiskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Disk {} • {:?} • {} sectors x {} B • C/H/S {}/{}/{}{}",
            self.disk_number,
            self.style,
            self.sector_count,
            self.geometry.bytes_per_sector,
            self.geometry.cylinders,
            self.geometry.tracks_per_cylinder,
            self.geometry.sectors_per_track,
            if self.dirty { " • modified" } else { "" }
        )?;
        writeln!(
            f,
            "  ┌────┬────┬──────────────────────────────┬────────────┬────────────┬─────────────┐"
        )?;
        writeln!(
            f,
            "  | Nr | Ltr| Type                         | Start LBA  | Sectors    | Size        |"
        )?;
        writeln!(
            f,
            "  ├────┼────┼──────────────────────────────┼────────────┼────────────┼─────────────┤"
        )?;
        for e in self.entries() {
            let ty = if e.is_free() {
                String::from("(free space)")
            } else {
                alloc::format!("{}{}", if e.logical { "  " } else { "" }, e.partition_type)
            };
            writeln!(
                f,
                "  | {:>2} | {:<2} | {:<28} | {:>10} | {:>10} | {:>11} |",
                e.on_disk_partition_number,
                e.drive_letter.map(|c| alloc::format!("{c}:")).unwrap_or_default(),
                truncate(&ty, 28),
                e.start_sector,
                e.sector_count,
                PrettyBytes(e.size_bytes(self.geometry.bytes_per_sector)),
            )?;
        }
        writeln!(
            f,
            "  └────┴────┴──────────────────────────────┴────────────┴────────────┴─────────────┘"
        )
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Binary-unit size, e.g. `1.0 MiB`.
pub struct PrettyBytes(pub u64);

impl fmt::Display for PrettyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
        let mut val = self.0 as f64;
        let mut idx = 0usize;
        while val >= 1024.0 && idx + 1 < UNITS.len() {
            val /= 1024.0;
            idx += 1;
        }
        let text = if idx == 0 {
            alloc::format!("{} {}", self.0, UNITS[idx])
        } else {
            alloc::format!("{:.1} {}", val, UNITS[idx])
        };
        f.pad(&text)
    }
}
