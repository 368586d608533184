// SPDX-License-Identifier: MIT

use alloc::string::String;
use core::fmt;

use crate::types::PartitionType;

/// Identifier of a partition or free region, unique within its disk for the
/// whole session. Never reused after the entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(pub(crate) u32);

impl PartId {
    #[inline]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable reference to an entry: index of the disk in the list plus the
/// entry id. Resolves to nothing once the entry is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartHandle {
    pub disk: usize,
    pub id: PartId,
}

impl PartHandle {
    #[inline]
    pub const fn new(disk: usize, id: PartId) -> Self {
        Self { disk, id }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatState {
    #[default]
    Unformatted,
    UnformattedOrDamaged,
    UnknownFormat,
    Preformatted,
    Formatted,
}

/// One partition or free-space region.
///
/// Sector values are absolute on the disk. For logical partitions
/// `hidden_sectors` is the distance from the partition to its EBR; for
/// primaries it is the distance from the MBR, i.e. the start sector.
#[derive(Debug, Clone)]
pub struct PartEntry {
    pub(crate) id: PartId,
    /// Index of the owning disk in the partition list.
    pub disk: usize,

    pub start_sector: u64,
    pub sector_count: u64,

    pub boot_indicator: bool,
    pub partition_type: PartitionType,
    pub hidden_sectors: u64,

    /// On-disk number: primaries first (container excluded), then logicals.
    /// 0 for free space.
    pub on_disk_partition_number: u32,
    /// Number the running system knows the partition by, if any.
    pub partition_number: Option<u32>,

    pub drive_letter: Option<char>,
    pub volume_label: String,
    pub file_system: String,
    pub format_state: FormatState,

    pub is_partitioned: bool,
    pub new: bool,
    pub auto_create: bool,
    pub needs_check: bool,
    pub logical: bool,
    /// MBR slot the entry was read from or last written to.
    pub table_slot: Option<usize>,
}

impl PartEntry {
    pub(crate) fn free(id: PartId, disk: usize, start_sector: u64, sector_count: u64, logical: bool) -> Self {
        Self {
            id,
            disk,
            start_sector,
            sector_count,
            boot_indicator: false,
            partition_type: PartitionType::Empty,
            hidden_sectors: 0,
            on_disk_partition_number: 0,
            partition_number: None,
            drive_letter: None,
            volume_label: String::new(),
            file_system: String::new(),
            format_state: FormatState::Unformatted,
            is_partitioned: false,
            new: false,
            auto_create: false,
            needs_check: false,
            logical,
            table_slot: None,
        }
    }

    /// Entry read from a partition table record.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn existing(
        id: PartId,
        disk: usize,
        start_sector: u64,
        sector_count: u64,
        partition_type: PartitionType,
        boot_indicator: bool,
        hidden_sectors: u64,
        logical: bool,
    ) -> Self {
        Self {
            boot_indicator,
            partition_type,
            hidden_sectors,
            is_partitioned: true,
            // filled in by a volume probe, if any
            format_state: FormatState::UnknownFormat,
            ..Self::free(id, disk, start_sector, sector_count, logical)
        }
    }

    /// Turns this free region into a new partition.
    pub(crate) fn convert_to_partition(
        &mut self,
        start_sector: u64,
        sector_count: u64,
        partition_type: PartitionType,
        auto_create: bool,
    ) {
        self.hidden_sectors = if self.logical {
            start_sector - self.start_sector
        } else {
            start_sector
        };
        self.start_sector = start_sector;
        self.sector_count = sector_count;
        self.partition_type = partition_type;
        self.is_partitioned = true;
        self.new = true;
        self.auto_create = auto_create;
        self.needs_check = false;
        self.format_state = FormatState::Unformatted;
        self.file_system.clear();
        self.volume_label.clear();
    }

    #[inline]
    pub fn id(&self) -> PartId {
        self.id
    }

    #[inline]
    pub fn handle(&self) -> PartHandle {
        PartHandle::new(self.disk, self.id)
    }

    /// One past the last sector.
    #[inline]
    pub fn end_sector(&self) -> u64 {
        self.start_sector + self.sector_count
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        !self.is_partitioned
    }

    /// First sector owned by this entry: the EBR for logical partitions.
    #[inline]
    pub fn extent_start(&self) -> u64 {
        if self.logical && self.is_partitioned {
            self.start_sector - self.hidden_sectors
        } else {
            self.start_sector
        }
    }

    #[inline]
    pub fn size_bytes(&self, bytes_per_sector: u32) -> u64 {
        self.sector_count.saturating_mul(bytes_per_sector as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_entry_is_blank() {
        let e = PartEntry::free(PartId(3), 0, 4096, 2048, false);
        assert!(e.is_free());
        assert_eq!(e.end_sector(), 6144);
        assert_eq!(e.drive_letter, None);
        assert!(e.file_system.is_empty());
        assert!(!e.boot_indicator);
        assert_eq!(e.handle(), PartHandle::new(0, PartId(3)));
    }

    #[test]
    fn logical_conversion_keeps_ebr_gap() {
        let mut e = PartEntry::free(PartId(1), 0, 4096, 1 << 20, true);
        e.convert_to_partition(16_384, 1024, PartitionType::Fat12, false);
        assert!(e.is_partitioned && e.new);
        assert_eq!(e.hidden_sectors, 12_288);
        assert_eq!(e.extent_start(), 4096);
        assert_eq!(e.format_state, FormatState::Unformatted);
    }

    #[test]
    fn primary_hidden_sectors_is_start() {
        let mut e = PartEntry::free(PartId(1), 0, 2048, 1 << 20, false);
        e.convert_to_partition(2048, 2048, PartitionType::Fat12, true);
        assert_eq!(e.hidden_sectors, 2048);
        assert!(e.auto_create);
        assert_eq!(e.size_bytes(512), 1 << 20);
    }
}
