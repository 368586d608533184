// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;
use crate::geometry::{DiskGeometry, lba_to_chs};
use crate::types::PartitionType;

pub const MBR_MAGIC: [u8; 2] = [0x55, 0xAA];
pub const MBR_SIZE: usize = 512;
pub const BOOT_CODE_SIZE: usize = 440;

pub const BOOT_FLAG_ACTIVE: u8 = 0x80;

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)] // 16 bytes, no padding
pub struct MbrEntry {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntry {
    #[inline]
    pub fn new(
        boot_flag: u8,
        starting_chs: [u8; 3],
        part_type: u8,
        end_chs: [u8; 3],
        start_lba: u32,
        sectors: u32,
    ) -> Self {
        Self {
            boot_flag,
            starting_chs,
            part_type,
            end_chs,
            start_lba,
            sectors,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new(0x00, [0, 0, 0], 0x00, [0, 0, 0], 0, 0)
    }

    /// Record for `sectors` sectors at `start_lba`. `chs_base` is the LBA the
    /// record is relative to (0 for the MBR, the EBR or container start for
    /// the logical chain); CHS is always computed on the absolute address.
    pub fn for_range(
        boot: bool,
        ty: PartitionType,
        chs_base: u64,
        start_lba: u64,
        sectors: u64,
        geometry: &DiskGeometry,
    ) -> PartResult<Self> {
        if sectors == 0 {
            return Err(PartError::GeometryMismatch("MBR: zero-length entry"));
        }
        let rel_start = u32::try_from(start_lba)
            .map_err(|_| PartError::GeometryMismatch("MBR: start LBA exceeds 32 bits"))?;
        let count = u32::try_from(sectors)
            .map_err(|_| PartError::GeometryMismatch("MBR: sector count exceeds 32 bits"))?;
        let abs_start = chs_base + start_lba;
        let abs_end = abs_start + sectors - 1;
        Ok(Self::new(
            if boot { BOOT_FLAG_ACTIVE } else { 0 },
            lba_to_chs(abs_start, geometry),
            ty.as_byte(),
            lba_to_chs(abs_end, geometry),
            rel_start,
            count,
        ))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.part_type == 0
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.boot_flag == BOOT_FLAG_ACTIVE
    }

    #[inline]
    pub fn partition_type(&self) -> PartitionType {
        PartitionType::from_byte(self.part_type)
    }

    #[inline]
    pub fn validate_basic(&self) -> PartResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.sectors == 0 {
            return Err(PartError::Invalid("MBR: entry with zero sectors"));
        }
        if !(self.boot_flag == 0x00 || self.boot_flag == BOOT_FLAG_ACTIVE) {
            return Err(PartError::Invalid("MBR: invalid boot flag"));
        }
        Ok(())
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct MbrEntryPacked {
    pub boot_flag: u8,
    pub starting_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl MbrEntryPacked {
    #[inline]
    pub fn to_aligned(self) -> MbrEntry {
        MbrEntry {
            boot_flag: self.boot_flag,
            starting_chs: self.starting_chs,
            part_type: self.part_type,
            end_chs: self.end_chs,
            start_lba: u32::from_le(self.start_lba),
            sectors: u32::from_le(self.sectors),
        }
    }

    #[inline]
    pub fn from_aligned(e: &MbrEntry) -> Self {
        Self {
            boot_flag: e.boot_flag,
            starting_chs: e.starting_chs,
            part_type: e.part_type,
            end_chs: e.end_chs,
            start_lba: e.start_lba.to_le(),
            sectors: e.sectors.to_le(),
        }
    }
}

/// A 512-byte boot sector: the MBR at LBA 0, or an EBR in the logical chain.
///
/// Boot code, disk signature and reserved bytes are opaque and preserved.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct Mbr {
    pub boot_code: [u8; BOOT_CODE_SIZE],
    pub disk_signature: [u8; 4],
    pub reserved: [u8; 2],
    pub entries: [MbrEntryPacked; 4],
    pub magic: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<Mbr>() == MBR_SIZE);

impl Mbr {
    #[inline]
    pub fn new_from_entries(entries: [MbrEntry; 4]) -> Self {
        Self {
            boot_code: [0u8; BOOT_CODE_SIZE],
            disk_signature: [0; 4],
            reserved: [0; 2],
            entries: entries.map(|e| MbrEntryPacked::from_aligned(&e)),
            magic: MBR_MAGIC,
        }
    }

    #[inline]
    pub fn new_empty() -> Self {
        Self::new_from_entries([MbrEntry::new_empty(); 4])
    }

    /// EBR with a data record and a link to the next EBR.
    #[inline]
    pub fn new_ebr(data: MbrEntry, link: MbrEntry) -> Self {
        Self::new_from_entries([data, link, MbrEntry::new_empty(), MbrEntry::new_empty()])
    }

    /// Decodes the first 512 bytes of `sector`.
    pub fn from_sector(sector: &[u8]) -> PartResult<Self> {
        let bytes = sector
            .get(..MBR_SIZE)
            .ok_or(PartError::Invalid("MBR: short sector"))?;
        Self::read_from_bytes(bytes).map_err(|_| PartError::Invalid("MBR: decode failed"))
    }

    #[inline]
    pub fn has_valid_magic(&self) -> bool {
        self.magic == MBR_MAGIC
    }

    #[inline]
    pub fn signature(&self) -> u32 {
        u32::from_le_bytes(self.disk_signature)
    }

    #[inline]
    pub fn set_signature(&mut self, signature: u32) {
        self.disk_signature = signature.to_le_bytes();
    }

    #[inline]
    pub fn aligned_entries(&self) -> [MbrEntry; 4] {
        [
            self.entries[0].to_aligned(),
            self.entries[1].to_aligned(),
            self.entries[2].to_aligned(),
            self.entries[3].to_aligned(),
        ]
    }

    /// A protective `0xEE` record marks a GPT disk.
    #[inline]
    pub fn is_protective(&self) -> bool {
        self.aligned_entries()
            .iter()
            .any(|e| e.partition_type().is_protective())
    }

    #[inline]
    pub fn validate_header(&self) -> PartResult<()> {
        if !self.has_valid_magic() {
            return Err(PartError::Invalid("MBR: missing 0xAA55 magic"));
        }
        Ok(())
    }
}
