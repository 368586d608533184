// SPDX-License-Identifier: MIT

//! LBA-aware `DiskIO` helpers to avoid `* bytes_per_sector` everywhere.

use partio::errors::*;
use partio::prelude::*;

use crate::mbr::Mbr;

/// Offset = LBA * sector_size (with overflow-check)
#[inline]
fn lba_offset(lba: u64, sector_size: u32) -> SectorIOResult<u64> {
    lba.checked_mul(sector_size as u64)
        .ok_or(SectorIOError::Other("lba_offset overflow"))
}

pub(crate) trait DiskIOLbaExt: DiskIO {
    /// Reads the 512-byte boot record at `lba` on `disk`.
    #[inline]
    fn read_boot_record(&mut self, disk: u32, lba: u64, sector_size: u32) -> SectorIOResult<Mbr> {
        let off = lba_offset(lba, sector_size)?;
        self.read_struct::<Mbr>(disk, off)
    }

    /// Writes a boot record at `lba`. On sectors larger than 512 bytes the
    /// tail of the sector is left untouched.
    #[inline]
    fn write_boot_record(
        &mut self,
        disk: u32,
        lba: u64,
        sector_size: u32,
        record: &Mbr,
    ) -> SectorIOResult {
        let off = lba_offset(lba, sector_size)?;
        self.write_struct::<Mbr>(disk, off, record)
    }
}

impl<T: DiskIO + ?Sized> DiskIOLbaExt for T {}
