// SPDX-License-Identifier: MIT

use crate::errors::*;

/// Rounds `value` down to a multiple of `alignment`.
#[inline]
pub fn align_down(value: u64, alignment: u64) -> PartResult<u64> {
    if alignment == 0 {
        return Err(PartError::InvalidArgument("alignment must be non-zero"));
    }
    Ok(value - value % alignment)
}

/// Rounds `value` up to a multiple of `alignment`.
#[inline]
pub fn align_up(value: u64, alignment: u64) -> PartResult<u64> {
    if alignment == 0 {
        return Err(PartError::InvalidArgument("alignment must be non-zero"));
    }
    match value % alignment {
        0 => Ok(value),
        rem => value
            .checked_add(alignment - rem)
            .ok_or(PartError::InvalidArgument("align_up overflow")),
    }
}

/// Integer division rounding to nearest, ties up.
#[inline]
pub fn rounding_divide(dividend: u64, divisor: u64) -> PartResult<u64> {
    if divisor == 0 {
        return Err(PartError::InvalidArgument("divisor must be non-zero"));
    }
    let quotient = dividend / divisor;
    let remainder = dividend % divisor;
    // remainder >= divisor - remainder, without overflowing `remainder * 2`
    if remainder >= divisor - remainder {
        Ok(quotient + 1)
    } else {
        Ok(quotient)
    }
}

/// Physical disk geometry as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub cylinders: u64,
    /// Heads.
    pub tracks_per_cylinder: u32,
    pub sectors_per_track: u32,
    pub bytes_per_sector: u32,
}

impl DiskGeometry {
    pub const fn new(
        cylinders: u64,
        tracks_per_cylinder: u32,
        sectors_per_track: u32,
        bytes_per_sector: u32,
    ) -> Self {
        Self {
            cylinders,
            tracks_per_cylinder,
            sectors_per_track,
            bytes_per_sector,
        }
    }

    /// Geometry holding as many whole cylinders of the given heads and
    /// sectors per track as fit in `sector_count`. Used for image files,
    /// which carry no geometry of their own.
    pub fn from_sector_count(
        sector_count: u64,
        tracks_per_cylinder: u32,
        sectors_per_track: u32,
        bytes_per_sector: u32,
    ) -> PartResult<Self> {
        let per_cylinder = tracks_per_cylinder as u64 * sectors_per_track as u64;
        if per_cylinder == 0 || bytes_per_sector == 0 {
            return Err(PartError::InvalidArgument("zero geometry"));
        }
        Ok(Self::new(
            sector_count / per_cylinder,
            tracks_per_cylinder,
            sectors_per_track,
            bytes_per_sector,
        ))
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cylinders != 0
            && self.tracks_per_cylinder != 0
            && self.sectors_per_track != 0
            && self.bytes_per_sector != 0
    }

    #[inline]
    pub fn sectors_per_cylinder(&self) -> u64 {
        self.tracks_per_cylinder as u64 * self.sectors_per_track as u64
    }

    /// C x H x S.
    #[inline]
    pub fn sector_count(&self) -> u64 {
        self.cylinders.saturating_mul(self.sectors_per_cylinder())
    }

    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.sector_count()
            .saturating_mul(self.bytes_per_sector as u64)
    }

    /// Sectors per track rounded up to a power of two.
    #[inline]
    pub fn sector_alignment(&self) -> u64 {
        (self.sectors_per_track.max(1) as u64).next_power_of_two()
    }

    /// Sectors per cylinder rounded up to a power of two.
    #[inline]
    pub fn cylinder_alignment(&self) -> u64 {
        self.sectors_per_cylinder().max(1).next_power_of_two()
    }
}

/// Largest encodable CHS address: cylinder 1023, head 254, sector 63.
pub const CHS_MAX: [u8; 3] = [0xFE, 0xFF, 0xFF];

/// Encodes `lba` as the three CHS bytes of a partition record:
/// head, sector | (cylinder bits 8..9) << 6, cylinder low byte.
///
/// Addresses past cylinder 1023, or geometries outside the legacy limits
/// (more than 255 heads or 63 sectors per track), clamp to [`CHS_MAX`].
pub fn lba_to_chs(lba: u64, geometry: &DiskGeometry) -> [u8; 3] {
    let heads = geometry.tracks_per_cylinder as u64;
    let spt = geometry.sectors_per_track as u64;
    if heads == 0 || spt == 0 || heads > 255 || spt > 63 {
        return CHS_MAX;
    }

    let cylinder = lba / (heads * spt);
    if cylinder > 1023 {
        return CHS_MAX;
    }
    let head = (lba / spt) % heads;
    let sector = lba % spt + 1;

    [
        head as u8,
        (sector as u8 & 0x3F) | ((cylinder >> 2) as u8 & 0xC0),
        cylinder as u8,
    ]
}
