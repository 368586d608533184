// SPDX-License-Identifier: MIT

//! Firmware disk identities and their correlation with OS disks.

use crate::geometry::DiskGeometry;

/// Legacy CHS geometry as reported by the firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CmDiskGeometry {
    pub bytes_per_sector: u32,
    pub number_of_cylinders: u32,
    pub sectors_per_track: u32,
    pub number_of_heads: u32,
}

impl CmDiskGeometry {
    /// Legacy view of an OS geometry. Cylinders saturate at `u32::MAX`.
    pub fn from_geometry(geometry: &DiskGeometry) -> Self {
        Self {
            bytes_per_sector: geometry.bytes_per_sector,
            number_of_cylinders: u32::try_from(geometry.cylinders).unwrap_or(u32::MAX),
            sectors_per_track: geometry.sectors_per_track,
            number_of_heads: geometry.tracks_per_cylinder,
        }
    }
}

/// INT 13h extended drive parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Int13DriveParameter {
    pub drive_select: u16,
    pub max_cylinders: u32,
    pub sectors_per_track: u16,
    pub max_heads: u16,
    pub number_drives: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosDiskEntry {
    /// Firmware disk number (0 = first BIOS hard disk).
    pub disk_number: u32,
    pub signature: u32,
    pub checksum: u32,
    /// Set once an OS disk has been matched to this entry.
    pub recognized: bool,
    pub geometry: CmDiskGeometry,
    pub int13: Int13DriveParameter,
}

impl BiosDiskEntry {
    /// Entry with its checksum computed from `geometry` and `disk_number`.
    pub fn new(
        disk_number: u32,
        signature: u32,
        geometry: CmDiskGeometry,
        int13: Int13DriveParameter,
    ) -> Self {
        Self {
            disk_number,
            signature,
            checksum: geometry_checksum(&geometry, disk_number),
            recognized: false,
            geometry,
            int13,
        }
    }
}

/// CRC32 over the little-endian cylinders, heads, sectors per track and
/// firmware disk number.
pub fn geometry_checksum(geometry: &CmDiskGeometry, disk_number: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&geometry.number_of_cylinders.to_le_bytes());
    hasher.update(&geometry.number_of_heads.to_le_bytes());
    hasher.update(&geometry.sectors_per_track.to_le_bytes());
    hasher.update(&disk_number.to_le_bytes());
    hasher.finalize()
}

/// Finds the firmware entry for an OS disk and marks it recognized.
///
/// A non-zero signature carried by exactly one unrecognized entry wins.
/// Otherwise the unrecognized entry whose checksum matches the disk's legacy
/// geometry and that entry's disk number is taken, whatever signature it
/// reports.
pub(crate) fn correlate(
    bios: &mut [BiosDiskEntry],
    signature: u32,
    geometry: &DiskGeometry,
) -> Option<u32> {
    let mut matches = bios
        .iter()
        .enumerate()
        .filter(|(_, b)| signature != 0 && !b.recognized && b.signature == signature)
        .map(|(i, _)| i);

    let index = match (matches.next(), matches.next()) {
        (Some(only), None) => only,
        _ => {
            let legacy = CmDiskGeometry::from_geometry(geometry);
            bios.iter()
                .position(|b| !b.recognized && b.checksum == geometry_checksum(&legacy, b.disk_number))?
        }
    };

    let entry = &mut bios[index];
    entry.recognized = true;
    Some(entry.disk_number)
}
