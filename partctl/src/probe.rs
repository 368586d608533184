// SPDX-License-Identifier: MIT

//! File-system recognition from the partition boot sector.

use partio::prelude::*;
use partlist::prelude::*;

const BOOT_SECTOR: usize = 512;

pub struct BootSectorProbe<'a, IO: DiskIO + ?Sized> {
    io: &'a mut IO,
}

impl<'a, IO: DiskIO + ?Sized> BootSectorProbe<'a, IO> {
    pub fn new(io: &'a mut IO) -> Self {
        Self { io }
    }
}

impl<IO: DiskIO + ?Sized> VolumeProbe for BootSectorProbe<'_, IO> {
    fn probe(&mut self, disk_number: u32, offset: u64, length: u64) -> PartResult<Option<VolumeInfo>> {
        if length < BOOT_SECTOR as u64 {
            return Ok(None);
        }
        let mut sector = [0u8; BOOT_SECTOR];
        DiskIO::read_at(&mut *self.io, disk_number, offset, &mut sector)?;
        Ok(recognize(&sector))
    }
}

/// NTFS by OEM id, FAT by the file-system type string of the BPB.
pub fn recognize(sector: &[u8; BOOT_SECTOR]) -> Option<VolumeInfo> {
    if sector[510..] != [0x55, 0xAA] {
        return None;
    }
    if &sector[3..11] == b"NTFS    " {
        return Some(VolumeInfo {
            file_system: "NTFS".into(),
            label: String::new(),
        });
    }
    if &sector[82..87] == b"FAT32" {
        return Some(VolumeInfo {
            file_system: "FAT32".into(),
            label: label(&sector[71..82]),
        });
    }
    if &sector[54..57] == b"FAT" {
        let name = String::from_utf8_lossy(&sector[54..62]).trim_end().to_string();
        return Some(VolumeInfo {
            file_system: name,
            label: label(&sector[43..54]),
        });
    }
    None
}

fn label(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw).trim_end().to_string();
    if text == "NO NAME" { String::new() } else { text }
}
