// SPDX-License-Identifier: MIT

//! Fixtures shared by the unit tests.

use alloc::string::String;
use alloc::vec::Vec;

use partio::prelude::*;

use crate::disk::{PhysicalDisk, ScsiAddress};
use crate::geometry::DiskGeometry;
use crate::list::{ListOptions, PartitionList};

pub(crate) fn physical(disk_number: u32, geometry: DiskGeometry) -> PhysicalDisk {
    PhysicalDisk {
        disk_number,
        geometry,
        scsi: ScsiAddress {
            port: 0,
            bus: 0,
            id: disk_number as u16,
        },
        driver_name: String::from("test"),
    }
}

/// 261 cylinders x 255 heads x 63 sectors: 4,192,965 sectors.
pub(crate) fn scenario_geometry() -> DiskGeometry {
    DiskGeometry::new(261, 255, 63, 512)
}

/// List over blank (all-zero) disks, numbered from 0.
pub(crate) fn blank_list(geometries: &[DiskGeometry]) -> PartitionList {
    let mut set = DiskSet::new();
    let disks: Vec<PhysicalDisk> = geometries
        .iter()
        .enumerate()
        .map(|(n, g)| {
            set.attach(n as u32, SparseSectorIO::new(512, g.size_bytes()));
            physical(n as u32, *g)
        })
        .collect();
    PartitionList::create(&mut set, &disks, Vec::new(), ListOptions::default())
        .expect("blank list")
}

/// Handle of the first free primary region of `disk`.
pub(crate) fn first_free(list: &PartitionList, disk: usize) -> crate::partition::PartHandle {
    list.disk(disk)
        .and_then(|d| d.primaries().iter().find(|e| e.is_free()))
        .map(|e| e.handle())
        .expect("free region")
}

/// Image whose MBR holds `parts` as `(active, type, start, count)`.
pub(crate) fn image(
    geometry: DiskGeometry,
    signature: u32,
    parts: &[(bool, crate::types::PartitionType, u64, u64)],
) -> SparseSectorIO {
    use crate::mbr::{Mbr, MbrEntry};
    use zerocopy::IntoBytes;

    let mut entries = [MbrEntry::new_empty(); 4];
    for (slot, &(active, ty, start, count)) in parts.iter().enumerate() {
        entries[slot] = MbrEntry::for_range(active, ty, 0, start, count, &geometry).expect("record");
    }
    let mut mbr = Mbr::new_from_entries(entries);
    mbr.set_signature(signature);

    let mut io = SparseSectorIO::new(512, geometry.size_bytes());
    io.write_at(0, mbr.as_bytes()).expect("write mbr");
    io
}

/// List over prepared images, numbered from 0.
pub(crate) fn list_from(
    images: Vec<(DiskGeometry, SparseSectorIO)>,
    bios: Vec<crate::bios::BiosDiskEntry>,
) -> PartitionList {
    let mut set = DiskSet::new();
    let mut disks = Vec::new();
    for (n, (geometry, io)) in images.into_iter().enumerate() {
        set.attach(n as u32, io);
        disks.push(physical(n as u32, geometry));
    }
    PartitionList::create(&mut set, &disks, bios, ListOptions::default()).expect("list")
}
