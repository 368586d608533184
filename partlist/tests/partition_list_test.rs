// SPDX-License-Identifier: MIT

use partio::prelude::*;
use partlist::mbr::{Mbr, MbrEntry};
use partlist::prelude::*;
use zerocopy::IntoBytes;

const SCENARIO_SECTORS: u64 = 4_192_965;

fn scenario() -> DiskGeometry {
    DiskGeometry::new(261, 255, 63, 512)
}

fn physical(n: u32, geometry: DiskGeometry) -> PhysicalDisk {
    PhysicalDisk {
        disk_number: n,
        geometry,
        scsi: ScsiAddress { port: 0, bus: 0, id: n as u16 },
        driver_name: "atapi".to_string(),
    }
}

fn blank(geometry: DiskGeometry) -> SparseSectorIO {
    SparseSectorIO::new(512, geometry.size_bytes())
}

fn list_over(set: &mut DiskSet, geometries: &[DiskGeometry], bios: Vec<BiosDiskEntry>) -> PartitionList {
    let disks: Vec<PhysicalDisk> = geometries
        .iter()
        .enumerate()
        .map(|(n, g)| physical(n as u32, *g))
        .collect();
    PartitionList::create(set, &disks, bios, ListOptions::default()).expect("list")
}

fn first_free(list: &PartitionList, disk: usize) -> PartHandle {
    list.disk(disk)
        .and_then(|d| d.primaries().iter().find(|e| e.is_free()))
        .map(PartEntry::handle)
        .expect("free region")
}

fn first_free_logical(list: &PartitionList, disk: usize) -> PartHandle {
    list.disk(disk)
        .and_then(|d| d.logicals().iter().find(|e| e.is_free()))
        .map(PartEntry::handle)
        .expect("free logical region")
}

/// Primary at 2048, extended of 1 GiB behind it, one logical inside.
fn build_scenario(list: &mut PartitionList) -> (PartHandle, PartHandle, PartHandle) {
    let primary = list.create_primary_partition(first_free(list, 0), 2048, false).unwrap();
    let extended = list.create_extended_partition(first_free(list, 0), 2_097_152).unwrap();
    let logical = list
        .create_logical_partition(first_free_logical(list, 0), 1024, false)
        .unwrap();
    (primary, extended, logical)
}

#[test]
fn scenario_layout() {
    let g = scenario();
    assert_eq!(g.sector_count(), SCENARIO_SECTORS);
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);
    let (primary, extended, logical) = build_scenario(&mut list);

    let p = list.entry(primary).unwrap();
    assert_eq!((p.start_sector, p.end_sector()), (2048, 4096));
    let e = list.entry(extended).unwrap();
    assert_eq!((e.start_sector, e.sector_count), (4096, 2_097_152));
    assert_eq!(e.partition_type, PartitionType::Extended);
    let l = list.entry(logical).unwrap();
    assert_eq!((l.start_sector, l.sector_count, l.hidden_sectors), (16_384, 1024, 12_288));

    assert_eq!(p.drive_letter, Some('C'));
    assert_eq!(l.drive_letter, Some('D'));
    assert_eq!(e.drive_letter, None);
    assert_eq!((p.on_disk_partition_number, l.on_disk_partition_number), (1, 2));

    let rest = first_free(&list, 0);
    assert_eq!(
        list.extended_partition_creation_checks(rest, 0),
        Err(PartError::Creation(CreationError::OnlyOneExtended))
    );
    assert_eq!(
        list.create_extended_partition(rest, 0).unwrap_err().creation(),
        Some(CreationError::OnlyOneExtended)
    );
}

#[test]
fn scenario_bytes_on_disk() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);
    build_scenario(&mut list);
    list.write_partitions_to_disk(&mut set).unwrap();

    let mut sector = [0u8; 512];
    DiskIO::read_at(&mut set, 0, 0, &mut sector).unwrap();
    assert_eq!(&sector[510..], &[0x55, 0xAA]);
    let slot = |n: usize| &sector[446 + 16 * n..446 + 16 * (n + 1)];
    assert_eq!(slot(0)[4], PartitionType::Fat12.as_byte());
    assert_eq!(u32::from_le_bytes(slot(0)[8..12].try_into().unwrap()), 2048);
    assert_eq!(slot(1)[4], 0x05);
    assert_eq!(u32::from_le_bytes(slot(1)[8..12].try_into().unwrap()), 4096);
    assert_eq!(u32::from_le_bytes(slot(1)[12..16].try_into().unwrap()), 2_097_152);
    assert!(slot(2).iter().chain(slot(3)).all(|b| *b == 0));

    let ebr: Mbr = set.read_struct(0, 4096 * 512).unwrap();
    assert!(ebr.has_valid_magic());
    let [data, link, ..] = ebr.aligned_entries();
    assert_eq!((data.start_lba, data.sectors), (12_288, 1024));
    assert!(link.is_empty());
}

#[test]
fn write_then_reload_round_trips() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);
    build_scenario(&mut list);
    let second = first_free_logical(&list, 0);
    list.create_logical_partition(second, 8192, false).unwrap();
    list.write_partitions_to_disk(&mut set).unwrap();

    let reloaded = list_over(&mut set, &[g], vec![]);
    let shape = |l: &PartitionList| -> Vec<(u64, u64, u8, bool)> {
        l.disk(0)
            .unwrap()
            .entries()
            .filter(|e| e.is_partitioned)
            .map(|e| (e.start_sector, e.sector_count, e.partition_type.as_byte(), e.logical))
            .collect()
    };
    assert_eq!(shape(&reloaded), shape(&list));
    assert_eq!(reloaded.disk(0).unwrap().signature, list.disk(0).unwrap().signature);
    assert_eq!(
        reloaded.disk(0).unwrap().build_mbr().unwrap().as_bytes(),
        list.disk(0).unwrap().build_mbr().unwrap().as_bytes()
    );
    assert!(!reloaded.disk(0).unwrap().dirty);
}

/// Table whose slots are not in start order, one empty slot, and a
/// two-entry logical chain.
fn hand_built_disk(g: DiskGeometry) -> (SparseSectorIO, Mbr, [(u64, Mbr); 2]) {
    let record = |boot, ty, base, start, count| MbrEntry::for_range(boot, ty, base, start, count, &g).unwrap();
    let mut mbr = Mbr::new_from_entries([
        record(false, PartitionType::Linux, 0, 204_800, 102_400),
        record(true, PartitionType::Fat32, 0, 2048, 100_352),
        MbrEntry::new_empty(),
        record(false, PartitionType::Extended, 0, 409_600, 1_048_576),
    ]);
    for (i, b) in mbr.boot_code.iter_mut().enumerate() {
        *b = i as u8;
    }
    mbr.reserved = [0x5A, 0xA5];
    mbr.set_signature(0xDEAD_BEEF);

    let chain = [
        (
            409_600,
            Mbr::new_ebr(
                record(false, PartitionType::Ntfs, 409_600, 63, 200_000),
                record(false, PartitionType::Extended, 409_600, 204_800, 300_063),
            ),
        ),
        (
            614_400,
            Mbr::new_ebr(record(false, PartitionType::Fat32, 614_400, 63, 300_000), MbrEntry::new_empty()),
        ),
    ];

    let mut io = blank(g);
    io.write_at(0, mbr.as_bytes()).unwrap();
    for (lba, ebr) in &chain {
        io.write_at(lba * 512, ebr.as_bytes()).unwrap();
    }
    (io, mbr, chain)
}

#[test]
fn loaded_tables_encode_to_the_same_bytes() {
    let g = scenario();
    let (io, mbr, chain) = hand_built_disk(g);
    let mut set = DiskSet::new();
    set.attach(0, io);
    let list = list_over(&mut set, &[g], vec![]);
    let disk = list.disk(0).unwrap();
    assert_eq!(disk.logicals().iter().filter(|e| e.is_partitioned).count(), 2);

    assert_eq!(disk.build_mbr().unwrap().as_bytes(), mbr.as_bytes());
    let rebuilt = disk.build_ebr_chain().unwrap();
    assert_eq!(rebuilt.len(), chain.len());
    for ((lba, ebr), (want_lba, want)) in rebuilt.iter().zip(chain.iter()) {
        assert_eq!(lba, want_lba);
        assert_eq!(ebr.as_bytes(), want.as_bytes());
    }
}

#[test]
fn new_primary_takes_the_free_slot() {
    let g = scenario();
    let (io, mbr, _) = hand_built_disk(g);
    let mut set = DiskSet::new();
    set.attach(0, io);
    let mut list = list_over(&mut set, &[g], vec![]);

    // gap between FAT32 and Linux
    let free = list
        .disk(0)
        .unwrap()
        .primaries()
        .iter()
        .find(|e| e.is_free() && e.start_sector < 204_800)
        .map(PartEntry::handle)
        .unwrap();
    let h = list.create_primary_partition(free, 0, false).unwrap();
    list.write_partitions_to_disk(&mut set).unwrap();

    let written: Mbr = set.read_struct(0, 0).unwrap();
    let before = mbr.aligned_entries();
    let after = written.aligned_entries();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
    assert_eq!(after[3], before[3]);
    assert_eq!(after[2].start_lba as u64, list.entry(h).unwrap().start_sector);
    assert_eq!(list.entry(h).unwrap().table_slot, Some(2));
}

#[test]
fn boot_code_survives_rewrite() {
    let g = scenario();
    let mut mbr = Mbr::new_from_entries([MbrEntry::new_empty(); 4]);
    mbr.boot_code[..4].copy_from_slice(&[0xFA, 0x33, 0xC0, 0x8E]);
    mbr.set_signature(0x1234_5678);
    let mut io = blank(g);
    io.write_at(0, mbr.as_bytes()).unwrap();

    let mut set = DiskSet::new();
    set.attach(0, io);
    let mut list = list_over(&mut set, &[g], vec![]);
    list.create_primary_partition(first_free(&list, 0), 0, false).unwrap();
    list.write_partitions(&mut set, 0).unwrap();

    let written: Mbr = set.read_struct(0, 0).unwrap();
    assert_eq!(&written.boot_code[..4], &[0xFA, 0x33, 0xC0, 0x8E]);
    assert_eq!(written.signature(), 0x1234_5678);
}

#[test]
fn small_track_geometry_alignment() {
    let g = DiskGeometry::new(1024, 64, 32, 512);
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);

    let disk = list.disk(0).unwrap();
    assert_eq!((disk.sector_alignment, disk.cylinder_alignment), (32, 2048));
    assert_eq!(disk.first_usable, 2048);

    let p = list.create_primary_partition(first_free(&list, 0), 1000, false).unwrap();
    let p = list.entry(p).unwrap();
    assert_eq!((p.start_sector, p.sector_count), (2048, 992));

    list.create_extended_partition(first_free(&list, 0), 100_000).unwrap();
    for _ in 0..3 {
        let region = first_free_logical(&list, 0);
        let h = list.create_logical_partition(region, 3000, false).unwrap();
        let l = list.entry(h).unwrap();
        assert_eq!(l.start_sector % 2048, 0);
        assert_eq!(l.end_sector() % 32, 0);
    }
}

#[test]
fn layout_tiles_the_disk() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);
    build_scenario(&mut list);
    let a = list.create_logical_partition(first_free_logical(&list, 0), 4096, false).unwrap();
    list.create_logical_partition(first_free_logical(&list, 0), 4096, false).unwrap();
    list.delete_partition(a).unwrap();

    let layout = list.disk(0).unwrap().layout();
    let mut cursor = 0;
    for segment in &layout {
        assert_eq!(segment.start, cursor, "gap or overlap at {cursor}");
        assert!(segment.count > 0);
        cursor = segment.end();
    }
    assert_eq!(cursor, SCENARIO_SECTORS);
    assert_eq!(layout[0].kind, LayoutKind::Reserved);
    assert!(layout.iter().any(|s| s.kind == LayoutKind::BootRecord));
}

#[test]
fn free_space_never_adjacent() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g));
    let mut list = list_over(&mut set, &[g], vec![]);

    let handles: Vec<PartHandle> = (0..3)
        .map(|_| list.create_primary_partition(first_free(&list, 0), 50_000, false).unwrap())
        .collect();
    for h in [handles[1], handles[0], handles[2]] {
        list.delete_partition(h).unwrap();
        let disk = list.disk(0).unwrap();
        for pair in disk.primaries().windows(2) {
            assert!(!(pair[0].is_free() && pair[1].is_free()));
        }
    }
    assert_eq!(list.disk(0).unwrap().primaries().len(), 1);
}

#[test]
fn navigation_wraps_across_disks() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g)).attach(1, blank(g));
    let mut list = list_over(&mut set, &[g, g], vec![]);
    let a = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
    let b = list.create_primary_partition(first_free(&list, 1), 4096, false).unwrap();

    assert_eq!(list.next_partition(), Some(a));
    assert_eq!(list.next_partition(), Some(b));
    assert_eq!(list.next_partition(), Some(a));
    assert_eq!(list.prev_partition(), Some(b));
    assert_eq!(list.cursor().disk, Some(1));
}

#[test]
fn failing_disk_stays_dirty() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g)).attach(1, blank(g));
    let mut list = list_over(&mut set, &[g, g], vec![]);
    list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
    list.create_primary_partition(first_free(&list, 1), 4096, false).unwrap();

    assert!(set.detach(1));
    assert_eq!(
        list.write_partitions_to_disk(&mut set),
        Err(PartError::DeviceUnavailable(1))
    );
    assert!(!list.disk(0).unwrap().dirty);
    assert!(list.disk(1).unwrap().dirty);

    let committed: Mbr = set.read_struct(0, 0).unwrap();
    assert!(committed.has_valid_magic());
}

#[test]
fn clean_disks_are_not_written() {
    let g = scenario();
    let mut set = DiskSet::new();
    set.attach(0, blank(g)).attach(1, blank(g));
    let mut list = list_over(&mut set, &[g, g], vec![]);
    list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();

    let mut counter = IOCounter::for_disk(&mut set, 1);
    list.write_partitions_to_disk(&mut counter).unwrap();
    assert_eq!(counter.snapshot().writes, 0);
    assert_eq!(counter.snapshot().flushes, 0);

    let mut counter = IOCounter::for_disk(&mut set, 0);
    list.write_partitions_to_disk(&mut counter).unwrap();
    assert_eq!(counter.snapshot().writes, 0);
}

#[test]
fn firmware_disks_correlate_by_signature() {
    let g = scenario();
    let mut first = Mbr::new_from_entries([MbrEntry::new_empty(); 4]);
    first.set_signature(0xCAFE);
    let mut io = blank(g);
    io.write_at(0, first.as_bytes()).unwrap();

    let legacy = CmDiskGeometry::from_geometry(&g);
    let bios = vec![
        BiosDiskEntry::new(0x80, 0, legacy, Int13DriveParameter::default()),
        BiosDiskEntry::new(0x81, 0xCAFE, legacy, Int13DriveParameter::default()),
    ];
    let mut set = DiskSet::new();
    set.attach(0, io).attach(1, blank(g));
    let list = list_over(&mut set, &[g, g], bios);

    assert_eq!(list.disk(0).unwrap().bios_disk_number, Some(0x81));
    assert_eq!(list.disk(1).unwrap().bios_disk_number, Some(0x80));
    assert_eq!(list.disk_by_bios_number(0x81).map(|d| d.index), Some(0));
    assert!(list.bios_disks().iter().all(|b| b.recognized));
    assert_eq!(list.system_disk(), Some(1));
}

#[test]
fn image_file_backend() {
    let g = DiskGeometry::new(64, 16, 63, 512);
    let file = tempfile::tempfile().unwrap();
    file.set_len(g.size_bytes()).unwrap();

    let mut set = DiskSet::new();
    set.attach(0, StdSectorIO::new(file));
    let mut list = list_over(&mut set, &[g], vec![]);
    let h = list.check_active_system_partition().unwrap().unwrap();
    assert!(list.entry(h).unwrap().auto_create);
    list.write_partitions_to_disk(&mut set).unwrap();

    let reloaded = list_over(&mut set, &[g], vec![]);
    let disk = reloaded.disk(0).unwrap();
    assert_eq!(disk.style, DiskStyle::Mbr);
    let p = disk.partitions().next().unwrap();
    assert!(p.boot_indicator);
    assert_eq!(p.drive_letter, Some('C'));
}

#[test]
fn ram_backend_holds_written_tables() {
    let g = DiskGeometry::new(8, 16, 63, 512);
    let mut ram = vec![0u8; g.size_bytes() as usize];
    let (start, ty) = {
        let mut set = DiskSet::new();
        set.attach(0, MemSectorIO::new(&mut ram));
        let mut list = list_over(&mut set, &[g], vec![]);
        let free = first_free(&list, 0);
        let h = list.create_primary_partition(free, 0, false).unwrap();
        list.write_partitions_to_disk(&mut set).unwrap();
        let e = list.entry(h).unwrap();
        (e.start_sector, e.partition_type)
    };

    assert_eq!(&ram[510..512], &[0x55, 0xAA]);
    let signature = u32::from_le_bytes(ram[0x1B8..0x1BC].try_into().unwrap());
    assert_ne!(signature, 0);
    assert_eq!(ram[0x1BE + 4], ty.as_byte());
    let lba = u32::from_le_bytes(ram[0x1BE + 8..0x1BE + 12].try_into().unwrap());
    assert_eq!(lba as u64, start);
}
