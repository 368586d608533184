// SPDX-License-Identifier: MIT

//! Format and file-system check bookkeeping.
//!
//! The engine never formats anything itself: it tracks which partitions
//! still need a format or a check and asks a [`VolumeProbe`] what a
//! partition currently holds.

use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::*;
use crate::list::PartitionList;
use crate::partition::{FormatState, PartEntry, PartHandle};
use crate::types::PartitionType;

/// File system found on a partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeInfo {
    pub file_system: String,
    pub label: String,
}

/// Recognizes the file system at a byte range of a disk.
pub trait VolumeProbe {
    /// `Ok(None)` when the range holds no recognizable file system.
    fn probe(&mut self, disk_number: u32, offset: u64, length: u64) -> PartResult<Option<VolumeInfo>>;
}

impl PartitionList {
    /// First partition, starting at the cursor and wrapping, that is not
    /// formatted yet.
    pub fn next_unformatted_partition(&self) -> Option<PartHandle> {
        self.scan_from_cursor(|e| e.format_state != FormatState::Formatted)
    }

    /// First partition, starting at the cursor and wrapping, that still
    /// needs a file-system check.
    pub fn next_unchecked_partition(&self) -> Option<PartHandle> {
        self.scan_from_cursor(|e| e.needs_check)
    }

    fn scan_from_cursor(&self, wanted: impl Fn(&PartEntry) -> bool) -> Option<PartHandle> {
        let order: Vec<PartHandle> = self
            .navigation_order()
            .into_iter()
            .filter(|h| {
                self.disks[h.disk]
                    .entry(h.id)
                    .is_some_and(|e| !self.disks[h.disk].is_container(e))
            })
            .collect();
        if order.is_empty() {
            return None;
        }

        let start = match (self.cursor.handle(), self.cursor.disk) {
            (Some(h), _) => order.iter().position(|o| *o == h),
            (None, Some(disk)) => order.iter().position(|o| o.disk >= disk),
            (None, None) => None,
        }
        .unwrap_or(0);

        order
            .iter()
            .cycle()
            .skip(start)
            .take(order.len())
            .copied()
            .find(|h| self.entry(*h).is_some_and(&wanted))
    }

    /// Records a completed format: the partition is retyped for
    /// `file_system`, carries it and is due for a check.
    pub fn mark_formatted(&mut self, handle: PartHandle, file_system: &str) -> PartResult {
        let entry = self.entry(handle).ok_or(PartError::NotFound)?;
        if !entry.is_partitioned {
            return Err(PartError::Invalid("free space cannot be formatted"));
        }
        let ty = PartitionType::for_file_system(file_system, entry.start_sector, entry.sector_count);
        self.set_partition_type(handle, ty)?;

        let entry = self.entry_mut(handle).ok_or(PartError::NotFound)?;
        entry.format_state = FormatState::Formatted;
        entry.file_system = String::from(file_system);
        entry.needs_check = true;
        log_verbose!("{handle:?} formatted as {file_system}");
        Ok(())
    }

    pub fn mark_checked(&mut self, handle: PartHandle) -> PartResult {
        let entry = self.entry_mut(handle).ok_or(PartError::NotFound)?;
        entry.needs_check = false;
        Ok(())
    }

    /// Asks `probe` about every partition and updates file system, label and
    /// format state. Probe failures are logged and leave the partition in
    /// [`FormatState::UnknownFormat`].
    pub fn refresh_volume_info(&mut self, probe: &mut dyn VolumeProbe) {
        for disk in &mut self.disks {
            let container = disk.extended;
            let bps = disk.geometry.bytes_per_sector as u64;
            let number = disk.disk_number;
            for e in disk.primaries.iter_mut().chain(disk.logicals.iter_mut()) {
                if !e.is_partitioned || (container == Some(e.id) && !e.logical) {
                    continue;
                }
                let found = if e.partition_type.is_recognized() {
                    probe.probe(
                        number,
                        e.start_sector.saturating_mul(bps),
                        e.sector_count.saturating_mul(bps),
                    )
                } else {
                    Ok(None)
                };
                match found {
                    Ok(Some(info)) => {
                        e.file_system = info.file_system;
                        e.volume_label = info.label;
                        e.format_state = FormatState::Preformatted;
                    }
                    Ok(None) => {
                        e.file_system.clear();
                        e.volume_label.clear();
                        e.format_state = if !e.partition_type.is_recognized() {
                            FormatState::UnknownFormat
                        } else if e.new {
                            FormatState::Unformatted
                        } else {
                            FormatState::UnformattedOrDamaged
                        };
                    }
                    Err(err) => {
                        log_warn!("disk {number}: probe at LBA {} failed: {err}", e.start_sector);
                        e.format_state = FormatState::UnknownFormat;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use alloc::vec;

    /// Reports FAT32 at the listed byte offsets, fails at `broken`.
    struct FakeProbe {
        fat_at: Vec<u64>,
        broken: Option<u64>,
        calls: usize,
    }

    impl VolumeProbe for FakeProbe {
        fn probe(&mut self, _disk: u32, offset: u64, _length: u64) -> PartResult<Option<VolumeInfo>> {
            self.calls += 1;
            if self.broken == Some(offset) {
                return Err(PartError::DeviceUnavailable(0));
            }
            Ok(self.fat_at.contains(&offset).then(|| VolumeInfo {
                file_system: String::from("FAT32"),
                label: String::from("SYSTEM"),
            }))
        }
    }

    fn three_primaries() -> PartitionList {
        let mut list = blank_list(&[scenario_geometry()]);
        for _ in 0..3 {
            let h = first_free(&list, 0);
            list.create_primary_partition(h, 4096, false).unwrap();
        }
        list
    }

    #[test]
    fn unformatted_scan_wraps_around_cursor() {
        let mut list = three_primaries();
        let order = list.navigation_order();
        list.mark_formatted(order[0], "FAT32").unwrap();
        list.mark_formatted(order[2], "FAT32").unwrap();
        list.select(order[2]).unwrap();

        assert_eq!(list.next_unformatted_partition(), Some(order[1]));
        assert_eq!(list.current_partition(), Some(order[2]));

        list.mark_formatted(order[1], "NTFS").unwrap();
        assert_eq!(list.next_unformatted_partition(), None);
    }

    #[test]
    fn scan_includes_cursor_entry() {
        let mut list = three_primaries();
        let order = list.navigation_order();
        list.select(order[1]).unwrap();
        assert_eq!(list.next_unformatted_partition(), Some(order[1]));
    }

    #[test]
    fn check_follows_format() {
        let mut list = three_primaries();
        let order = list.navigation_order();
        assert_eq!(list.next_unchecked_partition(), None);

        list.mark_formatted(order[1], "FAT32").unwrap();
        let e = list.entry(order[1]).unwrap();
        assert_eq!(e.format_state, FormatState::Formatted);
        assert_eq!(e.file_system, "FAT32");
        assert_eq!(list.next_unchecked_partition(), Some(order[1]));

        list.mark_checked(order[1]).unwrap();
        assert_eq!(list.next_unchecked_partition(), None);
    }

    #[test]
    fn container_is_never_returned() {
        let mut list = blank_list(&[scenario_geometry()]);
        let ext = list.create_extended_partition(first_free(&list, 0), 1 << 20).unwrap();
        list.select(ext).unwrap();
        assert_eq!(list.next_unformatted_partition(), None);

        let region = list.disk(0).unwrap().logicals()[0].handle();
        let logical = list.create_logical_partition(region, 4096, false).unwrap();
        assert_eq!(list.next_unformatted_partition(), Some(logical));
    }

    #[test]
    fn format_retypes_the_partition() {
        let mut list = three_primaries();
        let order = list.navigation_order();
        list.mark_formatted(order[0], "NTFS").unwrap();
        list.mark_formatted(order[1], "FAT32").unwrap();

        assert_eq!(list.entry(order[0]).unwrap().partition_type, PartitionType::Ntfs);
        assert_eq!(list.entry(order[1]).unwrap().partition_type, PartitionType::Fat32);
        assert!(list.disk(0).unwrap().dirty);
    }

    #[test]
    fn container_cannot_be_marked() {
        let mut list = blank_list(&[scenario_geometry()]);
        let ext = list.create_extended_partition(first_free(&list, 0), 1 << 20).unwrap();
        assert!(list.mark_formatted(ext, "FAT").is_err());
        assert_eq!(list.entry(ext).unwrap().format_state, FormatState::Unformatted);
    }

    #[test]
    fn free_space_cannot_be_marked() {
        let mut list = blank_list(&[scenario_geometry()]);
        let free = first_free(&list, 0);
        assert!(matches!(list.mark_formatted(free, "FAT"), Err(PartError::Invalid(_))));
    }

    #[test]
    fn probe_results_set_format_state() {
        let g = scenario_geometry();
        let io = image(
            g,
            0x77,
            &[
                (true, PartitionType::Fat32, 2048, 100_000),
                (false, PartitionType::Ntfs, 200_000, 100_000),
                (false, PartitionType::Linux, 400_000, 100_000),
                (false, PartitionType::Fat16, 600_000, 100_000),
            ],
        );
        let mut list = list_from(vec![(g, io)], vec![]);
        let mut probe = FakeProbe {
            fat_at: vec![2048 * 512],
            broken: Some(600_000 * 512),
            calls: 0,
        };
        list.refresh_volume_info(&mut probe);
        assert_eq!(probe.calls, 3);

        let states: Vec<(FormatState, String)> = list
            .disk(0)
            .unwrap()
            .partitions()
            .map(|e| (e.format_state, e.file_system.clone()))
            .collect();
        assert_eq!(
            states,
            vec![
                (FormatState::Preformatted, String::from("FAT32")),
                (FormatState::UnformattedOrDamaged, String::new()),
                (FormatState::UnknownFormat, String::new()),
                (FormatState::UnknownFormat, String::new()),
            ]
        );
    }

    #[test]
    fn new_partition_without_file_system_is_unformatted() {
        let mut list = blank_list(&[scenario_geometry()]);
        let h = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
        let mut probe = FakeProbe {
            fat_at: vec![],
            broken: None,
            calls: 0,
        };
        list.refresh_volume_info(&mut probe);
        assert_eq!(list.entry(h).unwrap().format_state, FormatState::Unformatted);
    }
}
