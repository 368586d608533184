// SPDX-License-Identifier: MIT

use crate::errors::*;
use crate::list::PartitionList;
use crate::partition::PartHandle;

impl PartitionList {
    /// Removes a partition. The freed range (the EBR area of a logical
    /// partition included) merges with neighbouring free space; deleting
    /// the container drops all of its logical partitions.
    pub fn delete_partition(&mut self, handle: PartHandle) -> PartResult {
        let disk = self.disks.get_mut(handle.disk).ok_or(PartError::NotFound)?;
        let entry = disk.entry(handle.id).ok_or(PartError::NotFound)?;
        if entry.is_free() {
            return Err(PartError::Invalid("cannot delete free space"));
        }
        let is_container = disk.is_container(entry);

        if is_container {
            disk.logicals.clear();
            disk.extended = None;
        }
        if let Some(removed) = disk.remove_entry(handle.id) {
            log_info!(
                "disk {}: deleted {} at {}, {} sectors",
                disk.disk_number,
                removed.partition_type,
                removed.start_sector,
                removed.sector_count
            );
        }
        disk.dirty = true;
        disk.refresh_free_space()?;

        self.after_change(handle.disk);
        Ok(())
    }

    pub fn delete_current_partition(&mut self) -> PartResult {
        let handle = self.cursor.handle().ok_or(PartError::NotFound)?;
        self.delete_partition(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn delete_merges_with_both_neighbours() {
        let mut list = blank_list(&[scenario_geometry()]);
        let a = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
        let b = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
        let c = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
        list.delete_partition(a).unwrap();
        list.delete_partition(c).unwrap();

        // free | b | free
        let disk = list.disk(0).unwrap();
        assert_eq!(disk.primaries().len(), 3);

        list.delete_partition(b).unwrap();
        let disk = list.disk(0).unwrap();
        assert_eq!(disk.primaries().len(), 1);
        let free = &disk.primaries()[0];
        assert!(free.is_free());
        assert_eq!(free.start_sector, disk.first_usable);
        assert!(list.entry(b).is_none());
    }

    #[test]
    fn deleting_container_drops_logicals() {
        let mut list = blank_list(&[scenario_geometry()]);
        let ext = list.create_extended_partition(first_free(&list, 0), 1 << 20).unwrap();
        let region = list.disk(0).unwrap().logicals()[0].handle();
        let logical = list.create_logical_partition(region, 8192, false).unwrap();

        list.delete_partition(ext).unwrap();
        let disk = list.disk(0).unwrap();
        assert!(disk.extended_id().is_none());
        assert!(disk.logicals().is_empty());
        assert!(list.entry(logical).is_none());
        assert_eq!(disk.primaries().len(), 1);
    }

    #[test]
    fn deleting_logical_frees_ebr_area() {
        let mut list = blank_list(&[scenario_geometry()]);
        list.create_extended_partition(first_free(&list, 0), 1 << 20).unwrap();
        let region = list.disk(0).unwrap().logicals()[0].handle();
        let logical = list.create_logical_partition(region, 8192, false).unwrap();

        list.delete_partition(logical).unwrap();
        let disk = list.disk(0).unwrap();
        let container = disk.extended_entry().unwrap();
        assert_eq!(disk.logicals().len(), 1);
        assert_eq!(disk.logicals()[0].start_sector, container.start_sector);
        assert_eq!(disk.logicals()[0].end_sector(), container.end_sector());
    }

    #[test]
    fn markers_cleared_on_delete() {
        let mut list = blank_list(&[scenario_geometry()]);
        let h = list.create_primary_partition(first_free(&list, 0), 4096, false).unwrap();
        list.select(h).unwrap();
        list.system_partition = Some(h);
        list.original_system_partition = Some(h);

        list.delete_current_partition().unwrap();
        assert_eq!(list.current_partition(), None);
        assert_eq!(list.cursor().disk, Some(0));
        assert_eq!(list.system_partition(), None);
        assert_eq!(list.original_system_partition(), None);
        assert!(list.disk(0).unwrap().dirty);

        assert_eq!(list.delete_current_partition(), Err(PartError::NotFound));
    }

    #[test]
    fn free_space_cannot_be_deleted() {
        let mut list = blank_list(&[scenario_geometry()]);
        let free = first_free(&list, 0);
        assert!(matches!(list.delete_partition(free), Err(PartError::Invalid(_))));
        assert!(!list.disk(0).unwrap().dirty);
    }
}
