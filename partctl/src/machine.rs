// SPDX-License-Identifier: MIT

//! Opens the image files of a machine description and builds its
//! partition list.

use std::fs::OpenOptions;

use partio::prelude::*;
use partlist::prelude::*;

use crate::config::MachineConfig;

pub struct Machine {
    pub config: MachineConfig,
    pub io: DiskSet<'static>,
    pub list: PartitionList,
}

impl Machine {
    /// Images that cannot be opened are left out; the engine then skips
    /// their disk.
    pub fn open(config: MachineConfig, writable: bool) -> anyhow::Result<Self> {
        let mut io = DiskSet::new();
        for disk in &config.disks {
            let path = config.image_path(disk);
            let file = match OpenOptions::new().read(true).write(writable).open(&path) {
                Ok(file) => file,
                Err(e) => {
                    crate::log_info!("disk {}: cannot open {}: {e}", disk.number, path.display());
                    continue;
                }
            };

            let expected = config.geometry(disk).size_bytes();
            let actual = file.metadata()?.len();
            if actual < expected {
                crate::log_info!(
                    "disk {}: {} holds {actual} bytes, geometry needs {expected}",
                    disk.number,
                    path.display()
                );
            }
            crate::log_verbose!("disk {} -> {}", disk.number, path.display());
            io.attach(disk.number, StdSectorIO::new(file));
        }

        let list = PartitionList::create(
            &mut io,
            &config.physical_disks(),
            config.bios_disks(),
            config.list_options(),
        )?;
        Ok(Self { config, io, list })
    }

    /// List index of the OS disk `number`.
    pub fn disk_index(&self, number: u32) -> anyhow::Result<usize> {
        self.list
            .disk_by_number(number)
            .map(|d| d.index)
            .ok_or_else(|| anyhow::anyhow!("disk {number} is not in the partition list"))
    }

    /// Free region of `disk` holding `at`, or the first one.
    pub fn free_region(&self, disk: usize, logical: bool, at: Option<u64>) -> anyhow::Result<PartHandle> {
        let d = self
            .list
            .disk(disk)
            .ok_or_else(|| anyhow::anyhow!("no disk at index {disk}"))?;
        let seq = if logical { d.logicals() } else { d.primaries() };
        seq.iter()
            .filter(|e| e.is_free())
            .find(|e| at.is_none_or(|lba| lba >= e.start_sector && lba < e.end_sector()))
            .map(PartEntry::handle)
            .ok_or_else(|| match at {
                Some(lba) => anyhow::anyhow!("no free region holds LBA {lba} on disk {}", d.disk_number),
                None => anyhow::anyhow!("disk {} has no free region", d.disk_number),
            })
    }

    /// Sectors for a byte size on `disk`, rounded up. 0 means the whole region.
    pub fn sectors(&self, disk: usize, bytes: u64) -> u64 {
        let bps = self
            .list
            .disk(disk)
            .map(|d| d.geometry.bytes_per_sector as u64)
            .unwrap_or(partlist::DEFAULT_SECTOR_SIZE as u64);
        bytes.div_ceil(bps)
    }

    /// Commits every modified disk.
    pub fn commit(&mut self) -> anyhow::Result<()> {
        let dirty: Vec<u32> = self
            .list
            .disks()
            .iter()
            .filter(|d| d.dirty)
            .map(|d| d.disk_number)
            .collect();
        if dirty.is_empty() {
            crate::log_info!("Nothing to write.");
            return Ok(());
        }
        self.list.write_partitions_to_disk(&mut self.io)?;
        crate::log_info!("Partition tables written to disk(s) {dirty:?}");
        Ok(())
    }
}
