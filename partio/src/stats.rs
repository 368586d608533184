// SPDX-License-Identifier: MIT

use crate::{DiskIO, SectorIOResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    /// Disk number of the last write, if any.
    pub last_write_disk: Option<u32>,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper over a [`DiskIO`].
///
/// An optional `only_disk` filter restricts counting to one disk number.
pub struct IOCounter<'a, IO: DiskIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
    pub only_disk: Option<u32>,
}

impl<'a, IO: DiskIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
            only_disk: None,
        }
    }

    #[inline]
    pub fn for_disk(inner: &'a mut IO, disk: u32) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
            only_disk: Some(disk),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn counts(&self, disk: u32) -> bool {
        self.only_disk.is_none_or(|d| d == disk)
    }
}

impl<IO: DiskIO + ?Sized> DiskIO for IOCounter<'_, IO> {
    #[inline]
    fn read_at(&mut self, disk: u32, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        if self.counts(disk) {
            self.stats.reads += 1;
            self.stats.read_bytes += buf.len() as u64;
        }
        self.inner.read_at(disk, offset, buf)
    }

    #[inline]
    fn write_at(&mut self, disk: u32, offset: u64, data: &[u8]) -> SectorIOResult {
        if self.counts(disk) {
            self.stats.writes += 1;
            self.stats.write_bytes += data.len() as u64;
            self.stats.last_write_disk = Some(disk);
        }
        self.inner.write_at(disk, offset, data)
    }

    #[inline]
    fn flush(&mut self, disk: u32) -> SectorIOResult {
        if self.counts(disk) {
            self.stats.flushes += 1;
        }
        self.inner.flush(disk)
    }
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn counts_only_selected_disk() {
        let mut set = DiskSet::new();
        set.attach(0, SparseSectorIO::new(512, 8192));
        set.attach(1, SparseSectorIO::new(512, 8192));

        let mut counter = IOCounter::for_disk(&mut set, 1);
        counter.write_at(0, 0, &[1; 512]).unwrap();
        counter.write_at(1, 512, &[2; 512]).unwrap();
        let mut buf = [0u8; 16];
        counter.read_at(1, 0, &mut buf).unwrap();
        counter.flush(1).unwrap();

        let stats = counter.snapshot();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.write_bytes, 512);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.last_write_disk, Some(1));
    }
}
