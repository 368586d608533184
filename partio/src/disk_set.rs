// SPDX-License-Identifier: MIT

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::{DiskIO, SectorIO, SectorIOError, SectorIOResult};

/// Routes OS disk numbers to per-device [`SectorIO`] backends.
///
/// Unknown disk numbers fail with [`SectorIOError::DeviceUnavailable`].
pub struct DiskSet<'a> {
    devices: Vec<(u32, Box<dyn SectorIO + 'a>)>,
}

impl<'a> DiskSet<'a> {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Registers `io` as disk `disk`, replacing a previous registration.
    pub fn attach<IO: SectorIO + 'a>(&mut self, disk: u32, io: IO) -> &mut Self {
        self.detach(disk);
        self.devices.push((disk, Box::new(io)));
        self
    }

    /// Removes disk `disk`. Returns `true` if it was registered.
    pub fn detach(&mut self, disk: u32) -> bool {
        let before = self.devices.len();
        self.devices.retain(|(n, _)| *n != disk);
        before != self.devices.len()
    }

    pub fn contains(&self, disk: u32) -> bool {
        self.devices.iter().any(|(n, _)| *n == disk)
    }

    pub fn disk_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.devices.iter().map(|(n, _)| *n)
    }

    fn device(&mut self, disk: u32) -> SectorIOResult<&mut (dyn SectorIO + 'a)> {
        self.devices
            .iter_mut()
            .find(|(n, _)| *n == disk)
            .map(|(_, io)| io.as_mut())
            .ok_or(SectorIOError::DeviceUnavailable(disk))
    }
}

impl Default for DiskSet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskIO for DiskSet<'_> {
    #[inline]
    fn read_at(&mut self, disk: u32, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        self.device(disk)?.read_at(offset, buf)
    }

    #[inline]
    fn write_at(&mut self, disk: u32, offset: u64, data: &[u8]) -> SectorIOResult {
        self.device(disk)?.write_at(offset, data)
    }

    #[inline]
    fn flush(&mut self, disk: u32) -> SectorIOResult {
        self.device(disk)?.flush()
    }
}
