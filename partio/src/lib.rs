// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod errors;
pub mod stats;

#[cfg(feature = "alloc")]
mod disk_set;
#[cfg(feature = "alloc")]
mod sparse;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::DiskIO;
    pub use super::DiskIOStructExt;
    pub use super::SectorIO;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "alloc")]
    pub use super::disk_set::DiskSet;
    #[cfg(feature = "alloc")]
    pub use super::sparse::SparseSectorIO;

    #[cfg(feature = "mem")]
    pub use super::mem::MemSectorIO;

    #[cfg(feature = "std")]
    pub use super::std::StdSectorIO;
}

use errors::*;

/// Maximum size of the scratch buffer used by struct reads.
/// 4 KiB covers the largest logical sector size in use.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Single-device IO abstraction.
///
/// Offsets are absolute byte offsets on the device. Implementations may
/// target RAM, image files, block devices, firmware services, etc.
pub trait SectorIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> SectorIOResult;
}

impl<T: SectorIO + ?Sized> SectorIO for &mut T {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        (**self).write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        (**self).flush()
    }
}

/// Multi-device IO: the "read/write byte range on disk N" capability
/// consumed by the partition engine. Disk numbers are OS disk numbers.
pub trait DiskIO {
    fn read_at(&mut self, disk: u32, offset: u64, buf: &mut [u8]) -> SectorIOResult;
    fn write_at(&mut self, disk: u32, offset: u64, data: &[u8]) -> SectorIOResult;
    fn flush(&mut self, disk: u32) -> SectorIOResult;
}

/// Extension trait for reading and writing structs using zerocopy.
pub trait DiskIOStructExt: DiskIO {
    /// Reads a struct of type `T` from `offset` on `disk`.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        disk: u32,
        offset: u64,
    ) -> SectorIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(SectorIOError::Other("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(disk, offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| SectorIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at `offset` on `disk`.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        disk: u32,
        offset: u64,
        val: &T,
    ) -> SectorIOResult {
        self.write_at(disk, offset, val.as_bytes())
    }
}

impl<T: DiskIO + ?Sized> DiskIOStructExt for T {}
