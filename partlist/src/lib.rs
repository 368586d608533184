// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

//! Partition list engine for MBR disks.
//!
//! Builds an in-memory graph of every disk's primary, extended and logical
//! partitions (plus synthesized free-space regions), lets the installer
//! create, delete and select partitions under MBR layout rules, picks the
//! system partition, and writes dirty disks back through a [`partio::DiskIO`].

extern crate alloc;

#[macro_use]
mod log;
#[macro_use]
mod macros;
mod io_ext;
#[cfg(test)]
mod test_util;

pub mod bios;
pub mod create;
pub mod delete;
pub mod disk;
pub mod errors;
pub mod format;
pub mod geometry;
pub mod list;
pub mod mbr;
pub mod partition;
pub mod persist;
pub mod system;
/// MBR partition type codes and names.
pub mod types;

pub use log::{LogLevel, log_level, set_log_level};

pub mod prelude {
    pub use crate::bios::{BiosDiskEntry, CmDiskGeometry, Int13DriveParameter};
    pub use crate::disk::{DiskEntry, DiskStyle, LayoutKind, LayoutSegment, PhysicalDisk, ScsiAddress};
    pub use crate::errors::*;
    pub use crate::format::{VolumeInfo, VolumeProbe};
    pub use crate::geometry::DiskGeometry;
    pub use crate::list::{Cursor, ListOptions, PartitionList};
    pub use crate::partition::{FormatState, PartEntry, PartHandle, PartId};
    pub use crate::persist::MountedDevices;
    pub use crate::types::PartitionType;
}

pub const DEFAULT_SECTOR_SIZE: u32 = 512;
