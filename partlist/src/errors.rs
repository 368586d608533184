// SPDX-License-Identifier: MIT

use core::fmt;

use partio::errors::*;

/// Why a partition cannot be created in the selected region.
///
/// Returned by the creation checks instead of a bare boolean so the caller
/// can tell the user exactly what is wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationError {
    /// GPT disks are listed but never edited.
    GptDisk,
    /// The selected entry is a partition, not free space.
    AlreadyPartitioned,
    /// All four primary slots are used (or the disk is a super-floppy).
    PartitionTableFull,
    /// The disk already has an extended partition.
    OnlyOneExtended,
    /// Logical partitions need a free region inside the extended partition.
    NotInsideExtended,
    /// Primary/extended partitions cannot live inside the extended partition.
    InsideExtended,
    /// The region collides with an existing logical partition.
    OverlapsLogical,
    /// The requested size does not fit in the free region.
    InsufficientSpace,
    /// After alignment nothing would be left of the requested size.
    SizeBelowMinimum,
}

impl CreationError {
    pub fn msg(&self) -> &'static str {
        match self {
            CreationError::GptDisk => "GPT disks are not supported",
            CreationError::AlreadyPartitioned => "Selected region is already partitioned",
            CreationError::PartitionTableFull => "Partition table is full",
            CreationError::OnlyOneExtended => "Extended partition already exists",
            CreationError::NotInsideExtended => "Region is not inside the extended partition",
            CreationError::InsideExtended => "Region is inside the extended partition",
            CreationError::OverlapsLogical => "Region overlaps an existing logical partition",
            CreationError::InsufficientSpace => "No free region large enough",
            CreationError::SizeBelowMinimum => "Partition size is below the minimum",
        }
    }
}

impl fmt::Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())
    }
}

/// Unified error type for the partition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartError {
    /// Sector IO failure.
    IO(SectorIOError),
    /// The device behind a disk number cannot be reached.
    DeviceUnavailable(u32),
    /// A table entry does not fit the disk's limits (LBA fields, CHS, size).
    GeometryMismatch(&'static str),
    /// Contract violation such as a zero alignment or divisor.
    InvalidArgument(&'static str),
    /// Lookup miss (disk number, partition number, stale handle).
    NotFound,
    Unsupported,
    Creation(CreationError),
    Invalid(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::IO(e) => e.msg(),
            PartError::DeviceUnavailable(_) => "Device unavailable",
            PartError::GeometryMismatch(msg) => msg,
            PartError::InvalidArgument(msg) => msg,
            PartError::NotFound => "Disk or partition not found",
            PartError::Unsupported => "Unsupported",
            PartError::Creation(e) => e.msg(),
            PartError::Invalid(msg) => msg,
        }
    }

    /// The creation outcome carried by this error, if any.
    pub fn creation(&self) -> Option<CreationError> {
        match self {
            PartError::Creation(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<SectorIOError> for PartError {
    fn from(e: SectorIOError) -> Self {
        match e {
            SectorIOError::DeviceUnavailable(disk) => PartError::DeviceUnavailable(disk),
            other => PartError::IO(other),
        }
    }
}

impl From<CreationError> for PartError {
    fn from(e: CreationError) -> Self {
        PartError::Creation(e)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::IO(e) => write!(f, "IO error: {e}"),
            PartError::DeviceUnavailable(disk) => write!(f, "{} (disk {disk})", self.msg()),
            PartError::GeometryMismatch(msg) => write!(f, "Geometry mismatch: {msg}"),
            PartError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PartError {}

#[cfg(feature = "std")]
impl std::error::Error for CreationError {}

pub type PartResult<T = ()> = Result<T, PartError>;
