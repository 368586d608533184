// SPDX-License-Identifier: MIT

define_partition_types! {
    Empty => "Empty", 0x00,
    Fat12 => "FAT12", 0x01,
    XenixRoot => "XENIX root", 0x02,
    XenixUsr => "XENIX usr", 0x03,
    Fat16Small => "FAT16 (< 32 MB)", 0x04,
    Extended => "Extended", 0x05,
    Fat16 => "FAT16", 0x06,
    Ntfs => "NTFS / exFAT / HPFS", 0x07,
    Aix => "AIX", 0x08,
    AixBoot => "AIX bootable", 0x09,
    Os2BootManager => "OS/2 Boot Manager", 0x0A,
    Fat32 => "FAT32", 0x0B,
    Fat32Lba => "FAT32 (LBA)", 0x0C,
    Fat16Lba => "FAT16 (LBA)", 0x0E,
    ExtendedLba => "Extended (LBA)", 0x0F,
    Opus => "OPUS", 0x10,
    HiddenFat12 => "Hidden FAT12", 0x11,
    CompaqDiagnostics => "Compaq diagnostics", 0x12,
    HiddenFat16Small => "Hidden FAT16 (< 32 MB)", 0x14,
    HiddenFat16 => "Hidden FAT16", 0x16,
    HiddenNtfs => "Hidden NTFS / HPFS", 0x17,
    AstSmartSleep => "AST SmartSleep", 0x18,
    HiddenFat32 => "Hidden FAT32", 0x1B,
    HiddenFat32Lba => "Hidden FAT32 (LBA)", 0x1C,
    HiddenFat16Lba => "Hidden FAT16 (LBA)", 0x1E,
    NecDos => "NEC DOS", 0x24,
    WindowsRecovery => "Windows recovery environment", 0x27,
    Plan9 => "Plan 9", 0x39,
    PartitionMagic => "PartitionMagic recovery", 0x3C,
    Venix => "Venix 80286", 0x40,
    PpcPrep => "PPC PReP boot", 0x41,
    WindowsDynamic => "Windows dynamic volume", 0x42,
    Qnx4 => "QNX4.x", 0x4D,
    Qnx4Second => "QNX4.x 2nd part", 0x4E,
    Qnx4Third => "QNX4.x 3rd part", 0x4F,
    OnTrackDm => "OnTrack DM", 0x50,
    OnTrackDm6Aux1 => "OnTrack DM6 Aux1", 0x51,
    Cpm => "CP/M", 0x52,
    OnTrackDm6Aux3 => "OnTrack DM6 Aux3", 0x53,
    OnTrackDm6 => "OnTrack DM6", 0x54,
    EzDrive => "EZ-Drive", 0x55,
    GoldenBow => "Golden Bow", 0x56,
    PriamEdisk => "Priam Edisk", 0x5C,
    SpeedStor => "SpeedStor", 0x61,
    GnuHurd => "GNU HURD / System V", 0x63,
    Netware286 => "Novell NetWare 286", 0x64,
    Netware386 => "Novell NetWare 386", 0x65,
    DiskSecureMultiBoot => "DiskSecure multi-boot", 0x70,
    PcIx => "PC/IX", 0x75,
    OldMinix => "Old Minix", 0x80,
    Minix => "Minix / old Linux", 0x81,
    LinuxSwap => "Linux swap", 0x82,
    Linux => "Linux", 0x83,
    Os2Hidden => "OS/2 hidden C: drive", 0x84,
    LinuxExtended => "Linux extended", 0x85,
    NtfsVolumeSet => "NTFS volume set", 0x86,
    NtfsVolumeSet2 => "NTFS volume set", 0x87,
    LinuxPlaintext => "Linux plaintext", 0x88,
    LinuxLvm => "Linux LVM", 0x8E,
    Amoeba => "Amoeba", 0x93,
    AmoebaBbt => "Amoeba BBT", 0x94,
    BsdOs => "BSD/OS", 0x9F,
    IbmThinkpad => "IBM ThinkPad hibernation", 0xA0,
    FreeBsd => "FreeBSD", 0xA5,
    OpenBsd => "OpenBSD", 0xA6,
    NextStep => "NeXTSTEP", 0xA7,
    DarwinUfs => "Darwin UFS", 0xA8,
    NetBsd => "NetBSD", 0xA9,
    DarwinBoot => "Darwin boot", 0xAB,
    AppleHfs => "Apple HFS / HFS+", 0xAF,
    BsdiFs => "BSDI fs", 0xB7,
    BsdiSwap => "BSDI swap", 0xB8,
    BootWizardHidden => "Boot Wizard hidden", 0xBB,
    Solaris => "Solaris boot", 0xBE,
    SolarisX86 => "Solaris", 0xBF,
    DrDosFat12 => "DR-DOS secured FAT12", 0xC1,
    DrDosFat16Small => "DR-DOS secured FAT16 (< 32 MB)", 0xC4,
    DrDosFat16 => "DR-DOS secured FAT16", 0xC6,
    Syrinx => "Syrinx", 0xC7,
    NonFsData => "Non-FS data", 0xDA,
    CpmCtos => "CP/M / CTOS", 0xDB,
    DellUtility => "Dell utility", 0xDE,
    BootIt => "BootIt", 0xDF,
    DosAccess => "DOS access", 0xE1,
    DosRo => "DOS R/O", 0xE3,
    SpeedStorFat16 => "SpeedStor FAT16", 0xE4,
    BeOs => "BeOS fs", 0xEB,
    GptProtective => "GPT protective", 0xEE,
    EfiSystem => "EFI (FAT-12/16/32)", 0xEF,
    LinuxPaRisc => "Linux/PA-RISC boot", 0xF0,
    SpeedStorF1 => "SpeedStor", 0xF1,
    DosSecondary => "DOS secondary", 0xF2,
    SpeedStorF4 => "SpeedStor large", 0xF4,
    VmwareVmfs => "VMware VMFS", 0xFB,
    VmwareSwap => "VMware VMKCORE", 0xFC,
    LinuxRaid => "Linux raid autodetect", 0xFD,
    LanStep => "LANstep", 0xFE,
    XenixBbt => "XENIX BBT", 0xFF,
}

/// Partitions ending beyond this sector cannot be reached through CHS
/// (1024 cylinders x 255 heads x 63 sectors, minus the last cylinder).
pub const CHS_LIMIT_SECTORS: u64 = 16_450_560;

/// Partitions starting below this sector use the non-LBA FAT16/extended types.
pub const FAT16_CHS_START_LIMIT: u64 = 1_450_560;

impl PartitionType {
    #[inline]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Container types holding a chain of logical partitions.
    #[inline]
    pub const fn is_extended(&self) -> bool {
        matches!(self, Self::Extended | Self::ExtendedLba | Self::LinuxExtended)
    }

    /// `0xEE`: the disk is GPT partitioned.
    #[inline]
    pub const fn is_protective(&self) -> bool {
        matches!(self, Self::GptProtective)
    }

    /// Types that receive a drive letter.
    #[inline]
    pub const fn is_recognized(&self) -> bool {
        matches!(
            self,
            Self::Fat12
                | Self::Fat16Small
                | Self::Fat16
                | Self::Ntfs
                | Self::Fat32
                | Self::Fat32Lba
                | Self::Fat16Lba
        )
    }

    /// FAT family, excluding hidden variants.
    #[inline]
    pub const fn is_fat(&self) -> bool {
        matches!(
            self,
            Self::Fat12
                | Self::Fat16Small
                | Self::Fat16
                | Self::Fat32
                | Self::Fat32Lba
                | Self::Fat16Lba
                | Self::EfiSystem
        )
    }

    /// Default type for a new data partition of `sector_count` sectors at
    /// `start_sector`, following the FAT sizing conventions.
    pub const fn infer_fat(start_sector: u64, sector_count: u64) -> Self {
        if sector_count < 8192 {
            Self::Fat12
        } else if start_sector < FAT16_CHS_START_LIMIT && sector_count < 65_536 {
            Self::Fat16Small
        } else if start_sector < FAT16_CHS_START_LIMIT && sector_count < 4_194_304 {
            Self::Fat16
        } else if sector_count < 4_194_304 {
            Self::Fat16Lba
        } else if start_sector + sector_count < CHS_LIMIT_SECTORS {
            Self::Fat32
        } else {
            Self::Fat32Lba
        }
    }

    /// Type for a data partition formatted with `file_system`.
    /// Unknown filesystems fall back to the FAT conventions.
    pub fn for_file_system(file_system: &str, start_sector: u64, sector_count: u64) -> Self {
        if file_system.eq_ignore_ascii_case("NTFS") {
            Self::Ntfs
        } else if file_system.eq_ignore_ascii_case("FAT32") {
            if start_sector + sector_count < CHS_LIMIT_SECTORS {
                Self::Fat32
            } else {
                Self::Fat32Lba
            }
        } else if file_system.eq_ignore_ascii_case("EXT2")
            || file_system.eq_ignore_ascii_case("EXT3")
            || file_system.eq_ignore_ascii_case("EXT4")
            || file_system.eq_ignore_ascii_case("BTRFS")
        {
            Self::Linux
        } else {
            Self::infer_fat(start_sector, sector_count)
        }
    }

    /// Extended container type for a container starting at `start_sector`.
    pub const fn extended_for(start_sector: u64) -> Self {
        if start_sector < FAT16_CHS_START_LIMIT {
            Self::Extended
        } else {
            Self::ExtendedLba
        }
    }
}
