// SPDX-License-Identifier: MIT

//! Machine description: disks backed by image files, the firmware disk
//! report and engine options.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

use partlist::prelude::*;

#[derive(Debug, Deserialize)]
pub struct MachineConfig {
    #[serde(skip)]
    pub base_dir: PathBuf,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default, rename = "disk")]
    pub disks: Vec<DiskConfig>,
    #[serde(default, rename = "bios")]
    pub bios: Vec<BiosConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub max_logical_chain: usize,
    pub head_reserved: Size,
    /// Drive-letter registry, relative to the description.
    pub mounted_devices: PathBuf,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        let defaults = ListOptions::default();
        Self {
            max_logical_chain: defaults.max_logical_chain,
            head_reserved: Size(defaults.head_reserved_bytes),
            mounted_devices: PathBuf::from("mounted_devices.toml"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiskConfig {
    pub number: u32,
    pub image: PathBuf,
    /// Derived from the image size when omitted.
    pub cylinders: Option<u64>,
    #[serde(default = "default_heads")]
    pub heads: u32,
    #[serde(default = "default_sectors_per_track")]
    pub sectors_per_track: u32,
    #[serde(default = "default_sector_size")]
    pub bytes_per_sector: u32,
    #[serde(default)]
    pub scsi: ScsiConfig,
    #[serde(default = "default_driver")]
    pub driver: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScsiConfig {
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub bus: u16,
    #[serde(default)]
    pub id: u16,
}

/// One disk of the firmware report. Geometry defaults to the one of the
/// OS disk with the same position when omitted.
#[derive(Debug, Deserialize)]
pub struct BiosConfig {
    pub number: u32,
    #[serde(default)]
    pub signature: u32,
    pub cylinders: Option<u32>,
    pub heads: Option<u32>,
    pub sectors_per_track: Option<u32>,
}

fn default_sector_size() -> u32 {
    partlist::DEFAULT_SECTOR_SIZE
}

fn default_heads() -> u32 {
    255
}

fn default_sectors_per_track() -> u32 {
    63
}

fn default_driver() -> String {
    "image".into()
}

impl MachineConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: MachineConfig = toml::from_str(&content)?;
        config.base_dir = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        config.resolve_geometry()?;
        config.validate()?;
        Ok(config)
    }

    /// Fills in missing cylinder counts from the image sizes.
    pub fn resolve_geometry(&mut self) -> anyhow::Result<()> {
        for i in 0..self.disks.len() {
            if self.disks[i].cylinders.is_some() {
                continue;
            }
            let path = self.image_path(&self.disks[i]);
            let bytes = fs::metadata(&path)
                .map_err(|e| anyhow::anyhow!("disk {}: {}: {e}", self.disks[i].number, path.display()))?
                .len();
            let disk = &mut self.disks[i];
            let sectors = bytes / disk.bytes_per_sector.max(1) as u64;
            let geometry =
                DiskGeometry::from_sector_count(sectors, disk.heads, disk.sectors_per_track, disk.bytes_per_sector)?;
            crate::log_verbose!("disk {}: {} cylinders from image size", disk.number, geometry.cylinders);
            disk.cylinders = Some(geometry.cylinders);
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.disks.is_empty() {
            anyhow::bail!("no [[disk]] entry in the machine description");
        }
        for (i, d) in self.disks.iter().enumerate() {
            if self.disks[..i].iter().any(|o| o.number == d.number) {
                anyhow::bail!("disk {} is listed twice", d.number);
            }
            if !self.geometry(d).is_valid() {
                anyhow::bail!("disk {}: geometry has a zero component", d.number);
            }
        }
        if self.options.max_logical_chain == 0 {
            anyhow::bail!("options.max_logical_chain must be at least 1");
        }
        Ok(())
    }

    pub fn geometry(&self, disk: &DiskConfig) -> DiskGeometry {
        DiskGeometry::new(
            disk.cylinders.unwrap_or(0),
            disk.heads,
            disk.sectors_per_track,
            disk.bytes_per_sector,
        )
    }

    pub fn image_path(&self, disk: &DiskConfig) -> PathBuf {
        self.base_dir.join(&disk.image)
    }

    pub fn mounted_devices_path(&self) -> PathBuf {
        self.base_dir.join(&self.options.mounted_devices)
    }

    pub fn physical_disks(&self) -> Vec<PhysicalDisk> {
        self.disks
            .iter()
            .map(|d| PhysicalDisk {
                disk_number: d.number,
                geometry: self.geometry(d),
                scsi: ScsiAddress {
                    port: d.scsi.port,
                    bus: d.scsi.bus,
                    id: d.scsi.id,
                },
                driver_name: d.driver.clone(),
            })
            .collect()
    }

    pub fn bios_disks(&self) -> Vec<BiosDiskEntry> {
        self.bios
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let fallback = self
                    .disks
                    .get(i)
                    .map(|d| CmDiskGeometry::from_geometry(&self.geometry(d)))
                    .unwrap_or_default();
                let geometry = CmDiskGeometry {
                    bytes_per_sector: fallback.bytes_per_sector,
                    number_of_cylinders: b.cylinders.unwrap_or(fallback.number_of_cylinders),
                    sectors_per_track: b.sectors_per_track.unwrap_or(fallback.sectors_per_track),
                    number_of_heads: b.heads.unwrap_or(fallback.number_of_heads),
                };
                BiosDiskEntry::new(b.number, b.signature, geometry, Int13DriveParameter::default())
            })
            .collect()
    }

    pub fn list_options(&self) -> ListOptions {
        ListOptions::new()
            .with_max_logical_chain(self.options.max_logical_chain)
            .with_head_reserved_bytes(self.options.head_reserved.0)
    }
}

/// Byte size written as `512`, `64K`, `1M` or `2G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size(pub u64);

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl serde::de::Visitor<'_> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a byte count or a size string like '1M'")
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Size(value))
            }

            fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map(Size)
                    .map_err(|_| E::custom("size cannot be negative"))
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
                parse_size_bytes(value).map(Size).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

pub fn parse_size_bytes(size: &str) -> anyhow::Result<u64> {
    let lower = size.trim().to_lowercase();
    let (digits, unit) = match lower.as_bytes().last() {
        Some(b'k') => (&lower[..lower.len() - 1], 1u64 << 10),
        Some(b'm') => (&lower[..lower.len() - 1], 1 << 20),
        Some(b'g') => (&lower[..lower.len() - 1], 1 << 30),
        _ => (lower.as_str(), 1),
    };
    let n = digits.trim().parse::<u64>()?;
    n.checked_mul(unit)
        .ok_or_else(|| anyhow::anyhow!("size '{size}' is too large"))
}
