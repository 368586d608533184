// SPDX-License-Identifier: MIT

//! Drive-letter registry kept in a TOML file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use partlist::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountedValue {
    pub signature: u32,
    pub offset: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MountedDevicesFile {
    #[serde(default)]
    pub mappings: BTreeMap<String, MountedValue>,
}

impl MountedDevicesFile {
    pub fn key(letter: char) -> String {
        format!("\\DosDevices\\{letter}:")
    }

    /// Missing files load as an empty registry.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl MountedDevices for MountedDevicesFile {
    fn set_mapping(&mut self, letter: char, signature: u32, offset: u64) -> PartResult {
        self.mappings
            .insert(Self::key(letter), MountedValue { signature, offset });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounted.toml");

        let mut store = MountedDevicesFile::load(&path).unwrap();
        assert!(store.mappings.is_empty());
        partlist::persist::set_mounted_device_value(&mut store, 'C', 0xCAFE, 1 << 20).unwrap();
        store.save(&path).unwrap();

        let reloaded = MountedDevicesFile::load(&path).unwrap();
        assert_eq!(
            reloaded.mappings.get("\\DosDevices\\C:"),
            Some(&MountedValue {
                signature: 0xCAFE,
                offset: 1 << 20
            })
        );
    }
}
