//! Host resources the wrapper knows how to expose to containers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Socket directory of the AESM service running on the host.
pub const AESM_SOCKET_DIR: &str = "/var/run/aesmd";
/// Out-of-tree SGX driver device.
pub const ISGX_DEVICE: &str = "/dev/isgx";
/// Graphene SGX helper device.
pub const GSGX_DEVICE: &str = "/dev/gsgx";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub required: bool,
}

impl CatalogEntry {
    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

/// Candidate bind-mount sources and device nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceCatalog {
    pub mounts: Vec<CatalogEntry>,
    pub devices: Vec<CatalogEntry>,
}

impl ResourceCatalog {
    pub fn sgx() -> Self {
        Self {
            mounts: vec![CatalogEntry::optional(AESM_SOCKET_DIR)],
            devices: vec![
                CatalogEntry::required(ISGX_DEVICE),
                CatalogEntry::optional(GSGX_DEVICE),
            ],
        }
    }

    /// Checks every entry against the host filesystem.
    ///
    /// Mount sources must be directories, devices must be anything but a
    /// directory. Paths that cannot be stat'ed are simply unavailable.
    pub fn probe(&self) -> Availability {
        let mounts = self
            .mounts
            .iter()
            .map(|entry| (entry.path.clone(), is_dir(&entry.path)))
            .collect();

        let devices: BTreeMap<_, _> = self
            .devices
            .iter()
            .map(|entry| (entry.path.clone(), is_non_dir(&entry.path)))
            .collect();

        for entry in self.devices.iter().filter(|e| e.required) {
            if devices.get(&entry.path) != Some(&true) {
                log::warn!("required device {} is not available", entry.path.display());
            }
        }

        Availability { mounts, devices }
    }
}

fn is_dir(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_dir())
}

fn is_non_dir(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| !m.is_dir())
}

/// Result of probing a [`ResourceCatalog`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    pub mounts: BTreeMap<PathBuf, bool>,
    pub devices: BTreeMap<PathBuf, bool>,
}

impl Availability {
    pub fn available_mounts(&self) -> impl Iterator<Item = &Path> {
        available(&self.mounts)
    }

    pub fn available_devices(&self) -> impl Iterator<Item = &Path> {
        available(&self.devices)
    }
}

fn available(entries: &BTreeMap<PathBuf, bool>) -> impl Iterator<Item = &Path> {
    entries
        .iter()
        .filter_map(|(path, &ok)| ok.then_some(path.as_path()))
}
