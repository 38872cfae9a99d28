//! Description of host device nodes.

use std::path::{Path, PathBuf};

use nix::sys::stat::{SFlag, major, minor, stat};
use oci_spec::runtime::LinuxDeviceType;

use crate::error::{Error, Result};

/// Everything the runtime spec needs to recreate a device node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub path: PathBuf,
    pub typ: LinuxDeviceType,
    pub major: i64,
    pub minor: i64,
    /// Permission bits only, the node type lives in `typ`
    pub file_mode: u32,
    pub uid: u32,
    pub gid: u32,
}

pub trait DeviceResolver {
    fn resolve(&self, path: &Path) -> Result<DeviceDescriptor>;
}

/// Resolves devices by stat'ing the node on the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostDevices;

impl DeviceResolver for HostDevices {
    fn resolve(&self, path: &Path) -> Result<DeviceDescriptor> {
        let st = stat(path).map_err(|errno| Error::DeviceResolution {
            path: path.to_owned(),
            reason: errno.desc().to_string(),
        })?;

        let fmt = SFlag::from_bits_truncate(st.st_mode & SFlag::S_IFMT.bits());
        let typ = if fmt == SFlag::S_IFCHR {
            LinuxDeviceType::C
        } else if fmt == SFlag::S_IFBLK {
            LinuxDeviceType::B
        } else if fmt == SFlag::S_IFIFO {
            LinuxDeviceType::P
        } else {
            return Err(Error::DeviceResolution {
                path: path.to_owned(),
                reason: "not a device node".to_string(),
            });
        };

        Ok(DeviceDescriptor {
            path: path.to_owned(),
            typ,
            major: major(st.st_rdev) as i64,
            minor: minor(st.st_rdev) as i64,
            file_mode: st.st_mode & !SFlag::S_IFMT.bits(),
            uid: st.st_uid,
            gid: st.st_gid,
        })
    }
}
