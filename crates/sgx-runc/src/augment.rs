//! Merges available host resources into a runtime spec.
//!
//! Mount sources and device paths are the keys: an entry that is already
//! declared in the spec is never touched and never duplicated, whatever its
//! other fields look like. Running [`augment`] again on its own output is a
//! no-op.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use oci_spec::runtime::{
    LinuxDevice, LinuxDeviceBuilder, LinuxDeviceCgroup, LinuxDeviceCgroupBuilder, Mount,
    MountBuilder, Spec,
};

use crate::catalog::Availability;
use crate::device::{DeviceDescriptor, DeviceResolver};
use crate::error::Result;

const DEVICE_ACCESS: &str = "rmw";

/// What [`augment`] added to the spec.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Augmented {
    pub mounts: Vec<PathBuf>,
    pub devices: Vec<PathBuf>,
}

impl Augmented {
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty() && self.devices.is_empty()
    }
}

/// Adds every available mount and device the spec does not declare yet.
///
/// Devices are only added when the spec has a `linux` section. A device
/// that cannot be resolved aborts the whole operation and leaves the spec's
/// device lists untouched.
pub fn augment(
    spec: &mut Spec,
    availability: &Availability,
    resolver: &impl DeviceResolver,
) -> Result<Augmented> {
    let mut augmented = Augmented::default();

    let mut mounts = spec.mounts().clone().unwrap_or_default();
    let mounted: HashSet<PathBuf> = mounts.iter().filter_map(|m| m.source().clone()).collect();
    for source in availability.available_mounts() {
        if mounted.contains(source) {
            continue;
        }
        log::info!("adding bind mount {}", source.display());
        mounts.push(bind_mount(source)?);
        augmented.mounts.push(source.to_owned());
    }

    let Some(mut linux) = spec.linux().clone() else {
        if !augmented.mounts.is_empty() {
            spec.set_mounts(Some(mounts));
        }
        return Ok(augmented);
    };

    let mut devices = linux.devices().clone().unwrap_or_default();
    let mut resources = linux.resources().clone().unwrap_or_default();
    let mut rules = resources.devices().clone().unwrap_or_default();

    let declared: HashSet<PathBuf> = devices.iter().map(|d| d.path().clone()).collect();
    for path in availability.available_devices() {
        if declared.contains(path) {
            continue;
        }
        let descriptor = resolver.resolve(path)?;
        log::info!(
            "adding device {} ({:?} {}:{})",
            path.display(),
            descriptor.typ,
            descriptor.major,
            descriptor.minor
        );
        devices.push(linux_device(path, &descriptor)?);
        rules.push(allow_rule(&descriptor)?);
        augmented.devices.push(path.to_owned());
    }

    if !augmented.mounts.is_empty() {
        spec.set_mounts(Some(mounts));
    }
    if !augmented.devices.is_empty() {
        resources.set_devices(Some(rules));
        linux.set_devices(Some(devices));
        linux.set_resources(Some(resources));
        spec.set_linux(Some(linux));
    }

    Ok(augmented)
}

fn bind_mount(source: &Path) -> Result<Mount> {
    let mount = MountBuilder::default()
        .source(source)
        .destination(source)
        .typ("bind")
        .options(vec!["rbind".to_string(), "rprivate".to_string()])
        .build()?;
    Ok(mount)
}

fn linux_device(path: &Path, descriptor: &DeviceDescriptor) -> Result<LinuxDevice> {
    // gid deliberately mirrors the owner uid
    let device = LinuxDeviceBuilder::default()
        .path(path)
        .typ(descriptor.typ)
        .major(descriptor.major)
        .minor(descriptor.minor)
        .file_mode(descriptor.file_mode)
        .uid(descriptor.uid)
        .gid(descriptor.uid)
        .build()?;
    Ok(device)
}

fn allow_rule(descriptor: &DeviceDescriptor) -> Result<LinuxDeviceCgroup> {
    let rule = LinuxDeviceCgroupBuilder::default()
        .allow(true)
        .typ(descriptor.typ)
        .major(descriptor.major)
        .minor(descriptor.minor)
        .access(DEVICE_ACCESS)
        .build()?;
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use oci_spec::runtime::LinuxDeviceType;
    use serde_json::{Value, json};

    use super::*;
    use crate::catalog::{AESM_SOCKET_DIR, GSGX_DEVICE, ISGX_DEVICE};
    use crate::error::Error;

    /// Resolves every path to a fixed character device.
    struct FakeDevices;

    impl DeviceResolver for FakeDevices {
        fn resolve(&self, path: &Path) -> Result<DeviceDescriptor> {
            Ok(DeviceDescriptor {
                path: path.to_owned(),
                typ: LinuxDeviceType::C,
                major: 10,
                minor: 58,
                file_mode: 0o666,
                uid: 1000,
                gid: 2000,
            })
        }
    }

    struct FailingDevices;

    impl DeviceResolver for FailingDevices {
        fn resolve(&self, path: &Path) -> Result<DeviceDescriptor> {
            Err(Error::DeviceResolution {
                path: path.to_owned(),
                reason: "gone".to_string(),
            })
        }
    }

    fn availability(socket: bool, isgx: bool, gsgx: bool) -> Availability {
        Availability {
            mounts: BTreeMap::from([(PathBuf::from(AESM_SOCKET_DIR), socket)]),
            devices: BTreeMap::from([
                (PathBuf::from(ISGX_DEVICE), isgx),
                (PathBuf::from(GSGX_DEVICE), gsgx),
            ]),
        }
    }

    fn spec(value: Value) -> Spec {
        serde_json::from_value(value).unwrap()
    }

    fn empty_linux_spec() -> Spec {
        spec(json!({
            "ociVersion": "1.0.2",
            "linux": {}
        }))
    }

    fn device_paths(spec: &Spec) -> Vec<PathBuf> {
        spec.linux()
            .as_ref()
            .and_then(|l| l.devices().clone())
            .unwrap_or_default()
            .iter()
            .map(|d| d.path().clone())
            .collect()
    }

    fn device_rules(spec: &Spec) -> Vec<LinuxDeviceCgroup> {
        spec.linux()
            .as_ref()
            .and_then(|l| l.resources().clone())
            .and_then(|r| r.devices().clone())
            .unwrap_or_default()
    }

    fn mounts(spec: &Spec) -> Vec<Mount> {
        spec.mounts().clone().unwrap_or_default()
    }

    #[test]
    fn test_adds_available_resources() -> Result<()> {
        let mut spec = empty_linux_spec();
        let added = augment(&mut spec, &availability(true, true, false), &FakeDevices)?;

        assert_eq!(added.mounts, vec![PathBuf::from(AESM_SOCKET_DIR)]);
        assert_eq!(added.devices, vec![PathBuf::from(ISGX_DEVICE)]);

        let mounts = mounts(&spec);
        assert_eq!(mounts.len(), 1);
        let mount = &mounts[0];
        assert_eq!(mount.source(), &Some(PathBuf::from(AESM_SOCKET_DIR)));
        assert_eq!(mount.destination(), &PathBuf::from(AESM_SOCKET_DIR));
        assert_eq!(mount.typ().as_deref(), Some("bind"));
        assert_eq!(
            mount.options(),
            &Some(vec!["rbind".to_string(), "rprivate".to_string()])
        );

        let devices = spec.linux().as_ref().unwrap().devices().clone().unwrap();
        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert_eq!(device.path(), &PathBuf::from(ISGX_DEVICE));
        assert_eq!(device.typ(), LinuxDeviceType::C);
        assert_eq!((device.major(), device.minor()), (10, 58));
        assert_eq!(device.file_mode(), Some(0o666));
        assert_eq!(device.uid(), Some(1000));
        assert_eq!(device.gid(), Some(1000));

        let rules = device_rules(&spec);
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert!(rule.allow());
        assert_eq!(rule.typ(), Some(LinuxDeviceType::C));
        assert_eq!((rule.major(), rule.minor()), (Some(10), Some(58)));
        assert_eq!(rule.access().as_deref(), Some("rmw"));

        assert!(!device_paths(&spec).contains(&PathBuf::from(GSGX_DEVICE)));
        Ok(())
    }

    #[test]
    fn test_existing_mount_source_is_not_duplicated() -> Result<()> {
        let mut spec = spec(json!({
            "ociVersion": "1.0.2",
            "mounts": [{
                "destination": "/run/aesmd",
                "type": "bind",
                "source": AESM_SOCKET_DIR,
                "options": ["bind", "ro"]
            }],
            "linux": {}
        }));
        let before = mounts(&spec);

        let added = augment(&mut spec, &availability(true, false, false), &FakeDevices)?;

        assert!(added.mounts.is_empty());
        assert_eq!(mounts(&spec), before);
        Ok(())
    }

    #[test]
    fn test_existing_device_is_untouched() -> Result<()> {
        let mut spec = spec(json!({
            "ociVersion": "1.0.2",
            "linux": {
                "devices": [{
                    "path": ISGX_DEVICE,
                    "type": "c",
                    "major": 1,
                    "minor": 1,
                    "fileMode": 384
                }]
            }
        }));

        let added = augment(&mut spec, &availability(false, true, true), &FakeDevices)?;

        assert_eq!(added.devices, vec![PathBuf::from(GSGX_DEVICE)]);
        let devices = spec.linux().as_ref().unwrap().devices().clone().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path(), &PathBuf::from(ISGX_DEVICE));
        assert_eq!((devices[0].major(), devices[0].minor()), (1, 1));
        assert_eq!(devices[0].file_mode(), Some(384));
        assert_eq!(devices[1].path(), &PathBuf::from(GSGX_DEVICE));
        assert_eq!(device_rules(&spec).len(), 1);
        Ok(())
    }

    #[test]
    fn test_no_devices_on_host_changes_nothing() -> Result<()> {
        let mut spec = spec(json!({
            "ociVersion": "1.0.2",
            "linux": {
                "resources": {
                    "devices": [{ "allow": false, "access": "rwm" }]
                }
            }
        }));
        let before = serde_json::to_value(&spec).unwrap();

        let added = augment(&mut spec, &availability(false, false, false), &FakeDevices)?;

        assert!(added.is_empty());
        assert_eq!(serde_json::to_value(&spec).unwrap(), before);
        Ok(())
    }

    #[test]
    fn test_unavailable_entries_are_never_added() -> Result<()> {
        let mut spec = empty_linux_spec();
        let added = augment(&mut spec, &availability(false, false, false), &FailingDevices)?;

        assert!(added.is_empty());
        assert!(mounts(&spec).is_empty());
        assert!(device_paths(&spec).is_empty());
        assert!(device_rules(&spec).is_empty());
        Ok(())
    }

    #[test]
    fn test_no_linux_section_only_adds_mounts() -> Result<()> {
        let mut spec = spec(json!({ "ociVersion": "1.0.2" }));

        let added = augment(&mut spec, &availability(true, true, true), &FakeDevices)?;

        assert_eq!(added.mounts, vec![PathBuf::from(AESM_SOCKET_DIR)]);
        assert!(added.devices.is_empty());
        assert_eq!(mounts(&spec).len(), 1);
        assert!(spec.linux().is_none());
        Ok(())
    }

    #[test]
    fn test_appends_after_existing_rules() -> Result<()> {
        let mut spec = spec(json!({
            "ociVersion": "1.0.2",
            "linux": {
                "resources": {
                    "devices": [{ "allow": false, "access": "rwm" }]
                }
            }
        }));

        augment(&mut spec, &availability(false, true, false), &FakeDevices)?;

        let rules = device_rules(&spec);
        assert_eq!(rules.len(), 2);
        assert!(!rules[0].allow());
        assert!(rules[1].allow());
        Ok(())
    }

    #[test]
    fn test_augment_is_idempotent() -> Result<()> {
        let mut spec = spec(json!({
            "ociVersion": "1.0.2",
            "mounts": [{ "destination": "/proc", "type": "proc", "source": "proc" }],
            "linux": {}
        }));
        let availability = availability(true, true, true);

        augment(&mut spec, &availability, &FakeDevices)?;
        let once = serde_json::to_value(&spec).unwrap();

        let added = augment(&mut spec, &availability, &FakeDevices)?;
        assert!(added.is_empty());
        assert_eq!(serde_json::to_value(&spec).unwrap(), once);

        assert_eq!(mounts(&spec).len(), 2);
        assert_eq!(device_paths(&spec).len(), 2);
        assert_eq!(device_rules(&spec).len(), 2);
        Ok(())
    }

    #[test]
    fn test_device_resolution_failure_aborts() {
        let mut spec = empty_linux_spec();
        let err = augment(&mut spec, &availability(true, true, false), &FailingDevices)
            .unwrap_err();

        assert!(matches!(err, Error::DeviceResolution { .. }));
        assert!(device_paths(&spec).is_empty());
        assert!(device_rules(&spec).is_empty());
    }
}
