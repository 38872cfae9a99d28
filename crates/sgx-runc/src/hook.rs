//! The pre-create step: patch the bundle's spec before the runtime sees it.

use crate::augment::{Augmented, augment};
use crate::catalog::ResourceCatalog;
use crate::cli::Invocation;
use crate::device::DeviceResolver;
use crate::error::Result;
use crate::oci::SpecFile;

/// Injects available host resources into the bundle of a `create` call.
///
/// Other sub-commands are left alone and `None` is returned.
pub fn prepare(
    invocation: &Invocation,
    catalog: &ResourceCatalog,
    resolver: &impl DeviceResolver,
) -> Result<Option<Augmented>> {
    if !invocation.is_create() {
        return Ok(None);
    }

    let bundle = invocation.bundle_dir()?;
    let mut spec_file = SpecFile::open(&bundle)?;
    let mut spec = spec_file.load()?;

    let availability = catalog.probe();
    let augmented = augment(&mut spec, &availability, resolver)?;
    if augmented.is_empty() {
        log::debug!("{} already up to date", spec_file.path().display());
        return Ok(Some(augmented));
    }

    spec_file.store(&spec)?;
    log::info!(
        "updated {}: {} mount(s), {} device(s) added",
        spec_file.path().display(),
        augmented.mounts.len(),
        augmented.devices.len()
    );
    Ok(Some(augmented))
}
