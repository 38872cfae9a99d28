//! Hand-off to the real OCI runtime.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::path::PathResolve;

/// Finds the first runtime of `names` that resolves to an executable.
pub fn find_runtime(names: &[impl AsRef<str>]) -> Result<PathBuf> {
    find_runtime_in(names, crate::path::paths())
}

fn find_runtime_in(
    names: &[impl AsRef<str>],
    dirs: impl IntoIterator<Item = PathBuf>,
) -> Result<PathBuf> {
    let dirs: Vec<PathBuf> = dirs.into_iter().collect();
    for name in names {
        let name: &str = name.as_ref();
        log::info!("Looking for \"{name}\" binary");
        match name.resolve_in_dirs(&dirs).next() {
            Some(path) => {
                log::info!("Runtime path: {}", path.display());
                return Ok(path);
            }
            None => log::info!("\"{name}\" binary not found"),
        }
    }

    let names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
    Err(Error::NotFound(format!(
        "no runtime binary in PATH, tried {}",
        names.join(", ")
    )))
}

/// Replaces the current process with `runtime`.
///
/// `args` is the argument vector this process was started with; the program
/// name is swapped for the runtime path and everything else is passed as is,
/// along with the current environment. Only returns if the exec failed.
pub fn exec(runtime: &Path, args: &[OsString]) -> Error {
    let err = Command::new(runtime)
        .arg0(runtime)
        .args(args.iter().skip(1))
        .exec();
    Error::Stdio(err)
}
