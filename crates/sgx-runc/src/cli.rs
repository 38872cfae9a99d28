//! Classification of the runc command line the wrapper was started with.
//!
//! The daemon calls the wrapper exactly like it would call runc, e.g.
//!
//! ```text
//! sgx-runc --root /run/docker/runtime-runc/moby --log ... create --bundle /run/.../<id> --pid-file ... <id>
//! ```
//!
//! Only two things matter here: whether this is a `create` call and which
//! bundle directory it targets. Every argument is forwarded to the real
//! runtime untouched afterwards.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::error::{Error, Result};

const CREATE: &str = "create";
const BUNDLE_LONG: &str = "--bundle";
const BUNDLE_SHORT: &str = "-b";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Create,
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub command: Option<Command>,
    pub bundle: Option<PathBuf>,
}

impl Invocation {
    /// Scans the full argument vector, program name included.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let mut invocation = Invocation::default();

        let mut params = args.iter().skip(1).map(OsString::as_os_str);
        while let Some(param) = params.next() {
            if invocation.command.is_none() {
                invocation.command = Some(Command::Other);
            }

            if param == CREATE {
                invocation.command = Some(Command::Create);
            } else if param == BUNDLE_LONG || param == BUNDLE_SHORT {
                // the value is consumed so a bundle literally named "create" is not
                // mistaken for the sub-command
                let Some(dir) = params.next() else {
                    return Err(Error::InvalidArgument(
                        "bundle option needs an argument".to_string(),
                    ));
                };
                invocation.bundle = Some(PathBuf::from(dir));
            } else if let Some(dir) = inline_bundle(param) {
                invocation.bundle = Some(PathBuf::from(dir));
            }
        }

        Ok(invocation)
    }

    pub fn is_create(&self) -> bool {
        self.command == Some(Command::Create)
    }

    /// The bundle directory, defaulting to the current working directory.
    pub fn bundle_dir(&self) -> Result<PathBuf> {
        match &self.bundle {
            Some(dir) => Ok(dir.clone()),
            None => {
                let cwd = std::env::current_dir()?;
                log::info!(
                    "Bundle directory path is empty, using working directory: {}",
                    cwd.display()
                );
                Ok(cwd)
            }
        }
    }
}

/// `--bundle=<dir>`, as accepted by runc itself.
fn inline_bundle(param: &OsStr) -> Option<OsString> {
    let param = param.to_str()?;
    let dir = param.strip_prefix(BUNDLE_LONG)?.strip_prefix('=')?;
    Some(OsString::from(dir))
}
