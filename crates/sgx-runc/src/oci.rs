//! Reading and rewriting the bundle's `config.json`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub use oci_spec::runtime::Spec;

use crate::error::{Error, Result};

pub const SPEC_FILE: &str = "config.json";

/// An open runtime spec document.
///
/// The same handle is used for loading and storing, so the file is rewritten
/// in place and the handle is closed when this goes out of scope.
#[derive(Debug)]
pub struct SpecFile {
    path: PathBuf,
    file: File,
}

impl SpecFile {
    pub fn open(bundle: impl AsRef<Path>) -> Result<Self> {
        let path = bundle.as_ref().join(SPEC_FILE);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) -> Result<Spec> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        self.file.read_to_end(&mut data)?;
        serde_json::from_slice(&data).map_err(Error::Decode)
    }

    /// Overwrites the document from the start. Anything past the new content
    /// is cut off so a shorter encoding leaves no stale bytes behind.
    pub fn store(&mut self, spec: &Spec) -> Result<()> {
        let data = serde_json::to_vec(spec).map_err(Error::Encode)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&data)?;
        self.file.set_len(data.len() as u64)?;
        self.file.flush()?;
        Ok(())
    }
}

pub fn load(bundle: impl AsRef<Path>) -> Result<Spec> {
    SpecFile::open(bundle)?.load()
}
