//! The pluggable opener abstraction.
//!
//! Keeping the filesystem behind a trait lets the loader and generator be
//! exercised against an in-memory tree in tests, without ever touching a
//! real disk. This engine is strictly synchronous, so the trait carries
//! no async plumbing.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, Result};

/// Filesystem-like operations a loader or generator needs, independent of
/// where the bytes actually live.
pub trait Opener {
    /// List the names of a directory's direct children.
    fn list(&self, rel_path: &Path) -> Result<Vec<String>>;

    /// Read the full contents of a file.
    fn read(&self, rel_path: &Path) -> Result<Vec<u8>>;

    /// Open a file for streaming reads without materializing its full
    /// contents upfront. Callers that only need a header (e.g. the `.npy`
    /// parser) can stop reading as soon as they have it, so a
    /// terabyte-scale array never has to sit fully in memory just to
    /// validate its shape and dtype.
    fn open_read(&self, rel_path: &Path) -> Result<Box<dyn Read>>;

    /// Write the full contents of a file, creating parent directories as needed.
    fn write(&self, rel_path: &Path, contents: &[u8]) -> Result<()>;

    /// Ensure a directory exists (used when writing a new sample/node directory).
    fn ensure_dir(&self, rel_path: &Path) -> Result<()>;
}

/// A local-filesystem opener sandboxed to a root directory.
///
/// Rejects `..` components and absolute paths, so a malformed schema or a
/// hostile dataset can never make the loader escape its root.
pub struct LocalOpener {
    root: PathBuf,
}

impl LocalOpener {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, rel_path: &Path) -> Result<PathBuf> {
        for component in rel_path.components() {
            if matches!(component, std::path::Component::ParentDir) {
                return Err(DatasetError::new(format!(
                    "path '{}' escapes the dataset root",
                    rel_path.display()
                )));
            }
        }
        if rel_path.is_absolute() {
            return Err(DatasetError::new(format!(
                "absolute paths are not allowed within a dataset root: '{}'",
                rel_path.display()
            )));
        }
        Ok(self.root.join(rel_path))
    }
}

impl Opener for LocalOpener {
    fn list(&self, rel_path: &Path) -> Result<Vec<String>> {
        let path = self.resolve(rel_path)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&path)
            .map_err(|e| DatasetError::at(format!("cannot list directory: {e}"), rel_path.display().to_string()))?
        {
            let entry = entry.map_err(DatasetError::from)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, rel_path: &Path) -> Result<Vec<u8>> {
        let path = self.resolve(rel_path)?;
        fs::read(&path).map_err(|e| DatasetError::at(format!("cannot read file: {e}"), rel_path.display().to_string()))
    }

    fn open_read(&self, rel_path: &Path) -> Result<Box<dyn Read>> {
        let path = self.resolve(rel_path)?;
        let f = fs::File::open(&path)
            .map_err(|e| DatasetError::at(format!("cannot open file: {e}"), rel_path.display().to_string()))?;
        Ok(Box::new(f))
    }

    fn write(&self, rel_path: &Path, contents: &[u8]) -> Result<()> {
        let path = self.resolve(rel_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(DatasetError::from)?;
        }
        let mut f = fs::File::create(&path)
            .map_err(|e| DatasetError::at(format!("cannot create file: {e}"), rel_path.display().to_string()))?;
        f.write_all(contents).map_err(DatasetError::from)
    }

    fn ensure_dir(&self, rel_path: &Path) -> Result<()> {
        let path = self.resolve(rel_path)?;
        fs::create_dir_all(&path)
            .map_err(|e| DatasetError::at(format!("cannot create directory: {e}"), rel_path.display().to_string()))
    }
}

/// An in-memory opener for tests and for property tests stressing the
/// loader without touching real disks.
#[derive(Default)]
pub struct InMemoryOpener {
    files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
}

impl InMemoryOpener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file directly, bypassing `write` (handy for test fixtures).
    pub fn seed(&self, rel_path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(rel_path.into(), contents.into());
    }
}

impl Opener for InMemoryOpener {
    fn list(&self, rel_path: &Path) -> Result<Vec<String>> {
        let files = self.files.borrow();
        let mut names: Vec<String> = Vec::new();
        for path in files.keys() {
            if let Ok(suffix) = path.strip_prefix(rel_path) {
                if let Some(first) = suffix.components().next() {
                    let name = first.as_os_str().to_string_lossy().into_owned();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, rel_path: &Path) -> Result<Vec<u8>> {
        self.files
            .borrow()
            .get(rel_path)
            .cloned()
            .ok_or_else(|| DatasetError::at("file does not exist", rel_path.display().to_string()))
    }

    fn open_read(&self, rel_path: &Path) -> Result<Box<dyn Read>> {
        let bytes = self.read(rel_path)?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    fn write(&self, rel_path: &Path, contents: &[u8]) -> Result<()> {
        self.files.borrow_mut().insert(rel_path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn ensure_dir(&self, _rel_path: &Path) -> Result<()> {
        Ok(())
    }
}
