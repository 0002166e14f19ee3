//! Filesystem access for PWM control files.
//!
//! Everything the driver does to the kernel goes through two small traits:
//!
//! - [`ControlFs`] probes for directories and opens attribute files for writing.
//! - [`AttributeWrite`] is one open, write-only attribute handle.
//!
//! [`SysFs`] implements them on top of [`std::fs`]. Tests swap in the in-memory filesystem from
//! the `mock` module instead.
//!
//! # Write semantics
//!
//! sysfs attributes are not regular files. Every `write` call replaces the attribute's value
//! regardless of the file offset, so a handle can be kept open and written to repeatedly.
//! Values are written in a single call and never newline terminated.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::trace;

/// An open, write-only attribute file.
pub trait AttributeWrite {
    /// Writes `value` to the attribute.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the value was rejected or only partially written.
    fn write_value(&mut self, value: &str) -> io::Result<()>;

    /// Closes the handle.
    ///
    /// Dropping a handle also closes it, but gives no chance to observe a failure.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the backend reports a failed close.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// A filesystem that holds PWM control files.
pub trait ControlFs {
    /// Handle type returned by [`ControlFs::open_attribute`].
    type Attribute: AttributeWrite;

    /// Checks that `path` exists.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`io::ErrorKind::NotFound`] if nothing exists at `path`, or any
    /// other I/O error that prevented the check.
    fn probe(&self, path: &Path) -> io::Result<()>;

    /// Opens the file at `path` for writing only. The file is never created.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file could not be opened.
    fn open_attribute(&self, path: &Path) -> io::Result<Self::Attribute>;

    /// Opens `path`, writes `value` and closes it again.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from opening, writing or closing.
    fn write_attribute(&self, path: &Path, value: &str) -> io::Result<()> {
        let mut attribute = self.open_attribute(path)?;
        attribute.write_value(value)?;
        attribute.close()
    }
}

/// The real sysfs backed by [`std::fs`].
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct SysFs;

impl ControlFs for SysFs {
    type Attribute = AttributeFile;

    fn probe(&self, path: &Path) -> io::Result<()> {
        fs::metadata(path).map(|_| ())
    }

    fn open_attribute(&self, path: &Path) -> io::Result<AttributeFile> {
        trace!("opening {}", path.display());
        let file = OpenOptions::new().write(true).open(path)?;

        Ok(AttributeFile {
            file,
            path: path.to_path_buf(),
        })
    }
}

/// A sysfs attribute file opened for writing.
#[derive(Debug)]
pub struct AttributeFile {
    file: File,
    path: PathBuf,
}

impl AttributeFile {
    /// Returns the path this handle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttributeWrite for AttributeFile {
    fn write_value(&mut self, value: &str) -> io::Result<()> {
        self.file.write_all(value.as_bytes())
    }

    fn close(mut self) -> io::Result<()> {
        // `File` discards close errors on drop.
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use super::*;

    #[test]
    fn probe_reports_missing_paths_as_not_found() {
        let dir = tempfile::tempdir().unwrap();

        assert!(SysFs.probe(dir.path()).is_ok());
        assert_eq!(
            SysFs.probe(&dir.path().join("pwm0")).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn open_attribute_never_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enable");

        assert_eq!(
            SysFs.open_attribute(&path).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert!(!path.exists());
    }

    #[test]
    fn write_attribute_stores_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export");
        fs::write(&path, "").unwrap();

        SysFs.write_attribute(&path, "3").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "3");
    }

    #[test]
    fn attribute_file_keeps_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("period");
        fs::write(&path, "").unwrap();

        let mut attribute = SysFs.open_attribute(&path).unwrap();
        attribute.write_value("20000000").unwrap();

        assert_eq!(attribute.path(), path);
        attribute.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "20000000");
    }
}
