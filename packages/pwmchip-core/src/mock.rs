//! In-memory PWM chip for tests.
//!
//! [`MockFs`] implements [`ControlFs`] without touching the real filesystem. It keeps a log of
//! every probe, open, write and close so tests can assert on exactly what the driver did, and it
//! can be told to fail any of those operations on a given path.
//!
//! A chip registered with [`MockFs::with_chip`] behaves like the kernel: writing a channel index
//! to `export` creates the `pwm<N>` directory, writing it to `unexport` removes it again.
//!
//! Clones share the same state, so a test can keep one clone around for inspection while the
//! driver owns another.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    config::{Attribute, ChipConfig},
    fs::{AttributeWrite, ControlFs},
};

/// An operation performed against a [`MockFs`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MockOp {
    /// [`ControlFs::probe`].
    Probe,
    /// [`ControlFs::open_attribute`].
    Open,
    /// [`AttributeWrite::write_value`].
    Write,
    /// [`AttributeWrite::close`] or dropping a handle.
    Close,
}

/// One entry of the [`MockFs`] event log.
///
/// Only successful operations are logged, except for closes, which release the handle even when
/// a failure is reported.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MockEvent {
    /// A path was probed and found.
    Probe(PathBuf),
    /// An attribute was opened.
    Open(PathBuf),
    /// A value was written to an attribute.
    Write(PathBuf, String),
    /// An attribute handle was closed.
    Close(PathBuf),
}

#[derive(Debug, Default)]
struct MockState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
    exporters: BTreeMap<PathBuf, PathBuf>,
    unexporters: BTreeMap<PathBuf, PathBuf>,
    failures: BTreeMap<(PathBuf, MockOp), io::ErrorKind>,
    events: Vec<MockEvent>,
    open_handles: usize,
}

impl MockState {
    fn check(&self, path: &Path, op: MockOp) -> io::Result<()> {
        match self.failures.get(&(path.to_path_buf(), op)) {
            Some(&kind) => Err(io::Error::new(
                kind,
                format!("injected {op:?} failure on {}", path.display()),
            )),
            None => Ok(()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.contains(path)
    }

    fn create_channel(&mut self, chip_path: &Path, channel: u32) {
        let channel_path = chip_path.join(format!("pwm{channel}"));
        for attribute in Attribute::ALL {
            self.files.insert(channel_path.join(attribute.file_name()));
        }
        self.dirs.insert(channel_path);
    }

    fn remove_channel(&mut self, chip_path: &Path, channel: u32) {
        let channel_path = chip_path.join(format!("pwm{channel}"));
        self.files.retain(|file| !file.starts_with(&channel_path));
        self.dirs.remove(&channel_path);
    }

    fn apply_write(&mut self, path: &Path, value: &str) -> io::Result<()> {
        let export = self.exporters.get(path).cloned();
        let unexport = self.unexporters.get(path).cloned();

        if export.is_none() && unexport.is_none() {
            return Ok(());
        }

        let channel: u32 = value
            .trim()
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid channel index"))?;

        if let Some(chip_path) = export {
            if self.dirs.contains(&chip_path.join(format!("pwm{channel}"))) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "channel is already exported",
                ));
            }
            self.create_channel(&chip_path, channel);
        } else if let Some(chip_path) = unexport {
            if !self.dirs.contains(&chip_path.join(format!("pwm{channel}"))) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "channel is not exported",
                ));
            }
            self.remove_channel(&chip_path, channel);
        }

        Ok(())
    }
}

/// An in-memory filesystem that emulates sysfs PWM chips.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    state: Rc<RefCell<MockState>>,
}

impl MockFs {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the chip of `config`, with working `export` and `unexport` files.
    ///
    /// The channel itself starts out unexported.
    #[must_use]
    pub fn with_chip(self, config: &ChipConfig) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let chip_path = config.chip_path();

            state.dirs.insert(config.root().to_path_buf());
            state.dirs.insert(chip_path.clone());
            state.files.insert(config.export_path());
            state.files.insert(config.unexport_path());
            state.exporters.insert(config.export_path(), chip_path.clone());
            state.unexporters.insert(config.unexport_path(), chip_path);
        }
        self
    }

    /// Adds the chip of `config` with its channel already exported.
    #[must_use]
    pub fn with_exported_channel(self, config: &ChipConfig) -> Self {
        let this = self.with_chip(config);
        this.state
            .borrow_mut()
            .create_channel(&config.chip_path(), config.channel());
        this
    }

    /// Makes every future `op` on `path` fail with `kind`.
    pub fn fail(&self, path: impl Into<PathBuf>, op: MockOp, kind: io::ErrorKind) {
        self.state
            .borrow_mut()
            .failures
            .insert((path.into(), op), kind);
    }

    /// Removes a failure installed with [`MockFs::fail`].
    pub fn clear_failure(&self, path: impl Into<PathBuf>, op: MockOp) {
        self.state.borrow_mut().failures.remove(&(path.into(), op));
    }

    /// Returns `true` if a file or directory exists at `path`.
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.borrow().exists(path.as_ref())
    }

    /// Returns a copy of the event log.
    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.state.borrow().events.clone()
    }

    /// Clears the event log.
    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Returns every value written to `path`, oldest first.
    #[must_use]
    pub fn writes_to(&self, path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Write(written, value) if written == path => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of logged `op` events on `path`.
    #[must_use]
    pub fn count(&self, op: MockOp, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        self.state
            .borrow()
            .events
            .iter()
            .filter(|event| {
                let (event_op, event_path) = match event {
                    MockEvent::Probe(p) => (MockOp::Probe, p),
                    MockEvent::Open(p) => (MockOp::Open, p),
                    MockEvent::Write(p, _) => (MockOp::Write, p),
                    MockEvent::Close(p) => (MockOp::Close, p),
                };
                event_op == op && event_path == path
            })
            .count()
    }

    /// Returns the number of attribute handles that are currently open.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }
}

impl ControlFs for MockFs {
    type Attribute = MockAttribute;

    fn probe(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.check(path, MockOp::Probe)?;

        if !state.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }

        state.events.push(MockEvent::Probe(path.to_path_buf()));
        Ok(())
    }

    fn open_attribute(&self, path: &Path) -> io::Result<MockAttribute> {
        let mut state = self.state.borrow_mut();
        state.check(path, MockOp::Open)?;

        if !state.files.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }

        state.open_handles += 1;
        state.events.push(MockEvent::Open(path.to_path_buf()));

        Ok(MockAttribute {
            path: path.to_path_buf(),
            state: Rc::clone(&self.state),
            open: true,
        })
    }
}

/// An open attribute of a [`MockFs`].
#[derive(Debug)]
pub struct MockAttribute {
    path: PathBuf,
    state: Rc<RefCell<MockState>>,
    open: bool,
}

impl MockAttribute {
    fn release(&mut self) {
        if self.open {
            self.open = false;

            let mut state = self.state.borrow_mut();
            state.open_handles -= 1;
            state.events.push(MockEvent::Close(self.path.clone()));
        }
    }
}

impl AttributeWrite for MockAttribute {
    fn write_value(&mut self, value: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.check(&self.path, MockOp::Write)?;
        state.apply_write(&self.path, value)?;
        state
            .events
            .push(MockEvent::Write(self.path.clone(), value.to_owned()));

        Ok(())
    }

    fn close(mut self) -> io::Result<()> {
        self.release();
        let result = self.state.borrow().check(&self.path, MockOp::Close);
        result
    }
}

impl Drop for MockAttribute {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_creates_and_unexport_removes_channel() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_chip(&config);

        assert!(!fs.exists(config.channel_path()));

        fs.write_attribute(&config.export_path(), "0").unwrap();
        assert!(fs.exists(config.channel_path()));
        assert!(fs.exists(config.attribute_path(Attribute::Polarity)));

        fs.write_attribute(&config.unexport_path(), "0").unwrap();
        assert!(!fs.exists(config.channel_path()));
        assert!(!fs.exists(config.attribute_path(Attribute::Enable)));
    }

    #[test]
    fn exporting_twice_is_rejected() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_exported_channel(&config);

        let err = fs.write_attribute(&config.export_path(), "0").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn injected_failures_are_returned() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_exported_channel(&config);
        let enable = config.attribute_path(Attribute::Enable);

        fs.fail(&enable, MockOp::Write, io::ErrorKind::PermissionDenied);

        let mut attribute = fs.open_attribute(&enable).unwrap();
        let err = attribute.write_value("1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.writes_to(&enable).is_empty());

        fs.clear_failure(&enable, MockOp::Write);
        attribute.write_value("1").unwrap();
        assert_eq!(fs.writes_to(&enable), ["1"]);
    }

    #[test]
    fn dropped_handles_are_closed() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_exported_channel(&config);
        let period = config.attribute_path(Attribute::Period);

        let attribute = fs.open_attribute(&period).unwrap();
        assert_eq!(fs.open_handles(), 1);

        drop(attribute);
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(fs.count(MockOp::Close, &period), 1);
    }

    #[test]
    fn failed_close_still_releases_handle() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_exported_channel(&config);
        let duty = config.attribute_path(Attribute::DutyCycle);
        fs.fail(&duty, MockOp::Close, io::ErrorKind::Other);

        let attribute = fs.open_attribute(&duty).unwrap();
        assert!(attribute.close().is_err());
        assert_eq!(fs.open_handles(), 0);
    }
}
