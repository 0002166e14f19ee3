//! Channel export and unexport.
//!
//! A PWM channel has no attribute directory until it is exported by writing its index to the
//! chip's `export` file. Writing the same index to `unexport` removes the directory again.
//! Neither operation waits for the directory to appear or disappear.

use std::io;

use log::info;
use pwmchip_core::{ChipConfig, ControlFs};
use snafu::ResultExt;

use crate::{IoSnafu, PwmError};

/// Exports and unexports one channel of a PWM chip.
#[derive(Debug, Clone)]
pub struct ChannelExporter<F> {
    fs: F,
    config: ChipConfig,
}

impl<F: ControlFs> ChannelExporter<F> {
    /// Creates an exporter for the channel named by `config`.
    pub const fn new(fs: F, config: ChipConfig) -> Self {
        Self { fs, config }
    }

    /// Returns the channel configuration.
    #[must_use]
    pub const fn config(&self) -> &ChipConfig {
        &self.config
    }

    /// Returns the filesystem the exporter writes to.
    #[must_use]
    pub const fn fs(&self) -> &F {
        &self.fs
    }

    /// Checks whether the channel's attribute directory exists.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::Io`] error is returned if the probe failed for any reason other than the
    ///   directory not existing.
    pub fn is_exported(&self) -> Result<bool, PwmError> {
        let path = self.config.channel_path();

        match self.fs.probe(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(PwmError::Io { path, source }),
        }
    }

    /// Writes the channel index to the chip's `export` file.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::Io`] error is returned if `export` could not be opened or written.
    pub fn export(&self) -> Result<(), PwmError> {
        let path = self.config.export_path();
        self.fs
            .write_attribute(&path, &self.config.channel().to_string())
            .context(IoSnafu { path: &path })?;

        info!("exported {}", self.config.channel_path().display());
        Ok(())
    }

    /// Writes the channel index to the chip's `unexport` file.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::Io`] error is returned if `unexport` could not be opened or written.
    pub fn unexport(&self) -> Result<(), PwmError> {
        let path = self.config.unexport_path();
        self.fs
            .write_attribute(&path, &self.config.channel().to_string())
            .context(IoSnafu { path: &path })?;

        info!("unexported {}", self.config.channel_path().display());
        Ok(())
    }
}
