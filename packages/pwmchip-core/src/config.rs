//! Chip and channel configuration.
//!
//! The kernel exposes every PWM controller as a `pwmchipN` directory below the PWM class root
//! (usually `/sys/class/pwm`). A chip directory holds two shared control files, `export` and
//! `unexport`, and one `pwmM` directory for every channel that is currently exported:
//!
//! ```text
//! /sys/class/pwm/pwmchip0/
//! ├── export
//! ├── unexport
//! └── pwm0/
//!     ├── enable
//!     ├── period
//!     ├── duty_cycle
//!     └── polarity
//! ```
//!
//! [`ChipConfig`] names one channel on one chip and derives every path of that layout.

use core::fmt;
use std::path::{Path, PathBuf};

/// Mount point of the sysfs PWM class on a typical Linux system.
pub const DEFAULT_ROOT: &str = "/sys/class/pwm";

/// One PWM channel on one PWM chip.
///
/// # Examples
///
/// ```
/// use pwmchip_core::{Attribute, ChipConfig};
///
/// let config = ChipConfig::default().with_chip(1).with_channel(2);
///
/// assert_eq!(
///     config.attribute_path(Attribute::DutyCycle),
///     std::path::Path::new("/sys/class/pwm/pwmchip1/pwm2/duty_cycle"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChipConfig {
    root: PathBuf,
    chip: u32,
    channel: u32,
}

impl ChipConfig {
    /// Creates a configuration for `channel` of `pwmchip<chip>` below `root`.
    pub fn new(root: impl Into<PathBuf>, chip: u32, channel: u32) -> Self {
        Self {
            root: root.into(),
            chip,
            channel,
        }
    }

    /// Replaces the PWM class root.
    ///
    /// Mostly useful for pointing the driver at a scratch directory in tests.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Replaces the chip index.
    #[must_use]
    pub fn with_chip(mut self, chip: u32) -> Self {
        self.chip = chip;
        self
    }

    /// Replaces the channel index.
    #[must_use]
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    /// Returns the PWM class root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the chip index.
    #[must_use]
    pub const fn chip(&self) -> u32 {
        self.chip
    }

    /// Returns the channel index.
    #[must_use]
    pub const fn channel(&self) -> u32 {
        self.channel
    }

    /// Returns the `pwmchip<chip>` directory.
    #[must_use]
    pub fn chip_path(&self) -> PathBuf {
        self.root.join(format!("pwmchip{}", self.chip))
    }

    /// Returns the chip-level `export` control file.
    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        self.chip_path().join("export")
    }

    /// Returns the chip-level `unexport` control file.
    #[must_use]
    pub fn unexport_path(&self) -> PathBuf {
        self.chip_path().join("unexport")
    }

    /// Returns the `pwm<channel>` directory that appears once the channel is exported.
    #[must_use]
    pub fn channel_path(&self) -> PathBuf {
        self.chip_path().join(format!("pwm{}", self.channel))
    }

    /// Returns the path of one of the channel's attribute files.
    #[must_use]
    pub fn attribute_path(&self, attribute: Attribute) -> PathBuf {
        self.channel_path().join(attribute.file_name())
    }
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT, 0, 0)
    }
}

/// A writable attribute file of an exported PWM channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Attribute {
    /// `enable`, accepts `1` or `0`.
    Enable,

    /// `period`, the full cycle length in nanoseconds.
    Period,

    /// `duty_cycle`, the active time per cycle in nanoseconds.
    DutyCycle,

    /// `polarity`, accepts `normal` or `inverted`.
    Polarity,
}

impl Attribute {
    /// Every attribute, in the order a channel's handles are opened.
    pub const ALL: [Self; 4] = [Self::Enable, Self::Period, Self::DutyCycle, Self::Polarity];

    /// Returns the attribute's file name inside the channel directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Period => "period",
            Self::DutyCycle => "duty_cycle",
            Self::Polarity => "polarity",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
