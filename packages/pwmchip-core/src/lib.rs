//! Low level building blocks for [`pwmchip`](https://crates.io/crates/pwmchip).
//! The core crate is shared by every other crate in the pwmchip workspace.
//!
//! Included in this crate:
//! - Chip, channel and attribute path layout: [`config`]
//! - The filesystem seam and the real sysfs backend: [`fs`]
//! - An in-memory filesystem that emulates a PWM chip: `mock` (behind the `mock` feature)

pub mod config;
pub mod fs;
#[cfg(feature = "mock")]
pub mod mock;

pub use config::{Attribute, ChipConfig};
pub use fs::{AttributeFile, AttributeWrite, ControlFs, SysFs};
