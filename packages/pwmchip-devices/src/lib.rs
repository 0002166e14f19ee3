//! PWM channel control through the Linux sysfs interface.
//!
//! # Overview
//!
//! The kernel exposes each PWM controller as a chip directory with one writable file per channel
//! property. This crate drives one channel of one chip through that interface:
//!
//! - [`ChannelExporter`](crate::export::ChannelExporter) makes the channel's directory appear and
//!   disappear.
//! - [`PwmControl`](crate::pwm::PwmControl) owns the channel's four attribute files and enforces
//!   the order in which the driver accepts changes.
//! - [`PwmOutput`](crate::output::PwmOutput) sets a channel up on first use and maps 8-bit
//!   values and servo angles onto it.
//!
//! ```no_run
//! use pwmchip_core::{ChipConfig, SysFs};
//! use pwmchip_devices::pwm::PwmControl;
//!
//! let mut pwm = PwmControl::acquire(SysFs, ChipConfig::default())?;
//! pwm.initialize(50.0)?;
//! pwm.set_duty_cycle(7.5)?;
//! pwm.release()?;
//! # Ok::<(), pwmchip_devices::PwmError>(())
//! ```
//!
//! All operations block until the kernel has accepted or rejected the write. A channel is meant
//! to be owned by exactly one controller at a time.

use core::fmt;
use std::{io, path::PathBuf};

use snafu::Snafu;

pub mod export;
pub mod output;
pub mod pwm;

/// Errors that can occur while exporting or controlling a PWM channel.
#[derive(Debug, Snafu)]
pub enum PwmError {
    /// A control or attribute file could not be opened, written or closed.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        /// The file that was being accessed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The operation is not allowed in the channel's current state.
    #[snafu(display("Cannot {operation} while the channel is {status}"))]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the channel was in.
        status: ChannelStatus,
    },

    /// A duty cycle percentage outside of `0.0..=100.0` was requested.
    #[snafu(display("Duty cycle of {percent}% is outside of 0% to 100%"))]
    DutyCycleOutOfRange {
        /// The requested percentage.
        percent: f64,
    },

    /// A pulse width longer than the configured period was requested.
    #[snafu(display("Pulse width of {nanos}ns is longer than the period of {period_nanos}ns"))]
    PulseWidthOutOfRange {
        /// The requested pulse width.
        nanos: u64,
        /// The configured period.
        period_nanos: u64,
    },

    /// A negative or non-finite frequency was requested.
    #[snafu(display("Frequency of {frequency}Hz cannot be converted to a period"))]
    FrequencyOutOfRange {
        /// The requested frequency.
        frequency: f64,
    },
}

impl From<PwmError> for io::Error {
    fn from(value: PwmError) -> Self {
        match value {
            PwmError::Io { source, .. } => source,
            PwmError::InvalidState { .. } => io::Error::other(value.to_string()),
            PwmError::DutyCycleOutOfRange { .. }
            | PwmError::PulseWidthOutOfRange { .. }
            | PwmError::FrequencyOutOfRange { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, value.to_string())
            }
        }
    }
}

/// The state of a PWM channel, as far as the state machine is concerned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ChannelStatus {
    /// Output is enabled. Period and duty cycle may change, polarity may not.
    Enabled,

    /// Output is disabled. Polarity may change, period and duty cycle may not.
    Disabled,

    /// The channel was released and its handles closed.
    Released,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Released => "released",
        })
    }
}
