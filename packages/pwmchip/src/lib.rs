//! # pwmchip
//!
//! Drive servos, motors and LEDs through the PWM chips Linux exposes under `/sys/class/pwm`.
//! pwmchip exports a channel, keeps its attribute files open, enforces the order in which the
//! kernel accepts changes, and tears the channel down again when you are done.
//!
//! # Usage
//!
//! ```no_run
//! use pwmchip::prelude::*;
//!
//! let mut pwm = PwmControl::acquire(SysFs, ChipConfig::default().with_chip(1))?;
//! pwm.initialize(50.0)?;
//! pwm.set_pulse_width(std::time::Duration::from_micros(1500))?;
//! pwm.release()?;
//! # Ok::<(), PwmError>(())
//! ```
//!
//! For hobby servos, [`PwmOutput`](crate::output::PwmOutput) sets the channel up on first use:
//!
//! ```no_run
//! use pwmchip::prelude::*;
//!
//! let mut servo = PwmOutput::new(SysFs, ChipConfig::default());
//! servo.servo_write(90)?;
//! servo.finalize()?;
//! # Ok::<(), PwmError>(())
//! ```
//!
//! # Features
//!
//! - `mock`: enables the `mock` module, an in-memory chip for testing code that drives PWM channels.
//! - `serde`: implements `Serialize` and `Deserialize` for
//!   [`ChipConfig`](crate::config::ChipConfig).

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
#[cfg(feature = "core")]
pub use pwmchip_core::{config, fs};
#[doc(inline)]
#[cfg(feature = "mock")]
pub use pwmchip_core::mock;
#[doc(inline)]
#[cfg(feature = "devices")]
pub use pwmchip_devices::{export, output, pwm, ChannelStatus, PwmError};

/// Commonly used features of pwmchip.
///
/// This module is meant to be glob imported.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use crate::{
        config::{Attribute, ChipConfig},
        fs::{AttributeWrite, ControlFs, SysFs},
    };
    #[cfg(feature = "devices")]
    pub use crate::{
        export::ChannelExporter,
        output::PwmOutput,
        pwm::{Polarity, PwmControl},
        ChannelStatus, PwmError,
    };
}
