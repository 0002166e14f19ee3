//! Lazily initialized PWM output.
//!
//! [`PwmOutput`] is the surface a board adaptor hands to higher level drivers. It does not touch
//! the channel until the first write, at which point it acquires and initializes a
//! [`PwmControl`]. Values are then mapped onto the channel's duty cycle:
//!
//! - [`PwmOutput::pwm_write`] takes an 8-bit value where `0` is always off and `255` is always on.
//! - [`PwmOutput::servo_write`] takes an angle in degrees and produces a standard
//!   [servo control](https://en.wikipedia.org/wiki/Servo_control) pulse between
//!   [`PwmOutput::MIN_PULSE`] and [`PwmOutput::MAX_PULSE`].
//!
//! [`PwmOutput::finalize`] tears the channel down again.

use core::time::Duration;

use pwmchip_core::{ChipConfig, ControlFs, SysFs};

use crate::{pwm::PwmControl, PwmError};

/// A PWM channel that is set up on first use.
#[derive(Debug)]
pub struct PwmOutput<F: ControlFs + Clone = SysFs> {
    fs: F,
    config: ChipConfig,
    frequency: f64,
    control: Option<PwmControl<F>>,
}

impl<F: ControlFs + Clone> PwmOutput<F> {
    /// Frequency used by [`PwmOutput::new`], in Hz.
    pub const DEFAULT_FREQUENCY: f64 = 100.0;

    /// Pulse width produced by [`PwmOutput::servo_write`] at 0 degrees.
    pub const MIN_PULSE: Duration = Duration::from_micros(500);

    /// Pulse width produced by [`PwmOutput::servo_write`] at [`PwmOutput::MAX_ANGLE`].
    pub const MAX_PULSE: Duration = Duration::from_millis(2);

    /// Largest angle accepted by [`PwmOutput::servo_write`]. Larger angles are saturated.
    pub const MAX_ANGLE: u8 = 180;

    /// Creates an output for the channel named by `config`, running at
    /// [`PwmOutput::DEFAULT_FREQUENCY`].
    ///
    /// Nothing is written until the first call to [`PwmOutput::pwm_write`] or
    /// [`PwmOutput::servo_write`].
    #[must_use]
    pub const fn new(fs: F, config: ChipConfig) -> Self {
        Self::with_frequency(fs, config, Self::DEFAULT_FREQUENCY)
    }

    /// Creates an output for the channel named by `config`, running at `frequency` Hz.
    #[must_use]
    pub const fn with_frequency(fs: F, config: ChipConfig, frequency: f64) -> Self {
        Self {
            fs,
            config,
            frequency,
            control: None,
        }
    }

    /// Returns the frequency the channel is initialized with, in Hz.
    #[must_use]
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Returns `true` if the channel has been acquired.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.control.is_some()
    }

    /// Returns the underlying control, if the channel has been acquired.
    #[must_use]
    pub const fn control(&self) -> Option<&PwmControl<F>> {
        self.control.as_ref()
    }

    /// Sets the duty cycle from an 8-bit value, where `255` is a 100% duty cycle.
    ///
    /// # Errors
    ///
    /// - Any error from [`PwmControl::acquire`] or [`PwmControl::initialize`] is returned if this
    ///   is the first write and setting up the channel failed.
    /// - Any error from [`PwmControl::set_duty_cycle`] is returned if the write failed.
    pub fn pwm_write(&mut self, value: u8) -> Result<(), PwmError> {
        self.initialized()?
            .set_duty_cycle(f64::from(value) / 255.0 * 100.0)
    }

    /// Moves a servo to `angle` degrees.
    ///
    /// `0` produces a [`PwmOutput::MIN_PULSE`] pulse and [`PwmOutput::MAX_ANGLE`] produces a
    /// [`PwmOutput::MAX_PULSE`] pulse, with angles in between mapped linearly. Angles above
    /// [`PwmOutput::MAX_ANGLE`] are saturated.
    ///
    /// # Errors
    ///
    /// - Any error from [`PwmControl::acquire`] or [`PwmControl::initialize`] is returned if this
    ///   is the first write and setting up the channel failed.
    /// - A [`PwmError::DutyCycleOutOfRange`] error is returned if the frequency is too high for
    ///   the pulse to fit in one period.
    /// - Any other error from [`PwmControl::set_duty_cycle`] is returned if the write failed.
    pub fn servo_write(&mut self, angle: u8) -> Result<(), PwmError> {
        let percent = Self::servo_pulse(angle).as_secs_f64() * self.frequency * 100.0;
        self.initialized()?.set_duty_cycle(percent)
    }

    /// Releases the channel if it was acquired.
    ///
    /// Does nothing if the output was never written to. Afterwards the output can be written to
    /// again, which acquires the channel anew.
    ///
    /// # Errors
    ///
    /// See [`PwmControl::release`].
    pub fn finalize(&mut self) -> Result<(), PwmError> {
        match self.control.take() {
            Some(mut control) => control.release(),
            None => Ok(()),
        }
    }

    fn servo_pulse(angle: u8) -> Duration {
        let span = Self::MAX_PULSE - Self::MIN_PULSE;
        let angle = u32::from(angle.min(Self::MAX_ANGLE));

        Self::MIN_PULSE + span * angle / u32::from(Self::MAX_ANGLE)
    }

    fn initialized(&mut self) -> Result<&mut PwmControl<F>, PwmError> {
        match &mut self.control {
            Some(control) => Ok(control),
            slot @ None => {
                let control = slot.insert(PwmControl::acquire(
                    self.fs.clone(),
                    self.config.clone(),
                )?);
                control.initialize(self.frequency)?;
                Ok(control)
            }
        }
    }
}
