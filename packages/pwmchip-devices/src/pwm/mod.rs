//! PWM channel control.
//!
//! This module provides [`PwmControl`], which owns the attribute files of one exported PWM
//! channel and tracks the state the kernel driver expects them to be written in.
//!
//! # Hardware Overview
//!
//! A PWM channel outputs a square wave. The *period* is the length of one full cycle and the
//! *duty cycle* is how much of each period the output is held active. Both are written to the
//! driver in nanoseconds. *Polarity* selects whether active means high (normal) or low
//! (inverted).
//!
//! # Ordering Rules
//!
//! Drivers only accept some changes in some states, so [`PwmControl`] refuses them up front:
//!
//! | Operation | Allowed while |
//! |---|---|
//! | [`set_polarity`](PwmControl::set_polarity) | disabled |
//! | [`set_frequency`](PwmControl::set_frequency) | enabled |
//! | [`set_duty_cycle`](PwmControl::set_duty_cycle) | enabled |
//! | [`set_enable`](PwmControl::set_enable) | always |
//!
//! A refused operation returns [`PwmError::InvalidState`] without touching the filesystem.
//! Cached values are only updated after the driver accepted a write, so a failed operation
//! leaves the control exactly as it was.

use core::{fmt, mem, time::Duration};

use log::{debug, info, warn};
use pwmchip_core::{Attribute, AttributeWrite, ChipConfig, ControlFs, SysFs};
use snafu::{ensure, ResultExt};

use crate::{
    export::ChannelExporter, ChannelStatus, DutyCycleOutOfRangeSnafu, FrequencyOutOfRangeSnafu,
    InvalidStateSnafu, IoSnafu, PulseWidthOutOfRangeSnafu, PwmError,
};

mod attributes;

use attributes::Attributes;

/// Nanoseconds in one second, the unit of the `period` and `duty_cycle` attributes.
pub const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Output polarity of a PWM channel.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Polarity {
    /// The output is high for the active part of each period.
    #[default]
    Normal,

    /// The output is low for the active part of each period.
    Inverted,
}

impl Polarity {
    /// Returns [`Polarity::Inverted`] if `inverted` is `true`, [`Polarity::Normal`] otherwise.
    #[must_use]
    pub const fn from_inverted(inverted: bool) -> Self {
        match inverted {
            true => Self::Inverted,
            false => Self::Normal,
        }
    }

    /// Returns `true` for [`Polarity::Inverted`].
    #[must_use]
    pub const fn is_inverted(self) -> bool {
        matches!(self, Self::Inverted)
    }

    /// Returns the value the `polarity` attribute expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Inverted => "inverted",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a frequency in Hz to a period in nanoseconds, rounded to the nearest nanosecond.
///
/// A frequency of zero maps to a period of zero, which is what teardown writes to stop the
/// output.
///
/// # Errors
///
/// - A [`PwmError::FrequencyOutOfRange`] error is returned if `frequency` is negative, NaN or
///   infinite.
///
/// # Examples
///
/// ```
/// use pwmchip_devices::pwm::period_from_frequency;
///
/// assert_eq!(period_from_frequency(50.0)?, 20_000_000);
/// assert_eq!(period_from_frequency(7.0)?, 142_857_143);
/// # Ok::<(), pwmchip_devices::PwmError>(())
/// ```
pub fn period_from_frequency(frequency: f64) -> Result<u64, PwmError> {
    ensure!(
        frequency.is_finite() && frequency >= 0.0,
        FrequencyOutOfRangeSnafu { frequency }
    );

    if frequency == 0.0 {
        return Ok(0);
    }

    Ok((NANOS_PER_SECOND / frequency).round() as u64)
}

/// Converts a duty cycle percentage of `period_nanos` to nanoseconds.
///
/// The result is truncated towards zero and never exceeds `period_nanos`.
///
/// # Errors
///
/// - A [`PwmError::DutyCycleOutOfRange`] error is returned if `percent` is outside of
///   `0.0..=100.0` or NaN.
pub fn duty_from_percent(period_nanos: u64, percent: f64) -> Result<u64, PwmError> {
    ensure!(
        (0.0..=100.0).contains(&percent),
        DutyCycleOutOfRangeSnafu { percent }
    );

    Ok(((period_nanos as f64 * (percent / 100.0)) as u64).min(period_nanos))
}

enum ChannelState<A> {
    Acquired(Attributes<A>),
    Released,
}

/// Control over one exported PWM channel.
///
/// A `PwmControl` is created by [`PwmControl::acquire`], which exports the channel if needed and
/// opens all four of its attribute files. It starts out disabled with a zero period and duty
/// cycle; [`PwmControl::initialize`] brings it to a usable default.
///
/// [`PwmControl::release`] zeroes and disables the output, closes the attribute files and
/// unexports the channel. Dropping a control that was not released does the same and logs any
/// failure.
pub struct PwmControl<F: ControlFs = SysFs> {
    exporter: ChannelExporter<F>,
    state: ChannelState<F::Attribute>,
    enabled: bool,
    period_nanos: u64,
    duty_nanos: u64,
    polarity: Polarity,
}

impl<F: ControlFs> PwmControl<F> {
    /// Takes control of the channel named by `config`.
    ///
    /// If the channel's directory does not exist yet, the channel is exported first. The
    /// `enable`, `period`, `duty_cycle` and `polarity` files are then opened in that order.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::Io`] error is returned if probing for the channel failed for a reason
    ///   other than it not existing. Nothing is exported in that case.
    /// - A [`PwmError::Io`] error is returned if exporting failed or any attribute could not be
    ///   opened. Attributes opened before the failure are closed again.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pwmchip_core::{ChipConfig, SysFs};
    /// use pwmchip_devices::pwm::PwmControl;
    ///
    /// let pwm = PwmControl::acquire(SysFs, ChipConfig::default().with_chip(1))?;
    /// assert!(!pwm.is_enabled());
    /// # Ok::<(), pwmchip_devices::PwmError>(())
    /// ```
    pub fn acquire(fs: F, config: ChipConfig) -> Result<Self, PwmError> {
        let exporter = ChannelExporter::new(fs, config);

        if !exporter.is_exported()? {
            exporter.export()?;
        }

        let attributes = Attributes::open(exporter.fs(), exporter.config())?;
        info!("acquired {}", exporter.config().channel_path().display());

        Ok(Self {
            exporter,
            state: ChannelState::Acquired(attributes),
            enabled: false,
            period_nanos: 0,
            duty_nanos: 0,
            polarity: Polarity::Normal,
        })
    }

    /// Brings a freshly acquired channel to its default state: normal polarity, enabled,
    /// running at `frequency` with a duty cycle of zero.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that failed. The channel is left as that step left
    /// it; whether to release it is up to the caller.
    pub fn initialize(&mut self, frequency: f64) -> Result<(), PwmError> {
        self.set_polarity(Polarity::Normal)?;
        self.set_enable(true)?;
        self.set_frequency(frequency)?;
        self.set_duty_cycle(0.0)?;

        Ok(())
    }

    /// Sets the output polarity.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel is enabled or released.
    /// - A [`PwmError::Io`] error is returned if the `polarity` write failed.
    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<(), PwmError> {
        const OPERATION: &str = "set polarity";

        self.ensure_status(OPERATION, ChannelStatus::Disabled)?;
        self.write(OPERATION, Attribute::Polarity, polarity.as_str())?;
        self.polarity = polarity;

        Ok(())
    }

    /// Sets the output polarity to inverted if `inverted` is `true`, normal otherwise.
    ///
    /// # Errors
    ///
    /// See [`PwmControl::set_polarity`].
    pub fn set_polarity_inverted(&mut self, inverted: bool) -> Result<(), PwmError> {
        self.set_polarity(Polarity::from_inverted(inverted))
    }

    /// Enables or disables the output.
    ///
    /// Requesting the state the channel is already in does nothing.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel is released.
    /// - A [`PwmError::Io`] error is returned if the `enable` write failed.
    pub fn set_enable(&mut self, enabled: bool) -> Result<(), PwmError> {
        const OPERATION: &str = "set enable";

        ensure!(
            !self.is_released(),
            InvalidStateSnafu {
                operation: OPERATION,
                status: ChannelStatus::Released,
            }
        );

        if self.enabled == enabled {
            return Ok(());
        }

        self.write(OPERATION, Attribute::Enable, if enabled { "1" } else { "0" })?;
        self.enabled = enabled;

        Ok(())
    }

    /// Sets the output frequency in Hz.
    ///
    /// The frequency is converted with [`period_from_frequency`]. If the resulting period equals
    /// the current one, nothing is written. If it is shorter than the current duty cycle, the
    /// duty cycle is zeroed first so the driver never sees a duty cycle longer than the period.
    /// Should the period then be rejected, the previous duty cycle is written back.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel is disabled or released.
    /// - A [`PwmError::FrequencyOutOfRange`] error is returned if `frequency` is negative, NaN or
    ///   infinite.
    /// - A [`PwmError::Io`] error is returned if a write failed.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<(), PwmError> {
        const OPERATION: &str = "set frequency";

        self.ensure_status(OPERATION, ChannelStatus::Enabled)?;
        let period_nanos = period_from_frequency(frequency)?;

        if period_nanos == self.period_nanos {
            return Ok(());
        }

        let previous_duty = self.duty_nanos;
        let zero_duty_first = previous_duty > period_nanos;
        if zero_duty_first {
            self.write(OPERATION, Attribute::DutyCycle, "0")?;
        }

        if let Err(err) = self.write(OPERATION, Attribute::Period, &period_nanos.to_string()) {
            if zero_duty_first {
                if let Err(restore) =
                    self.write(OPERATION, Attribute::DutyCycle, &previous_duty.to_string())
                {
                    warn!("failed to restore the duty cycle after a rejected period: {restore}");
                }
            }
            return Err(err);
        }

        if zero_duty_first {
            self.duty_nanos = 0;
        }
        self.period_nanos = period_nanos;

        Ok(())
    }

    /// Sets the duty cycle as a percentage of the current period.
    ///
    /// The value is converted with [`duty_from_percent`] and always written, even if it did not
    /// change.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel is disabled or released.
    /// - A [`PwmError::DutyCycleOutOfRange`] error is returned if `percent` is outside of
    ///   `0.0..=100.0`.
    /// - A [`PwmError::Io`] error is returned if the `duty_cycle` write failed.
    pub fn set_duty_cycle(&mut self, percent: f64) -> Result<(), PwmError> {
        const OPERATION: &str = "set duty cycle";

        self.ensure_status(OPERATION, ChannelStatus::Enabled)?;
        let duty_nanos = duty_from_percent(self.period_nanos, percent)?;

        self.write_duty(OPERATION, duty_nanos)
    }

    /// Sets the active time of each period directly.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel is disabled or released.
    /// - A [`PwmError::PulseWidthOutOfRange`] error is returned if `pulse_width` is longer than
    ///   the current period.
    /// - A [`PwmError::Io`] error is returned if the `duty_cycle` write failed.
    pub fn set_pulse_width(&mut self, pulse_width: Duration) -> Result<(), PwmError> {
        const OPERATION: &str = "set pulse width";

        self.ensure_status(OPERATION, ChannelStatus::Enabled)?;

        let nanos = u64::try_from(pulse_width.as_nanos()).unwrap_or(u64::MAX);
        ensure!(
            nanos <= self.period_nanos,
            PulseWidthOutOfRangeSnafu {
                nanos,
                period_nanos: self.period_nanos,
            }
        );

        self.write_duty(OPERATION, nanos)
    }

    /// Zeroes and disables the output, closes the attribute files and unexports the channel.
    ///
    /// Failures while zeroing, disabling or closing are logged and otherwise ignored so that
    /// the channel always ends up unexported. The control is marked released even if
    /// unexporting failed.
    ///
    /// # Errors
    ///
    /// - A [`PwmError::InvalidState`] error is returned if the channel was already released.
    /// - A [`PwmError::Io`] error is returned if the channel could not be unexported.
    pub fn release(&mut self) -> Result<(), PwmError> {
        ensure!(
            !self.is_released(),
            InvalidStateSnafu {
                operation: "release",
                status: ChannelStatus::Released,
            }
        );

        if let Err(err) = self.set_frequency(0.0) {
            warn!("ignoring failure to zero the period: {err}");
        }
        if let Err(err) = self.set_duty_cycle(0.0) {
            warn!("ignoring failure to zero the duty cycle: {err}");
        }
        if let Err(err) = self.set_enable(false) {
            warn!("ignoring failure to disable the output: {err}");
        }

        let failed_closes = match mem::replace(&mut self.state, ChannelState::Released) {
            ChannelState::Acquired(attributes) => attributes.close(self.exporter.config()),
            ChannelState::Released => 0,
        };

        info!(
            "released {} ({failed_closes} attribute handles failed to close)",
            self.config().channel_path().display()
        );
        self.exporter.unexport()
    }

    /// Returns the state of the channel.
    #[must_use]
    pub const fn status(&self) -> ChannelStatus {
        match (&self.state, self.enabled) {
            (ChannelState::Released, _) => ChannelStatus::Released,
            (ChannelState::Acquired(_), true) => ChannelStatus::Enabled,
            (ChannelState::Acquired(_), false) => ChannelStatus::Disabled,
        }
    }

    /// Returns `true` if the output is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` if the channel was released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        matches!(self.state, ChannelState::Released)
    }

    /// Returns the last period written, in nanoseconds.
    #[must_use]
    pub const fn period_nanos(&self) -> u64 {
        self.period_nanos
    }

    /// Returns the last period written.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_nanos(self.period_nanos)
    }

    /// Returns the last duty cycle written, in nanoseconds.
    #[must_use]
    pub const fn duty_nanos(&self) -> u64 {
        self.duty_nanos
    }

    /// Returns the last polarity written.
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns the channel configuration.
    #[must_use]
    pub const fn config(&self) -> &ChipConfig {
        self.exporter.config()
    }

    fn ensure_status(
        &self,
        operation: &'static str,
        expected: ChannelStatus,
    ) -> Result<(), PwmError> {
        let status = self.status();
        ensure!(status == expected, InvalidStateSnafu { operation, status });
        Ok(())
    }

    fn write_duty(&mut self, operation: &'static str, duty_nanos: u64) -> Result<(), PwmError> {
        self.write(operation, Attribute::DutyCycle, &duty_nanos.to_string())?;
        self.duty_nanos = duty_nanos;
        Ok(())
    }

    fn write(
        &mut self,
        operation: &'static str,
        attribute: Attribute,
        value: &str,
    ) -> Result<(), PwmError> {
        let ChannelState::Acquired(attributes) = &mut self.state else {
            return InvalidStateSnafu {
                operation,
                status: ChannelStatus::Released,
            }
            .fail();
        };

        let path = self.exporter.config().attribute_path(attribute);
        debug!("writing {value:?} to {}", path.display());

        attributes
            .get_mut(attribute)
            .write_value(value)
            .context(IoSnafu { path })
    }
}

impl<F: ControlFs> fmt::Debug for PwmControl<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PwmControl")
            .field("config", self.config())
            .field("status", &self.status())
            .field("period_nanos", &self.period_nanos)
            .field("duty_nanos", &self.duty_nanos)
            .field("polarity", &self.polarity)
            .finish_non_exhaustive()
    }
}

impl<F: ControlFs> Drop for PwmControl<F> {
    fn drop(&mut self) {
        if !self.is_released() {
            if let Err(err) = self.release() {
                warn!(
                    "failed to release {} on drop: {err}",
                    self.config().channel_path().display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use pwmchip_core::mock::{MockEvent, MockFs, MockOp};

    use super::*;

    fn exported() -> (MockFs, ChipConfig) {
        let config = ChipConfig::default();
        (MockFs::new().with_exported_channel(&config), config)
    }

    fn initialized(fs: &MockFs, config: &ChipConfig, frequency: f64) -> PwmControl<MockFs> {
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();
        pwm.initialize(frequency).unwrap();
        pwm
    }

    fn attribute_writes(fs: &MockFs, config: &ChipConfig) -> usize {
        Attribute::ALL
            .iter()
            .map(|&attribute| fs.count(MockOp::Write, config.attribute_path(attribute)))
            .sum()
    }

    #[test]
    fn converts_frequency_to_rounded_period() {
        assert_eq!(period_from_frequency(1000.0).unwrap(), 1_000_000);
        assert_eq!(period_from_frequency(3.0).unwrap(), 333_333_333);
        assert_eq!(period_from_frequency(7.0).unwrap(), 142_857_143);
        assert_eq!(period_from_frequency(0.0).unwrap(), 0);

        for frequency in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                period_from_frequency(frequency),
                Err(PwmError::FrequencyOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn converts_percent_to_duty() {
        assert_eq!(duty_from_percent(1_000_000, 50.0).unwrap(), 500_000);
        assert_eq!(duty_from_percent(1_000_000, 100.0).unwrap(), 1_000_000);
        assert_eq!(duty_from_percent(1_000_000, 0.0).unwrap(), 0);
        assert_eq!(duty_from_percent(0, 75.0).unwrap(), 0);

        for percent in [-0.1, 100.1, f64::NAN] {
            assert!(matches!(
                duty_from_percent(1_000_000, percent),
                Err(PwmError::DutyCycleOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn acquire_exports_missing_channel_before_opening_attributes() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_chip(&config);

        let pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        assert_eq!(fs.writes_to(config.export_path()), ["0"]);

        let events = fs.events();
        let export = events
            .iter()
            .position(|event| *event == MockEvent::Write(config.export_path(), "0".into()))
            .unwrap();
        let first_attribute = events
            .iter()
            .position(|event| matches!(event, MockEvent::Open(path) if path.starts_with(config.channel_path())))
            .unwrap();
        assert!(export < first_attribute);

        assert_eq!(fs.open_handles(), 4);
        drop(pwm);
    }

    #[test]
    fn acquire_does_not_export_present_channel() {
        let (fs, config) = exported();

        let _pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        assert_eq!(fs.count(MockOp::Open, config.export_path()), 0);
    }

    #[test]
    fn acquire_fails_on_probe_error_without_exporting() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_chip(&config);
        fs.fail(
            config.channel_path(),
            MockOp::Probe,
            io::ErrorKind::PermissionDenied,
        );

        let result = PwmControl::acquire(fs.clone(), config.clone());

        assert!(matches!(result, Err(PwmError::Io { .. })));
        assert_eq!(fs.count(MockOp::Open, config.export_path()), 0);
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn acquire_closes_opened_attributes_on_failure() {
        for (failing, &failing_attribute) in Attribute::ALL.iter().enumerate() {
            let (fs, config) = exported();
            fs.fail(
                config.attribute_path(failing_attribute),
                MockOp::Open,
                io::ErrorKind::PermissionDenied,
            );

            let result = PwmControl::acquire(fs.clone(), config.clone());
            assert!(matches!(result, Err(PwmError::Io { .. })));
            assert_eq!(fs.open_handles(), 0);

            for (index, &attribute) in Attribute::ALL.iter().enumerate() {
                let path = config.attribute_path(attribute);
                let expected = usize::from(index < failing);

                assert_eq!(fs.count(MockOp::Open, &path), expected, "{attribute}");
                assert_eq!(fs.count(MockOp::Close, &path), expected, "{attribute}");
            }
        }
    }

    #[test]
    fn acquire_starts_disabled_and_zeroed() {
        let (fs, config) = exported();

        let pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        assert_eq!(pwm.status(), ChannelStatus::Disabled);
        assert_eq!(pwm.period_nanos(), 0);
        assert_eq!(pwm.duty_nanos(), 0);
        assert_eq!(pwm.polarity(), Polarity::Normal);
        assert_eq!(attribute_writes(&fs, &config), 0);
    }

    #[test]
    fn initialize_writes_defaults_in_order() {
        let (fs, config) = exported();
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();
        fs.clear_events();

        pwm.initialize(50.0).unwrap();

        let writes: Vec<MockEvent> = fs
            .events()
            .into_iter()
            .filter(|event| matches!(event, MockEvent::Write(..)))
            .collect();
        assert_eq!(
            writes,
            [
                MockEvent::Write(config.attribute_path(Attribute::Polarity), "normal".into()),
                MockEvent::Write(config.attribute_path(Attribute::Enable), "1".into()),
                MockEvent::Write(config.attribute_path(Attribute::Period), "20000000".into()),
                MockEvent::Write(config.attribute_path(Attribute::DutyCycle), "0".into()),
            ]
        );
        assert_eq!(pwm.status(), ChannelStatus::Enabled);
        assert_eq!(pwm.period(), Duration::from_millis(20));
    }

    #[test]
    fn initialize_stops_at_first_failure() {
        let (fs, config) = exported();
        fs.fail(
            config.attribute_path(Attribute::Enable),
            MockOp::Write,
            io::ErrorKind::Other,
        );
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        assert!(pwm.initialize(50.0).is_err());

        assert!(!pwm.is_enabled());
        assert!(fs.writes_to(config.attribute_path(Attribute::Period)).is_empty());
        assert!(fs.writes_to(config.attribute_path(Attribute::DutyCycle)).is_empty());
    }

    #[test]
    fn unchanged_frequency_is_written_once() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);

        pwm.set_frequency(1000.0).unwrap();
        pwm.set_frequency(1000.0).unwrap();

        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::Period)),
            ["20000000", "1000000"]
        );
        assert_eq!(pwm.period_nanos(), 1_000_000);
    }

    #[test]
    fn disabled_channel_rejects_duty_cycle_and_frequency() {
        let (fs, config) = exported();
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        assert!(matches!(
            pwm.set_duty_cycle(50.0),
            Err(PwmError::InvalidState {
                status: ChannelStatus::Disabled,
                ..
            })
        ));
        assert!(matches!(
            pwm.set_frequency(1000.0),
            Err(PwmError::InvalidState {
                status: ChannelStatus::Disabled,
                ..
            })
        ));
        assert!(matches!(
            pwm.set_pulse_width(Duration::ZERO),
            Err(PwmError::InvalidState { .. })
        ));

        assert_eq!(pwm.period_nanos(), 0);
        assert_eq!(pwm.duty_nanos(), 0);
        assert_eq!(attribute_writes(&fs, &config), 0);
    }

    #[test]
    fn enabled_channel_rejects_polarity() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);

        assert!(matches!(
            pwm.set_polarity_inverted(true),
            Err(PwmError::InvalidState {
                status: ChannelStatus::Enabled,
                ..
            })
        ));
        assert_eq!(pwm.polarity(), Polarity::Normal);
        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::Polarity)),
            ["normal"]
        );
    }

    #[test]
    fn polarity_changes_while_disabled() {
        let (fs, config) = exported();
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        pwm.set_polarity_inverted(true).unwrap();

        assert_eq!(pwm.polarity(), Polarity::Inverted);
        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::Polarity)),
            ["inverted"]
        );
    }

    #[test]
    fn half_duty_cycle_at_one_kilohertz() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 1000.0);

        pwm.set_duty_cycle(50.0).unwrap();

        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::DutyCycle)).last().map(String::as_str),
            Some("500000")
        );
        assert_eq!(pwm.duty_nanos(), 500_000);
    }

    #[test]
    fn duty_cycle_is_always_written() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 1000.0);

        pwm.set_duty_cycle(25.0).unwrap();
        pwm.set_duty_cycle(25.0).unwrap();

        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::DutyCycle)),
            ["0", "250000", "250000"]
        );
    }

    #[test]
    fn enabling_twice_writes_once() {
        let (fs, config) = exported();
        let mut pwm = PwmControl::acquire(fs.clone(), config.clone()).unwrap();

        pwm.set_enable(true).unwrap();
        pwm.set_enable(true).unwrap();

        assert_eq!(fs.writes_to(config.attribute_path(Attribute::Enable)), ["1"]);
    }

    #[test]
    fn out_of_range_values_are_not_written() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 1000.0);
        fs.clear_events();

        assert!(matches!(
            pwm.set_duty_cycle(150.0),
            Err(PwmError::DutyCycleOutOfRange { .. })
        ));
        assert!(matches!(
            pwm.set_frequency(-5.0),
            Err(PwmError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            pwm.set_pulse_width(Duration::from_millis(2)),
            Err(PwmError::PulseWidthOutOfRange {
                nanos: 2_000_000,
                period_nanos: 1_000_000,
            })
        ));

        assert!(fs.events().is_empty());
        assert_eq!(pwm.period_nanos(), 1_000_000);
        assert_eq!(pwm.duty_nanos(), 0);
    }

    #[test]
    fn shorter_period_zeroes_duty_cycle_first() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        pwm.set_duty_cycle(50.0).unwrap();
        fs.clear_events();

        pwm.set_frequency(1000.0).unwrap();

        assert_eq!(
            fs.events(),
            [
                MockEvent::Write(config.attribute_path(Attribute::DutyCycle), "0".into()),
                MockEvent::Write(config.attribute_path(Attribute::Period), "1000000".into()),
            ]
        );
        assert_eq!(pwm.duty_nanos(), 0);
    }

    #[test]
    fn failed_writes_keep_cached_state() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        for attribute in [Attribute::Period, Attribute::Enable] {
            fs.fail(
                config.attribute_path(attribute),
                MockOp::Write,
                io::ErrorKind::Other,
            );
        }

        assert!(matches!(pwm.set_frequency(1000.0), Err(PwmError::Io { .. })));
        assert!(matches!(pwm.set_enable(false), Err(PwmError::Io { .. })));

        assert_eq!(pwm.period_nanos(), 20_000_000);
        assert!(pwm.is_enabled());
    }

    #[test]
    fn rejected_period_restores_zeroed_duty_cycle() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        pwm.set_duty_cycle(50.0).unwrap();
        fs.fail(
            config.attribute_path(Attribute::Period),
            MockOp::Write,
            io::ErrorKind::InvalidInput,
        );

        assert!(matches!(pwm.set_frequency(1000.0), Err(PwmError::Io { .. })));

        assert_eq!(pwm.duty_nanos(), 10_000_000);
        assert_eq!(pwm.period_nanos(), 20_000_000);
        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::DutyCycle)),
            ["0", "10000000", "0", "10000000"]
        );
    }

    #[test]
    fn pulse_width_is_written_in_nanoseconds() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 1000.0);

        pwm.set_pulse_width(Duration::from_micros(250)).unwrap();

        assert_eq!(
            fs.writes_to(config.attribute_path(Attribute::DutyCycle)),
            ["0", "250000"]
        );
        assert_eq!(pwm.duty_nanos(), 250_000);
    }

    #[test]
    fn release_round_trip_unexports_channel() {
        let config = ChipConfig::default();
        let fs = MockFs::new().with_chip(&config);
        let mut pwm = initialized(&fs, &config, 50.0);

        pwm.release().unwrap();

        assert!(pwm.is_released());
        assert!(!fs.exists(config.channel_path()));
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(fs.writes_to(config.unexport_path()), ["0"]);
        assert_eq!(fs.writes_to(config.attribute_path(Attribute::Enable)), ["1", "0"]);
    }

    #[test]
    fn release_ignores_zeroing_failures() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        for attribute in [Attribute::Period, Attribute::DutyCycle, Attribute::Enable] {
            fs.fail(
                config.attribute_path(attribute),
                MockOp::Write,
                io::ErrorKind::Other,
            );
        }

        pwm.release().unwrap();

        assert!(!fs.exists(config.channel_path()));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn release_ignores_close_failures() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        fs.fail(
            config.attribute_path(Attribute::DutyCycle),
            MockOp::Close,
            io::ErrorKind::Other,
        );

        pwm.release().unwrap();

        assert_eq!(fs.open_handles(), 0);
        assert!(!fs.exists(config.channel_path()));
    }

    #[test]
    fn release_reports_unexport_failure() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        fs.fail(
            config.unexport_path(),
            MockOp::Open,
            io::ErrorKind::PermissionDenied,
        );

        match pwm.release() {
            Err(PwmError::Io { path, .. }) => assert_eq!(path, config.unexport_path()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(pwm.is_released());
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn released_channel_rejects_everything() {
        let (fs, config) = exported();
        let mut pwm = initialized(&fs, &config, 50.0);
        pwm.release().unwrap();
        fs.clear_events();

        let released = |result: Result<(), PwmError>| {
            matches!(
                result,
                Err(PwmError::InvalidState {
                    status: ChannelStatus::Released,
                    ..
                })
            )
        };

        assert!(released(pwm.set_duty_cycle(10.0)));
        assert!(released(pwm.set_frequency(100.0)));
        assert!(released(pwm.set_enable(true)));
        assert!(released(pwm.set_polarity(Polarity::Inverted)));
        assert!(released(pwm.release()));
        assert!(fs.events().is_empty());
    }

    #[test]
    fn dropping_unreleased_control_unexports_channel() {
        let (fs, config) = exported();

        drop(initialized(&fs, &config, 50.0));

        assert!(!fs.exists(config.channel_path()));
        assert_eq!(fs.open_handles(), 0);
    }
}
