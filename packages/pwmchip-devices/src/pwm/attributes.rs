use log::warn;
use pwmchip_core::{Attribute, AttributeWrite, ChipConfig, ControlFs};
use snafu::ResultExt;

use crate::{IoSnafu, PwmError};

/// The four open attribute handles of an exported channel.
///
/// Handles are only ever held as a complete set: either all four are open or the value does
/// not exist.
#[derive(Debug)]
pub(crate) struct Attributes<A> {
    enable: A,
    period: A,
    duty_cycle: A,
    polarity: A,
}

impl<A: AttributeWrite> Attributes<A> {
    /// Opens every attribute of the channel, in [`Attribute::ALL`] order.
    ///
    /// If any open fails, the handles opened before it are dropped and therefore closed.
    pub(crate) fn open<F>(fs: &F, config: &ChipConfig) -> Result<Self, PwmError>
    where
        F: ControlFs<Attribute = A>,
    {
        let open = |attribute: Attribute| -> Result<A, PwmError> {
            let path = config.attribute_path(attribute);
            fs.open_attribute(&path).context(IoSnafu { path })
        };

        Ok(Self {
            enable: open(Attribute::Enable)?,
            period: open(Attribute::Period)?,
            duty_cycle: open(Attribute::DutyCycle)?,
            polarity: open(Attribute::Polarity)?,
        })
    }

    pub(crate) fn get_mut(&mut self, attribute: Attribute) -> &mut A {
        match attribute {
            Attribute::Enable => &mut self.enable,
            Attribute::Period => &mut self.period,
            Attribute::DutyCycle => &mut self.duty_cycle,
            Attribute::Polarity => &mut self.polarity,
        }
    }

    /// Closes every handle. A failed close is logged and does not stop the others.
    ///
    /// Returns the number of handles that failed to close.
    pub(crate) fn close(self, config: &ChipConfig) -> usize {
        let Self {
            enable,
            period,
            duty_cycle,
            polarity,
        } = self;

        [
            (Attribute::Enable, enable),
            (Attribute::Period, period),
            (Attribute::DutyCycle, duty_cycle),
            (Attribute::Polarity, polarity),
        ]
        .into_iter()
        .map(|(attribute, handle)| match handle.close() {
            Ok(()) => 0,
            Err(err) => {
                warn!(
                    "failed to close {}: {err}",
                    config.attribute_path(attribute).display()
                );
                1
            }
        })
        .sum()
    }
}
