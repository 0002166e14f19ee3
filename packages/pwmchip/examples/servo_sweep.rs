//! Sweeps a hobby servo from 0 to 180 degrees and back.
//!
//! Usage: `servo_sweep [CHIP] [CHANNEL]`, defaulting to `pwmchip0/pwm0`.

use std::{env, thread, time::Duration};

use pwmchip::prelude::*;

fn main() -> Result<(), PwmError> {
    let mut args = env::args().skip(1).map(|arg| arg.parse::<u32>());
    let chip = args.next().and_then(Result::ok).unwrap_or(0);
    let channel = args.next().and_then(Result::ok).unwrap_or(0);

    let config = ChipConfig::default().with_chip(chip).with_channel(channel);
    println!("Sweeping servo on {}", config.channel_path().display());

    let mut servo = PwmOutput::with_frequency(SysFs, config, 50.0);

    for angle in (0..=180).step_by(10).chain((0..180).step_by(10).rev()) {
        servo.servo_write(angle)?;
        thread::sleep(Duration::from_millis(100));
    }

    servo.finalize()
}
