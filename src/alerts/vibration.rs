use log::debug;

use super::VibrationDriver;

/// Desktop hardware has no vibration motor; the pattern is only logged.
pub struct NoopVibration;

impl VibrationDriver for NoopVibration {
    fn vibrate(&self, pattern: &[u32]) -> Result<(), String> {
        debug!("vibration pattern {pattern:?} requested (no motor on this platform)");
        Ok(())
    }
}
