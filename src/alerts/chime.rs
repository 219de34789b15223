use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

use super::AlertKind;

/// Short decaying sine chime, one tone per alert kind.
pub struct Chime {
    freq: f32,
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl Chime {
    pub fn new(freq: f32, duration_ms: u64) -> Self {
        let sample_rate = 44100u32;
        Self {
            freq,
            sample_rate,
            num_sample: 0,
            total_samples: (sample_rate as u64 * duration_ms / 1000) as usize,
        }
    }

    pub fn for_kind(kind: AlertKind) -> Self {
        match kind {
            // Work over: a high ping into the break.
            AlertKind::WorkFinished => Self::new(880.0, 900),
            // Break over: lower, back to work.
            AlertKind::BreakFinished => Self::new(660.0, 900),
            AlertKind::SessionFinished => Self::new(523.25, 1_400),
        }
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        self.num_sample += 1;

        let t = self.num_sample as f32 / self.sample_rate as f32;
        let decay = 1.0 - self.num_sample as f32 / self.total_samples as f32;
        let sample = (2.0 * PI * self.freq * t).sin();

        Some(sample * decay * 0.2) // Lower amplitude to prevent clipping
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(
            self.total_samples as u64 * 1000 / self.sample_rate as u64,
        ))
    }
}
