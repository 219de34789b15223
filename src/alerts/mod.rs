pub mod chime;
mod notify;
mod sound;
mod vibration;

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::settings::SettingsStore;
use crate::timer::{SegmentKind, SessionOutcome};

pub use notify::DesktopNotifier;
pub use sound::ChimePlayer;
pub use vibration::NoopVibration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    WorkFinished,
    BreakFinished,
    SessionFinished,
}

pub trait SoundPlayer: Send + Sync {
    fn play(&self, kind: AlertKind, volume: f32) -> Result<(), String>;
}

pub trait VibrationDriver: Send + Sync {
    fn vibrate(&self, pattern: &[u32]) -> Result<(), String>;
}

pub trait Notifier: Send + Sync {
    fn show_completion(
        &self,
        message: &str,
        mode_label: &str,
        duration_secs: u64,
    ) -> Result<(), String>;
}

const SEGMENT_PATTERN: &[u32] = &[200];
const SESSION_PATTERN: &[u32] = &[300, 100, 300];

/// Fans one timer event out to the alert collaborators. Each collaborator
/// fails independently: a broken sound device never blocks the vibration or
/// the notification, and nothing here reaches back into the engine.
pub struct AlertHub {
    sound: Box<dyn SoundPlayer>,
    vibration: Box<dyn VibrationDriver>,
    notifier: Box<dyn Notifier>,
    settings: Arc<SettingsStore>,
}

impl AlertHub {
    pub fn new(
        sound: Box<dyn SoundPlayer>,
        vibration: Box<dyn VibrationDriver>,
        notifier: Box<dyn Notifier>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            sound,
            vibration,
            notifier,
            settings,
        }
    }

    /// `new_segment` is what the session switched into.
    pub fn segment_switched(&self, new_segment: SegmentKind) {
        let kind = match new_segment {
            SegmentKind::Break => AlertKind::WorkFinished,
            SegmentKind::Work => AlertKind::BreakFinished,
        };
        let prefs = self.settings.alerts();

        if prefs.sound_enabled {
            if let Err(err) = self.sound.play(kind, prefs.volume) {
                warn!("segment alert sound failed: {err}");
            }
        }
        if let Err(err) = self.vibration.vibrate(SEGMENT_PATTERN) {
            warn!("segment alert vibration failed: {err}");
        }
    }

    pub fn session_completed(&self, outcome: &SessionOutcome) {
        let prefs = self.settings.alerts();

        if prefs.sound_enabled {
            if let Err(err) = self.sound.play(AlertKind::SessionFinished, prefs.volume) {
                warn!("completion sound failed: {err}");
            }
        }
        if let Err(err) = self.vibration.vibrate(SESSION_PATTERN) {
            warn!("completion vibration failed: {err}");
        }
        if prefs.notifications_enabled {
            let message = outcome
                .label
                .clone()
                .unwrap_or_else(|| "Session complete".to_string());
            if let Err(err) = self.notifier.show_completion(
                &message,
                outcome.mode.as_str(),
                outcome.duration_ms / 1_000,
            ) {
                warn!("completion notification failed: {err}");
            }
        }
    }
}
