use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock pause/resume arithmetic for a single timed span.
///
/// While anchored, elapsed time is `now - anchor`. Freezing stores the
/// elapsed value; unfreezing shifts the anchor forward by the frozen amount,
/// which absorbs every prior pause gap without keeping a running total.
/// Wall-clock timestamps (not `Instant`) so a span survives process restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanClock {
    anchor: Option<DateTime<Utc>>,
    frozen_ms: u64,
    paused_at: Option<DateTime<Utc>>,
}

fn delta_ms(later: DateTime<Utc>, earlier: DateTime<Utc>) -> u64 {
    (later - earlier).num_milliseconds().max(0) as u64
}

impl SpanClock {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            anchor: Some(now),
            frozen_ms: 0,
            paused_at: None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    pub fn frozen_ms(&self) -> u64 {
        self.frozen_ms
    }

    /// Wall-clock instant of the most recent freeze; `None` while anchored.
    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// Elapsed milliseconds for this span, clamped at zero.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.anchor {
            Some(anchor) => delta_ms(now, anchor),
            None => self.frozen_ms,
        }
    }

    /// Freeze the span at `now`. Does nothing when already frozen; the
    /// owning state machine guards the lifecycle.
    pub fn freeze(&mut self, now: DateTime<Utc>) {
        if let Some(anchor) = self.anchor.take() {
            self.frozen_ms = delta_ms(now, anchor);
            self.paused_at = Some(now);
        }
    }

    /// Re-anchor a frozen span at `now` and return the real pause gap in
    /// milliseconds. The new anchor is `now - frozen`, so a later
    /// `elapsed_ms` read stays correct across any number of freeze/unfreeze
    /// cycles. Returns 0 when the span was not frozen.
    pub fn unfreeze(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(paused_at) = self.paused_at.take() else {
            return 0;
        };
        self.anchor = Some(now - Duration::milliseconds(self.frozen_ms as i64));
        self.frozen_ms = 0;
        delta_ms(now, paused_at)
    }

    /// Fresh anchor for a new segment; discards all accumulated state.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        *self = Self::start(now);
    }

    /// Rebuild a running span whose elapsed time is already known, anchored
    /// so that `elapsed_ms(now)` equals `elapsed_ms` immediately.
    pub(crate) fn rehydrate_running(now: DateTime<Utc>, elapsed_ms: u64) -> Self {
        Self {
            anchor: Some(now - Duration::milliseconds(elapsed_ms as i64)),
            frozen_ms: 0,
            paused_at: None,
        }
    }

    /// Rebuild a span frozen at a known elapsed value and pause instant.
    pub(crate) fn rehydrate_frozen(frozen_ms: u64, paused_at: DateTime<Utc>) -> Self {
        Self {
            anchor: None,
            frozen_ms,
            paused_at: Some(paused_at),
        }
    }
}
