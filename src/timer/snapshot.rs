use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::clock::SpanClock;
use super::state::{Lap, Lifecycle, SegmentKind, TimerMode, TimerSession};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Serializable image of a live session.
///
/// Time is stored in its frozen representation: a running session keeps the
/// absolute anchor timestamp (so elapsed keeps accruing through however long
/// the process is gone), a paused one keeps the frozen elapsed value plus
/// the pause instant. `session_start` is not stored; restore reconstructs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub mode: TimerMode,
    pub lifecycle: Lifecycle,
    pub anchor_start: Option<DateTime<Utc>>,
    pub frozen_elapsed_ms: Option<u64>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_ms: u64,
    pub segment_target_ms: Option<u64>,
    pub current_segment: Option<SegmentKind>,
    pub completed_cycles: u32,
    pub work_ms: Option<u64>,
    pub break_ms: Option<u64>,
    pub target_cycles: Option<u32>,
    pub label: Option<String>,
    #[serde(default)]
    pub laps: Vec<Lap>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// `None` when there is nothing worth persisting (idle).
    pub fn capture(session: &TimerSession, now: DateTime<Utc>) -> Option<Self> {
        match session.lifecycle {
            Lifecycle::Idle => None,
            Lifecycle::Running | Lifecycle::Paused => Some(Self {
                schema_version: SNAPSHOT_SCHEMA_VERSION,
                mode: session.mode,
                lifecycle: session.lifecycle,
                anchor_start: session.span.anchor(),
                frozen_elapsed_ms: match session.lifecycle {
                    Lifecycle::Paused => Some(session.span.frozen_ms()),
                    _ => None,
                },
                paused_at: session.span.paused_at(),
                total_paused_ms: session.total_paused_ms,
                segment_target_ms: session.segment_target_ms,
                current_segment: session.current_segment,
                completed_cycles: session.completed_cycles,
                work_ms: session.work_ms,
                break_ms: session.break_ms,
                target_cycles: session.target_cycles,
                label: session.label.clone(),
                laps: session.laps.clone(),
                captured_at: now,
            }),
        }
    }

    /// Rebuild a live session against the current wall clock, however much
    /// real time passed since capture. `None` means the snapshot is stale
    /// (the segment ran out while unobserved) or malformed; the caller
    /// falls back to `Idle` and fires no retroactive side effects.
    pub fn restore(&self, now: DateTime<Utc>) -> Option<TimerSession> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            warn!(
                "discarding timer snapshot with unknown schema version {}",
                self.schema_version
            );
            return None;
        }

        let elapsed = match self.lifecycle {
            Lifecycle::Idle => return None,
            Lifecycle::Paused => self.frozen_elapsed_ms?,
            Lifecycle::Running => {
                let anchor = self.anchor_start?;
                (now - anchor).num_milliseconds().max(0) as u64
            }
        };

        // For targeted modes the away-gap may have consumed the segment.
        match self.mode {
            TimerMode::Stopwatch => {}
            TimerMode::Countdown | TimerMode::Intervals => {
                let target = self.segment_target_ms?;
                if target == 0 || elapsed >= target {
                    return None;
                }
            }
        }
        if self.mode == TimerMode::Intervals
            && (self.current_segment.is_none() || self.work_ms.is_none() || self.break_ms.is_none())
        {
            return None;
        }

        let span = match self.lifecycle {
            Lifecycle::Running => SpanClock::rehydrate_running(now, elapsed),
            Lifecycle::Paused => SpanClock::rehydrate_frozen(elapsed, self.paused_at?),
            Lifecycle::Idle => unreachable!(),
        };

        // Best-effort session start. Single-segment modes are exact (the
        // whole pause total belongs to the one segment); intervals cannot
        // reconstruct pause timing inside completed segments, so prior
        // cycles are assumed to have run at their nominal length.
        let reference = match self.lifecycle {
            Lifecycle::Running => now,
            Lifecycle::Paused => self.paused_at?,
            Lifecycle::Idle => unreachable!(),
        };
        let backdate_ms = match self.mode {
            TimerMode::Stopwatch | TimerMode::Countdown => elapsed + self.total_paused_ms,
            TimerMode::Intervals => {
                let cycle_ms = self.work_ms.unwrap_or(0) + self.break_ms.unwrap_or(0);
                elapsed + self.completed_cycles as u64 * cycle_ms
            }
        };
        let session_start = reference - Duration::milliseconds(backdate_ms as i64);

        Some(TimerSession {
            lifecycle: self.lifecycle,
            mode: self.mode,
            span,
            session_start: Some(session_start),
            total_paused_ms: self.total_paused_ms,
            segment_target_ms: self.segment_target_ms,
            current_segment: self.current_segment,
            completed_cycles: self.completed_cycles,
            work_ms: self.work_ms,
            break_ms: self.break_ms,
            target_cycles: self.target_cycles,
            label: self.label.clone(),
            laps: self.laps.clone(),
        })
    }
}
