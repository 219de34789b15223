use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::TimerError;
use super::state::{Lifecycle, SegmentKind, TimerMode, TimerSession};

/// Validated parameters for `TimerSession::start`.
#[derive(Debug, Clone, PartialEq)]
pub enum StartConfig {
    Stopwatch,
    Countdown {
        duration_ms: u64,
    },
    Intervals {
        work_ms: u64,
        break_ms: u64,
        target_cycles: Option<u32>,
        label: Option<String>,
    },
}

impl StartConfig {
    pub fn mode(&self) -> TimerMode {
        match self {
            StartConfig::Stopwatch => TimerMode::Stopwatch,
            StartConfig::Countdown { .. } => TimerMode::Countdown,
            StartConfig::Intervals { .. } => TimerMode::Intervals,
        }
    }

    pub fn validate(&self) -> Result<(), TimerError> {
        match self {
            StartConfig::Stopwatch => Ok(()),
            StartConfig::Countdown { duration_ms } => {
                if *duration_ms == 0 {
                    return Err(TimerError::InvalidDuration);
                }
                Ok(())
            }
            StartConfig::Intervals {
                work_ms,
                break_ms,
                target_cycles,
                ..
            } => {
                if *work_ms == 0 || *break_ms == 0 {
                    return Err(TimerError::InvalidDuration);
                }
                if *target_cycles == Some(0) {
                    return Err(TimerError::InvalidCycleCount);
                }
                Ok(())
            }
        }
    }
}

/// Fractional minutes from the UI into whole milliseconds. NaN, infinities
/// and non-positive values are configuration errors.
pub fn minutes_to_ms(minutes: f64) -> Result<u64, TimerError> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(TimerError::InvalidDuration);
    }
    Ok((minutes * 60_000.0).round() as u64)
}

/// Per-tick view of the session for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub lifecycle: Lifecycle,
    pub mode: TimerMode,
    /// Elapsed for the current segment.
    pub elapsed_ms: u64,
    /// `None` for stopwatch, which has no target.
    pub remaining_ms: Option<u64>,
    /// Segment progress in `0.0..=1.0`; `None` for stopwatch.
    pub progress: Option<f64>,
    pub segment: Option<SegmentKind>,
    pub completed_cycles: u32,
    pub target_cycles: Option<u32>,
    pub session_duration_ms: u64,
    pub label: Option<String>,
}

pub fn display_state(session: &TimerSession, now: DateTime<Utc>) -> DisplayState {
    let elapsed = session.segment_elapsed_ms(now);
    let remaining = session
        .segment_target_ms
        .map(|target| target.saturating_sub(elapsed));
    let progress = session
        .segment_target_ms
        .filter(|target| *target > 0)
        .map(|target| (elapsed as f64 / target as f64).min(1.0));

    DisplayState {
        lifecycle: session.lifecycle,
        mode: session.mode,
        elapsed_ms: elapsed,
        remaining_ms: remaining,
        progress,
        segment: session.current_segment,
        completed_cycles: session.completed_cycles,
        target_cycles: session.target_cycles,
        session_duration_ms: session.session_duration_ms(now),
        label: session.label.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rollover {
    None,
    SwitchedTo(SegmentKind),
    Complete,
}

/// Decide what an exhausted segment rolls into. The switch restarts the
/// span and retargets in the same mutation, so a second tick at the same
/// instant observes the new segment with time remaining — duplicate
/// boundary processing is impossible by construction.
pub(crate) fn roll_segment(session: &mut TimerSession, now: DateTime<Utc>) -> Rollover {
    let Some(target) = session.segment_target_ms else {
        return Rollover::None;
    };
    if session.segment_elapsed_ms(now) < target {
        return Rollover::None;
    }

    match session.mode {
        TimerMode::Stopwatch => Rollover::None,
        TimerMode::Countdown => Rollover::Complete,
        TimerMode::Intervals => match session.current_segment {
            Some(SegmentKind::Work) => {
                // Work done: into the break. A cycle is a work+break pair,
                // so nothing is counted yet.
                session.current_segment = Some(SegmentKind::Break);
                session.segment_target_ms = session.break_ms;
                session.span.restart(now);
                Rollover::SwitchedTo(SegmentKind::Break)
            }
            Some(SegmentKind::Break) => {
                // Break done: a full cycle just finished. The loop target is
                // checked here, on the break boundary, not on work -> break.
                let finished_cycles = session.completed_cycles + 1;
                session.completed_cycles = finished_cycles;
                if session
                    .target_cycles
                    .is_some_and(|target| finished_cycles >= target)
                {
                    Rollover::Complete
                } else {
                    session.current_segment = Some(SegmentKind::Work);
                    session.segment_target_ms = session.work_ms;
                    session.span.restart(now);
                    Rollover::SwitchedTo(SegmentKind::Work)
                }
            }
            None => Rollover::None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::state::{SessionOutcome, TickOutcome};
    use chrono::Duration;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn base() -> DateTime<Utc> {
        fixed_time("2026-03-01T09:00:00Z")
    }

    fn minutes(n: i64) -> Duration {
        Duration::minutes(n)
    }

    fn pomodoro(target_cycles: Option<u32>) -> StartConfig {
        StartConfig::Intervals {
            work_ms: 25 * 60_000,
            break_ms: 5 * 60_000,
            target_cycles,
            label: Some("deep work".into()),
        }
    }

    #[test]
    fn minutes_conversion_rejects_bad_input() {
        assert_eq!(minutes_to_ms(0.0), Err(TimerError::InvalidDuration));
        assert_eq!(minutes_to_ms(-5.0), Err(TimerError::InvalidDuration));
        assert_eq!(minutes_to_ms(f64::NAN), Err(TimerError::InvalidDuration));
        assert_eq!(minutes_to_ms(f64::INFINITY), Err(TimerError::InvalidDuration));
        assert_eq!(minutes_to_ms(25.0), Ok(1_500_000));
        assert_eq!(minutes_to_ms(0.5), Ok(30_000));
    }

    #[test]
    fn intervals_config_validation() {
        let bad_work = StartConfig::Intervals {
            work_ms: 0,
            break_ms: 300_000,
            target_cycles: None,
            label: None,
        };
        assert_eq!(bad_work.validate(), Err(TimerError::InvalidDuration));

        let bad_cycles = StartConfig::Intervals {
            work_ms: 1_500_000,
            break_ms: 300_000,
            target_cycles: Some(0),
            label: None,
        };
        assert_eq!(bad_cycles.validate(), Err(TimerError::InvalidCycleCount));

        assert!(pomodoro(Some(4)).validate().is_ok());
    }

    #[test]
    fn countdown_completes_at_target() {
        let mut session = TimerSession::new();
        session
            .start(StartConfig::Countdown { duration_ms: 60_000 }, base())
            .unwrap();

        assert_eq!(session.tick(base() + minutes(0)), TickOutcome::Progress);
        match session.tick(base() + minutes(1)) {
            TickOutcome::Completed(SessionOutcome { duration_ms, .. }) => {
                assert_eq!(duration_ms, 60_000)
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(session.lifecycle, Lifecycle::Idle);
    }

    #[test]
    fn work_to_break_switch_does_not_count_a_cycle() {
        let mut session = TimerSession::new();
        session.start(pomodoro(Some(2)), base()).unwrap();

        assert_eq!(
            session.tick(base() + minutes(25)),
            TickOutcome::SegmentSwitched(SegmentKind::Break)
        );
        assert_eq!(session.completed_cycles, 0);
        assert_eq!(session.segment_target_ms, Some(5 * 60_000));
    }

    #[test]
    fn two_cycle_session_completes_after_the_second_break() {
        let mut session = TimerSession::new();
        session.start(pomodoro(Some(2)), base()).unwrap();

        assert_eq!(
            session.tick(base() + minutes(25)),
            TickOutcome::SegmentSwitched(SegmentKind::Break)
        );
        // First break ends: one cycle done, session keeps going.
        assert_eq!(
            session.tick(base() + minutes(30)),
            TickOutcome::SegmentSwitched(SegmentKind::Work)
        );
        assert_eq!(session.completed_cycles, 1);
        assert_eq!(
            session.tick(base() + minutes(55)),
            TickOutcome::SegmentSwitched(SegmentKind::Break)
        );

        match session.tick(base() + minutes(60)) {
            TickOutcome::Completed(outcome) => {
                assert_eq!(outcome.completed_cycles, 2);
                assert_eq!(outcome.target_cycles, Some(2));
                assert_eq!(outcome.duration_ms, 60 * 60_000);
                assert_eq!(outcome.label.as_deref(), Some("deep work"));
            }
            other => panic!("expected completion, got {other:?}"),
        }

        // Completion fired exactly once; the session is gone.
        assert_eq!(session.lifecycle, Lifecycle::Idle);
        assert_eq!(session.tick(base() + minutes(61)), TickOutcome::Ignored);
    }

    #[test]
    fn untargeted_intervals_loop_forever() {
        let mut session = TimerSession::new();
        session.start(pomodoro(None), base()).unwrap();

        for cycle in 1..=3 {
            let work_end = base() + minutes(30 * cycle - 5);
            let break_end = base() + minutes(30 * cycle);
            assert_eq!(
                session.tick(work_end),
                TickOutcome::SegmentSwitched(SegmentKind::Break)
            );
            assert_eq!(
                session.tick(break_end),
                TickOutcome::SegmentSwitched(SegmentKind::Work)
            );
            assert_eq!(session.completed_cycles, cycle as u32);
        }
    }

    #[test]
    fn double_tick_at_boundary_switches_once() {
        let mut session = TimerSession::new();
        session.start(pomodoro(Some(2)), base()).unwrap();

        let boundary = base() + minutes(25);
        assert_eq!(
            session.tick(boundary),
            TickOutcome::SegmentSwitched(SegmentKind::Break)
        );
        // Same instant again: the new segment has its full target left.
        assert_eq!(session.tick(boundary), TickOutcome::Progress);
        assert_eq!(session.current_segment, Some(SegmentKind::Break));
        assert_eq!(session.completed_cycles, 0);
    }

    #[test]
    fn pause_during_break_stretches_the_boundary() {
        let mut session = TimerSession::new();
        session.start(pomodoro(None), base()).unwrap();
        session.tick(base() + minutes(25));

        session.pause(base() + minutes(27)).unwrap();
        session.resume(base() + minutes(37)).unwrap();

        // 2 of 5 break minutes were used before the pause.
        assert_eq!(session.tick(base() + minutes(39)), TickOutcome::Progress);
        assert_eq!(
            session.tick(base() + minutes(40)),
            TickOutcome::SegmentSwitched(SegmentKind::Work)
        );
        assert_eq!(session.total_paused_ms, 10 * 60_000);
    }

    #[test]
    fn stopwatch_never_completes() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        assert_eq!(session.tick(base() + minutes(600)), TickOutcome::Progress);
        assert_eq!(session.lifecycle, Lifecycle::Running);
    }

    #[test]
    fn display_state_reports_segment_and_session_clocks() {
        let mut session = TimerSession::new();
        session.start(pomodoro(Some(4)), base()).unwrap();
        session.tick(base() + minutes(25));

        let display = display_state(&session, base() + minutes(26));
        assert_eq!(display.mode, TimerMode::Intervals);
        assert_eq!(display.segment, Some(SegmentKind::Break));
        assert_eq!(display.elapsed_ms, 60_000);
        assert_eq!(display.remaining_ms, Some(4 * 60_000));
        assert_eq!(display.progress, Some(0.2));
        assert_eq!(display.session_duration_ms, 26 * 60_000);
    }

    #[test]
    fn stopwatch_display_has_no_target() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        let display = display_state(&session, base() + minutes(2));
        assert_eq!(display.remaining_ms, None);
        assert_eq!(display.progress, None);
        assert_eq!(display.elapsed_ms, 2 * 60_000);
    }
}
