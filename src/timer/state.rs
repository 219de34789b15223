use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::SpanClock;
use super::error::TimerError;
use super::modes::{self, Rollover, StartConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Idle,
    Running,
    Paused,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Idle
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Stopwatch,
    Countdown,
    Intervals,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Countdown
    }
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Stopwatch => "Stopwatch",
            TimerMode::Countdown => "Countdown",
            TimerMode::Intervals => "Intervals",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    Work,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub ordinal: u32,
    pub elapsed_at_lap_ms: u64,
    pub split_ms: u64,
}

/// What a completed or killed session amounts to; handed to history and
/// shipped in completion events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub mode: TimerMode,
    pub duration_ms: u64,
    pub completed_cycles: u32,
    pub target_cycles: Option<u32>,
    pub label: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Tick arrived while not running (stray late tick, or paused).
    Ignored,
    Progress,
    SegmentSwitched(SegmentKind),
    Completed(SessionOutcome),
}

/// The single live timing session. All operations take `now` so the state
/// machine is deterministic under test; only the controller samples the
/// real clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub lifecycle: Lifecycle,
    pub mode: TimerMode,
    /// Clock for the current segment. Segment switches restart it; the
    /// session-wide fields below do not move.
    pub span: SpanClock,
    pub session_start: Option<DateTime<Utc>>,
    /// Cumulative pause time across the whole session. Updated exactly once
    /// per resume, by the length of the immediately preceding pause.
    pub total_paused_ms: u64,
    pub segment_target_ms: Option<u64>,
    pub current_segment: Option<SegmentKind>,
    pub completed_cycles: u32,
    pub work_ms: Option<u64>,
    pub break_ms: Option<u64>,
    pub target_cycles: Option<u32>,
    pub label: Option<String>,
    /// Most-recent-first.
    pub laps: Vec<Lap>,
}

impl TimerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session from `Idle`. The config is validated before any
    /// field changes, so a rejected start leaves no partial state.
    pub fn start(&mut self, config: StartConfig, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.lifecycle != Lifecycle::Idle {
            return Err(TimerError::AlreadyRunning);
        }
        config.validate()?;

        *self = Self {
            lifecycle: Lifecycle::Running,
            mode: config.mode(),
            span: SpanClock::start(now),
            session_start: Some(now),
            ..Self::default()
        };

        match config {
            StartConfig::Stopwatch => {}
            StartConfig::Countdown { duration_ms } => {
                self.segment_target_ms = Some(duration_ms);
            }
            StartConfig::Intervals {
                work_ms,
                break_ms,
                target_cycles,
                label,
            } => {
                self.segment_target_ms = Some(work_ms);
                self.current_segment = Some(SegmentKind::Work);
                self.work_ms = Some(work_ms);
                self.break_ms = Some(break_ms);
                self.target_cycles = target_cycles;
                self.label = label;
            }
        }

        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.lifecycle != Lifecycle::Running {
            return Err(TimerError::NotRunning);
        }
        self.span.freeze(now);
        self.lifecycle = Lifecycle::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.lifecycle != Lifecycle::Paused {
            return Err(TimerError::NotPaused);
        }
        let pause_gap = self.span.unfreeze(now);
        self.total_paused_ms += pause_gap;
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Advance the session against the wall clock. Only meaningful while
    /// `Running`; any other state is reported as `Ignored` so stray ticks
    /// after a kill or segment switch are harmless.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.lifecycle != Lifecycle::Running {
            return TickOutcome::Ignored;
        }
        match modes::roll_segment(self, now) {
            Rollover::None => TickOutcome::Progress,
            Rollover::SwitchedTo(segment) => TickOutcome::SegmentSwitched(segment),
            Rollover::Complete => TickOutcome::Completed(self.finish(now)),
        }
    }

    /// End the session manually. Always succeeds; from `Idle` it returns a
    /// zero-duration outcome.
    pub fn kill(&mut self, now: DateTime<Utc>) -> SessionOutcome {
        let outcome = self.outcome(now);
        self.reset();
        outcome
    }

    /// Abandon the session without computing anything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add_lap(&mut self, now: DateTime<Utc>) -> Result<Lap, TimerError> {
        if self.lifecycle != Lifecycle::Running || self.mode != TimerMode::Stopwatch {
            return Err(TimerError::LapUnavailable);
        }
        let elapsed = self.segment_elapsed_ms(now);
        let split = match self.laps.first() {
            Some(latest) => elapsed.saturating_sub(latest.elapsed_at_lap_ms),
            None => elapsed,
        };
        let lap = Lap {
            ordinal: self.laps.len() as u32 + 1,
            elapsed_at_lap_ms: elapsed,
            split_ms: split,
        };
        self.laps.insert(0, lap.clone());
        Ok(lap)
    }

    pub fn segment_elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        self.span.elapsed_ms(now)
    }

    /// Whole-session active duration: wall time since the session started,
    /// minus everything spent paused. While paused there is no live "now"
    /// for the open span, so the pause instant caps the window — which is
    /// why kill-at-T and kill-later-while-still-paused agree.
    pub fn session_duration_ms(&self, now: DateTime<Utc>) -> u64 {
        let Some(start) = self.session_start else {
            return 0;
        };
        let end = match self.lifecycle {
            Lifecycle::Running => now,
            Lifecycle::Paused => self.span.paused_at().unwrap_or(now),
            Lifecycle::Idle => return 0,
        };
        let gross = (end - start).num_milliseconds().max(0) as u64;
        gross.saturating_sub(self.total_paused_ms)
    }

    fn outcome(&self, now: DateTime<Utc>) -> SessionOutcome {
        SessionOutcome {
            mode: self.mode,
            duration_ms: self.session_duration_ms(now),
            completed_cycles: self.completed_cycles,
            target_cycles: self.target_cycles,
            label: self.label.clone(),
            started_at: self.session_start,
        }
    }

    /// Natural completion. Tick latency can overshoot the target, so the
    /// reported duration is capped at the nominal session length.
    pub(crate) fn finish(&mut self, now: DateTime<Utc>) -> SessionOutcome {
        let mut outcome = self.outcome(now);
        if let Some(nominal) = self.nominal_duration_ms() {
            outcome.duration_ms = outcome.duration_ms.min(nominal);
        }
        self.reset();
        outcome
    }

    fn nominal_duration_ms(&self) -> Option<u64> {
        match self.mode {
            TimerMode::Stopwatch => None,
            TimerMode::Countdown => self.segment_target_ms,
            TimerMode::Intervals => self
                .work_ms
                .zip(self.break_ms)
                .map(|(work, brk)| (work + brk) * self.completed_cycles as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn base() -> DateTime<Utc> {
        fixed_time("2026-03-01T09:00:00Z")
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn countdown(duration_ms: u64) -> StartConfig {
        StartConfig::Countdown { duration_ms }
    }

    #[test]
    fn start_rejects_active_session() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        assert_eq!(
            session.start(countdown(60_000), base() + ms(100)),
            Err(TimerError::AlreadyRunning)
        );
        // The running stopwatch is untouched.
        assert_eq!(session.mode, TimerMode::Stopwatch);
        assert_eq!(session.lifecycle, Lifecycle::Running);
    }

    #[test]
    fn start_rejects_zero_duration_without_state_change() {
        let mut session = TimerSession::new();
        assert_eq!(
            session.start(countdown(0), base()),
            Err(TimerError::InvalidDuration)
        );
        assert_eq!(session, TimerSession::default());
    }

    #[test]
    fn pause_requires_running_and_resume_requires_paused() {
        let mut session = TimerSession::new();
        assert_eq!(session.pause(base()), Err(TimerError::NotRunning));
        assert_eq!(session.resume(base()), Err(TimerError::NotPaused));

        session.start(countdown(60_000), base()).unwrap();
        assert_eq!(session.resume(base() + ms(100)), Err(TimerError::NotPaused));
        session.pause(base() + ms(1_000)).unwrap();
        assert_eq!(
            session.pause(base() + ms(2_000)),
            Err(TimerError::NotRunning)
        );
    }

    #[test]
    fn resume_accounts_pause_gap_exactly_once() {
        let mut session = TimerSession::new();
        session.start(countdown(600_000), base()).unwrap();
        session.pause(base() + ms(10_000)).unwrap();
        session.resume(base() + ms(40_000)).unwrap();
        assert_eq!(session.total_paused_ms, 30_000);

        session.pause(base() + ms(50_000)).unwrap();
        session.resume(base() + ms(55_000)).unwrap();
        assert_eq!(session.total_paused_ms, 35_000);

        // Segment clock only counted the running stretches.
        assert_eq!(session.segment_elapsed_ms(base() + ms(60_000)), 25_000);
        assert_eq!(session.session_duration_ms(base() + ms(60_000)), 25_000);
    }

    #[test]
    fn kill_duration_does_not_advance_while_paused() {
        let mut session = TimerSession::new();
        session.start(countdown(600_000), base()).unwrap();
        session.pause(base() + ms(20_000)).unwrap();

        let at_pause = session.clone().kill(base() + ms(20_000));
        let much_later = session.clone().kill(base() + ms(500_000));
        assert_eq!(at_pause.duration_ms, 20_000);
        assert_eq!(at_pause.duration_ms, much_later.duration_ms);
    }

    #[test]
    fn kill_duration_agrees_across_the_pause_boundary() {
        let mut session = TimerSession::new();
        session.start(countdown(600_000), base()).unwrap();
        session.pause(base() + ms(15_000)).unwrap();
        session.resume(base() + ms(25_000)).unwrap();

        // Running at T and paused at T must report the same duration.
        let running = session.session_duration_ms(base() + ms(30_000));
        session.pause(base() + ms(30_000)).unwrap();
        let paused = session.session_duration_ms(base() + ms(30_000));
        assert_eq!(running, paused);
        assert_eq!(paused, 20_000);
    }

    #[test]
    fn kill_from_idle_is_a_zero_duration_no_op() {
        let mut session = TimerSession::new();
        let outcome = session.kill(base());
        assert_eq!(outcome.duration_ms, 0);
        assert_eq!(outcome.completed_cycles, 0);
        assert_eq!(session.lifecycle, Lifecycle::Idle);
    }

    #[test]
    fn stray_tick_after_kill_is_ignored() {
        let mut session = TimerSession::new();
        session.start(countdown(1_000), base()).unwrap();
        session.kill(base() + ms(500));
        assert_eq!(session.tick(base() + ms(600)), TickOutcome::Ignored);
    }

    #[test]
    fn tick_while_paused_is_ignored() {
        let mut session = TimerSession::new();
        session.start(countdown(60_000), base()).unwrap();
        session.pause(base() + ms(1_000)).unwrap();
        assert_eq!(session.tick(base() + ms(2_000)), TickOutcome::Ignored);
    }

    #[test]
    fn lap_ordering_most_recent_first() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        session.add_lap(base() + ms(10_000)).unwrap();
        session.add_lap(base() + ms(25_000)).unwrap();
        session.add_lap(base() + ms(40_000)).unwrap();

        let splits: Vec<u64> = session.laps.iter().map(|lap| lap.split_ms).collect();
        assert_eq!(splits, vec![15_000, 15_000, 10_000]);
        let ordinals: Vec<u32> = session.laps.iter().map(|lap| lap.ordinal).collect();
        assert_eq!(ordinals, vec![3, 2, 1]);
    }

    #[test]
    fn first_lap_split_equals_its_elapsed() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        let lap = session.add_lap(base() + ms(7_500)).unwrap();
        assert_eq!(lap.elapsed_at_lap_ms, 7_500);
        assert_eq!(lap.split_ms, 7_500);
    }

    #[test]
    fn laps_rejected_outside_running_stopwatch() {
        let mut session = TimerSession::new();
        assert_eq!(session.add_lap(base()), Err(TimerError::LapUnavailable));

        session.start(countdown(60_000), base()).unwrap();
        assert_eq!(
            session.add_lap(base() + ms(1_000)),
            Err(TimerError::LapUnavailable)
        );

        session.reset();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        session.pause(base() + ms(1_000)).unwrap();
        assert_eq!(
            session.add_lap(base() + ms(2_000)),
            Err(TimerError::LapUnavailable)
        );
    }

    #[test]
    fn elapsed_never_negative_across_operations() {
        let mut session = TimerSession::new();
        session.start(StartConfig::Stopwatch, base()).unwrap();
        // Observation before the anchor (clock skew) clamps to zero.
        assert_eq!(session.segment_elapsed_ms(base() - ms(5_000)), 0);
        session.pause(base() + ms(3_000)).unwrap();
        session.resume(base() + ms(9_000)).unwrap();
        assert_eq!(session.segment_elapsed_ms(base() + ms(1_000)), 0);
    }
}
