use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};

use tauri::{AppHandle, Emitter};

use crate::{alerts::AlertHub, history::Database, models::SessionRecord};

use super::{
    modes::{self, DisplayState, StartConfig},
    snapshot::Snapshot,
    state::{Lap, Lifecycle, SegmentKind, SessionOutcome, TickOutcome, TimerSession},
    store::SnapshotStore,
};

#[derive(Debug, Serialize, Clone)]
pub struct TimerView {
    pub state: TimerSession,
    pub display: DisplayState,
}

#[derive(Serialize, Clone)]
struct TimerStateChangedEvent {
    state: TimerSession,
    display: DisplayState,
}

#[derive(Serialize, Clone)]
struct TimerTickEvent {
    display: DisplayState,
}

#[derive(Serialize, Clone)]
struct SegmentSwitchedEvent {
    segment: SegmentKind,
    display: DisplayState,
}

#[derive(Serialize, Clone)]
struct SessionCompletedEvent {
    outcome: SessionOutcome,
    record: SessionRecord,
}

#[derive(Serialize, Clone)]
struct SessionStoppedEvent {
    outcome: SessionOutcome,
}

/// Drives the timer state machine against the real clock. All mutation goes
/// through the session mutex; the ticker samples wall time every 250 ms and
/// collaborator side effects run strictly after the state transition, so
/// they can never delay or roll one back.
#[derive(Clone)]
pub struct TimerController {
    session: Arc<Mutex<TimerSession>>,
    history: Database,
    snapshots: SnapshotStore,
    alerts: Arc<AlertHub>,
    app_handle: AppHandle,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl TimerController {
    pub fn new(
        app_handle: AppHandle,
        history: Database,
        snapshots: SnapshotStore,
        alerts: Arc<AlertHub>,
    ) -> Self {
        let debug_mode = std::env::var("CADENCE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            session: Arc::new(Mutex::new(TimerSession::new())),
            history,
            snapshots,
            alerts,
            app_handle,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_millis(250),
            heartbeat_every_ticks: if debug_mode { 1 } else { 4 },
        }
    }

    pub async fn view(&self) -> TimerView {
        let now = Utc::now();
        let guard = self.session.lock().await;
        TimerView {
            display: modes::display_state(&guard, now),
            state: guard.clone(),
        }
    }

    pub async fn start(&self, config: StartConfig) -> Result<DisplayState> {
        let now = Utc::now();
        let display = {
            let mut guard = self.session.lock().await;
            guard.start(config, now)?;
            persist_snapshot(&self.snapshots, &guard, now);
            modes::display_state(&guard, now)
        };

        self.spawn_ticker().await;
        self.emit_state_changed().await;
        Ok(display)
    }

    pub async fn pause(&self) -> Result<DisplayState> {
        let now = Utc::now();
        let display = {
            let mut guard = self.session.lock().await;
            guard.pause(now)?;
            persist_snapshot(&self.snapshots, &guard, now);
            modes::display_state(&guard, now)
        };

        self.emit_state_changed().await;
        Ok(display)
    }

    pub async fn resume(&self) -> Result<DisplayState> {
        let now = Utc::now();
        let display = {
            let mut guard = self.session.lock().await;
            guard.resume(now)?;
            persist_snapshot(&self.snapshots, &guard, now);
            modes::display_state(&guard, now)
        };

        self.emit_state_changed().await;
        Ok(display)
    }

    /// Manual stop. Records to history unless the timer was already idle.
    pub async fn stop(&self) -> Result<SessionOutcome> {
        let now = Utc::now();
        let (was_active, outcome) = {
            let mut guard = self.session.lock().await;
            let was_active = guard.lifecycle != Lifecycle::Idle;
            let outcome = guard.kill(now);
            persist_snapshot(&self.snapshots, &guard, now);
            (was_active, outcome)
        };

        self.cancel_ticker().await;

        if was_active {
            let record = SessionRecord::manual(&outcome, now);
            if let Err(err) = self.history.insert_record(&record).await {
                error!("Failed to record stopped session: {err:#}");
            }
            let _ = self.app_handle.emit(
                "session-stopped",
                SessionStoppedEvent {
                    outcome: outcome.clone(),
                },
            );
        }

        self.emit_state_changed().await;
        Ok(outcome)
    }

    /// Abandon without saving anything.
    pub async fn discard(&self) -> Result<()> {
        let now = Utc::now();
        {
            let mut guard = self.session.lock().await;
            guard.reset();
            persist_snapshot(&self.snapshots, &guard, now);
        }

        self.cancel_ticker().await;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn add_lap(&self) -> Result<Lap> {
        let now = Utc::now();
        let lap = {
            let mut guard = self.session.lock().await;
            let lap = guard.add_lap(now)?;
            persist_snapshot(&self.snapshots, &guard, now);
            lap
        };

        self.emit_state_changed().await;
        Ok(lap)
    }

    /// Pick up the session that was live when the app last closed. Returns
    /// whether anything was adopted; a stale snapshot is cleared and the
    /// timer stays idle, with no retroactive completion effects.
    pub async fn adopt_persisted(&self) -> bool {
        let Some(snapshot) = self.snapshots.load() else {
            return false;
        };

        let now = Utc::now();
        match snapshot.restore(now) {
            Some(session) => {
                info!(
                    "restored a {} {} session from the persisted snapshot",
                    match session.lifecycle {
                        Lifecycle::Running => "running",
                        Lifecycle::Paused => "paused",
                        Lifecycle::Idle => "idle",
                    },
                    session.mode.as_str()
                );
                {
                    let mut guard = self.session.lock().await;
                    *guard = session;
                    persist_snapshot(&self.snapshots, &guard, now);
                }
                self.spawn_ticker().await;
                self.emit_state_changed().await;
                true
            }
            None => {
                info!("discarding stale timer snapshot");
                if let Err(err) = self.snapshots.clear() {
                    warn!("Failed to clear stale snapshot: {err:#}");
                }
                false
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let session = self.session.clone();
        let app_handle = self.app_handle.clone();
        let history = self.history.clone();
        let snapshots = self.snapshots.clone();
        let alerts = self.alerts.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;
                ticks = ticks.wrapping_add(1);
                let now = Utc::now();

                let (outcome, state_after, display) = {
                    let mut guard = session.lock().await;
                    if guard.lifecycle == Lifecycle::Idle {
                        break;
                    }
                    let outcome = guard.tick(now);
                    let display = modes::display_state(&guard, now);

                    let persist = match outcome {
                        TickOutcome::SegmentSwitched(_) | TickOutcome::Completed(_) => true,
                        TickOutcome::Progress => ticks % heartbeat_every == 0,
                        TickOutcome::Ignored => false,
                    };
                    if persist {
                        persist_snapshot(&snapshots, &guard, now);
                    }

                    (outcome, guard.clone(), display)
                };

                match outcome {
                    TickOutcome::Ignored => {}
                    TickOutcome::Progress => {
                        if ticks % heartbeat_every == 0 {
                            let _ = app_handle.emit(
                                "timer-tick",
                                TimerTickEvent {
                                    display: display.clone(),
                                },
                            );
                        }
                    }
                    TickOutcome::SegmentSwitched(segment) => {
                        alerts.segment_switched(segment);
                        let _ = app_handle.emit(
                            "segment-switched",
                            SegmentSwitchedEvent {
                                segment,
                                display: display.clone(),
                            },
                        );
                    }
                    TickOutcome::Completed(outcome) => {
                        let record = SessionRecord::natural(&outcome, now);
                        alerts.session_completed(&outcome);
                        if let Err(err) = history.insert_record(&record).await {
                            error!("Failed to record completed session: {err:#}");
                        }
                        let _ = app_handle.emit(
                            "session-completed",
                            SessionCompletedEvent {
                                outcome,
                                record,
                            },
                        );
                        emit_timer_state(&app_handle, state_after, display);
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let now = Utc::now();
        let guard = self.session.lock().await;
        let display = modes::display_state(&guard, now);
        emit_timer_state(&self.app_handle, guard.clone(), display);
    }
}

fn persist_snapshot(store: &SnapshotStore, session: &TimerSession, now: DateTime<Utc>) {
    match Snapshot::capture(session, now) {
        Some(snapshot) => {
            if let Err(err) = store.save(&snapshot) {
                warn!("Failed to persist timer snapshot: {err:#}");
            }
        }
        None => {
            if let Err(err) = store.clear() {
                warn!("Failed to clear timer snapshot: {err:#}");
            }
        }
    }
}

fn emit_timer_state(app_handle: &AppHandle, state: TimerSession, display: DisplayState) {
    let payload = TimerStateChangedEvent { state, display };
    let _ = app_handle.emit("timer-state-changed", payload);
}
