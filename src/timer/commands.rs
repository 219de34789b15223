use serde::Deserialize;
use tauri::State;

use crate::{
    models::SessionRecord,
    timer::{DisplayState, Lap, SessionOutcome, StartConfig, TimerController, TimerError, TimerMode, TimerView},
    AppState,
};

use super::modes::minutes_to_ms;

fn controller_from_state(state: &State<'_, AppState>) -> TimerController {
    state.timer.clone()
}

/// Raw start parameters from the UI; durations arrive as fractional
/// minutes and are validated here before the engine sees them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub mode: TimerMode,
    pub duration_minutes: Option<f64>,
    pub work_minutes: Option<f64>,
    pub break_minutes: Option<f64>,
    pub target_cycles: Option<u32>,
    pub label: Option<String>,
}

impl StartRequest {
    pub fn into_config(self) -> Result<StartConfig, TimerError> {
        match self.mode {
            TimerMode::Stopwatch => Ok(StartConfig::Stopwatch),
            TimerMode::Countdown => {
                let minutes = self.duration_minutes.ok_or(TimerError::InvalidDuration)?;
                Ok(StartConfig::Countdown {
                    duration_ms: minutes_to_ms(minutes)?,
                })
            }
            TimerMode::Intervals => {
                let work_ms = minutes_to_ms(self.work_minutes.ok_or(TimerError::InvalidDuration)?)?;
                let break_ms =
                    minutes_to_ms(self.break_minutes.ok_or(TimerError::InvalidDuration)?)?;
                if self.target_cycles == Some(0) {
                    return Err(TimerError::InvalidCycleCount);
                }
                Ok(StartConfig::Intervals {
                    work_ms,
                    break_ms,
                    target_cycles: self.target_cycles,
                    label: self.label,
                })
            }
        }
    }
}

#[tauri::command]
pub async fn get_timer_state(state: State<'_, AppState>) -> Result<TimerView, String> {
    let controller = controller_from_state(&state);
    Ok(controller.view().await)
}

#[tauri::command]
pub async fn start_timer(
    state: State<'_, AppState>,
    request: StartRequest,
) -> Result<DisplayState, String> {
    let controller = controller_from_state(&state);
    let config = request.into_config().map_err(|e| e.to_string())?;
    controller.start(config).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn pause_timer(state: State<'_, AppState>) -> Result<DisplayState, String> {
    let controller = controller_from_state(&state);
    controller.pause().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn resume_timer(state: State<'_, AppState>) -> Result<DisplayState, String> {
    let controller = controller_from_state(&state);
    controller.resume().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_timer(state: State<'_, AppState>) -> Result<SessionOutcome, String> {
    let controller = controller_from_state(&state);
    controller.stop().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn discard_timer(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.discard().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_lap(state: State<'_, AppState>) -> Result<Lap, String> {
    let controller = controller_from_state(&state);
    controller.add_lap().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn list_history(
    state: State<'_, AppState>,
    limit: Option<u32>,
) -> Result<Vec<SessionRecord>, String> {
    let db = &state.history;
    db.list_records(limit).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_history_record(
    state: State<'_, AppState>,
    record_id: String,
) -> Result<(), String> {
    let db = &state.history;
    db.delete_record(&record_id).await.map_err(|e| e.to_string())
}
