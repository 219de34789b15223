mod alerts;
mod history;
mod models;
mod settings;
mod timer;

use std::sync::Arc;

use alerts::{AlertHub, ChimePlayer, DesktopNotifier, NoopVibration};
use history::Database;
use settings::{AlertSettings, SettingsStore};
use tauri::{Emitter, Manager, State};
use timer::{
    commands::{
        add_lap, delete_history_record, discard_timer, get_timer_state, list_history, pause_timer,
        resume_timer, start_timer, stop_timer,
    },
    SnapshotStore, TimerController,
};

pub(crate) struct AppState {
    pub(crate) history: Database,
    pub(crate) timer: TimerController,
    pub(crate) settings: Arc<SettingsStore>,
}

#[tauri::command]
fn get_alert_settings(state: State<AppState>) -> Result<AlertSettings, String> {
    Ok(state.settings.alerts())
}

#[tauri::command]
fn set_alert_settings(
    settings: AlertSettings,
    state: State<AppState>,
    app_handle: tauri::AppHandle,
) -> Result<(), String> {
    state
        .settings
        .update_alerts(settings.clone())
        .map_err(|e| e.to_string())?;

    app_handle
        .emit("alert-settings-updated", &settings)
        .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Cadence starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_notification::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let database = Database::new(app_data_dir.join("cadence.sqlite3"))?;
                let settings_store =
                    Arc::new(SettingsStore::new(app_data_dir.join("settings.json"))?);
                let snapshot_store = SnapshotStore::new(app_data_dir.join("timer_snapshot.json"));

                let alert_hub = Arc::new(AlertHub::new(
                    Box::new(ChimePlayer::new()),
                    Box::new(NoopVibration),
                    Box::new(DesktopNotifier::new(app.handle().clone())),
                    settings_store.clone(),
                ));

                let timer_controller = TimerController::new(
                    app.handle().clone(),
                    database.clone(),
                    snapshot_store,
                    alert_hub,
                );

                // Pick up the timer that was live when the app last closed.
                {
                    let controller = timer_controller.clone();
                    tauri::async_runtime::block_on(async move {
                        controller.adopt_persisted().await;
                    });
                }

                app.manage(AppState {
                    history: database,
                    timer: timer_controller,
                    settings: settings_store,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            get_timer_state,
            start_timer,
            pause_timer,
            resume_timer,
            stop_timer,
            discard_timer,
            add_lap,
            list_history,
            delete_history_record,
            get_alert_settings,
            set_alert_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application")
}
