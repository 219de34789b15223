use tauri::AppHandle;
use tauri_plugin_notification::NotificationExt;

use super::Notifier;

pub struct DesktopNotifier {
    app: AppHandle,
}

impl DesktopNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Notifier for DesktopNotifier {
    fn show_completion(
        &self,
        message: &str,
        mode_label: &str,
        duration_secs: u64,
    ) -> Result<(), String> {
        let minutes = duration_secs / 60;
        let seconds = duration_secs % 60;
        let body = if minutes > 0 {
            format!("{message} · {minutes}m {seconds:02}s")
        } else {
            format!("{message} · {seconds}s")
        };

        self.app
            .notification()
            .builder()
            .title(format!("{mode_label} finished"))
            .body(body)
            .show()
            .map_err(|e| format!("Failed to show notification: {:?}", e))
    }
}
