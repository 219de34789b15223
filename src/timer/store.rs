use anyhow::{Context, Result};
use log::warn;
use std::{fs, path::PathBuf, sync::Arc};

use super::snapshot::Snapshot;

/// On-disk home of the persisted timer snapshot: one JSON file in the app
/// data dir. Loading is forgiving (a missing or unreadable file is just "no
/// snapshot"); saving reports errors so the controller can log them.
#[derive(Clone)]
pub struct SnapshotStore {
    path: Arc<PathBuf>,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    pub fn load(&self) -> Option<Snapshot> {
        if !self.path.exists() {
            return None;
        }
        let contents = match fs::read_to_string(self.path.as_path()) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    "failed to read timer snapshot from {}: {err}",
                    self.path.display()
                );
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(
                    "discarding unparseable timer snapshot at {}: {err}",
                    self.path.display()
                );
                None
            }
        }
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let serialized = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.path.as_path(), serialized)
            .with_context(|| format!("failed to write timer snapshot to {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(self.path.as_path()).with_context(|| {
                format!("failed to remove timer snapshot at {}", self.path.display())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::modes::StartConfig;
    use crate::timer::state::TimerSession;
    use chrono::{DateTime, Duration, Utc};

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_snapshot() -> Snapshot {
        let start = fixed_time("2026-03-01T09:00:00Z");
        let mut session = TimerSession::new();
        session
            .start(StartConfig::Countdown { duration_ms: 60_000 }, start)
            .unwrap();
        Snapshot::capture(&session, start + Duration::seconds(5)).unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("timer_snapshot.json"));

        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), Some(snapshot));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("timer_snapshot.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timer_snapshot.json");
        fs::write(&path, "{not json").unwrap();

        let store = SnapshotStore::new(path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_removes_the_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("timer_snapshot.json"));

        store.save(&sample_snapshot()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
        // Clearing again is fine.
        store.clear().unwrap();
    }
}
