use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

const DB_FILE_NAME: &str = "classwatch.sqlite3";

/// Layout of the per-installation data directory: the database, per-student
/// face images, model artifacts and analytics exports.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.faces_dir(),
            self.models_dir(),
            self.analytics_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(DB_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn faces_dir(&self) -> PathBuf {
        self.root.join("faces")
    }

    pub fn student_faces_dir(&self, student_id: &str) -> PathBuf {
        self.faces_dir().join(student_id)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn analytics_dir(&self) -> PathBuf {
        self.root.join("analytics")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSettings {
    pub camera_index: u32,
    pub frame_interval_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_interval_ms: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    monitor: MonitorSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn monitor(&self) -> MonitorSettings {
        self.data.read().unwrap().monitor.clone()
    }

    pub fn update_monitor(&self, settings: MonitorSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.monitor = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn paths_hang_off_the_root() {
        let paths = DataPaths::new(PathBuf::from("/data/classwatch"));
        assert_eq!(paths.db_path(), PathBuf::from("/data/classwatch/classwatch.sqlite3"));
        assert_eq!(
            paths.student_faces_dir("S001"),
            PathBuf::from("/data/classwatch/faces/S001")
        );
    }

    #[test]
    fn settings_survive_reload_and_tolerate_garbage() {
        let root = std::env::temp_dir().join(format!("classwatch-settings-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        let path = root.join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_monitor(MonitorSettings {
                camera_index: 1,
                frame_interval_ms: 50,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reloaded.monitor().camera_index, 1);
        assert_eq!(reloaded.monitor().frame_interval_ms, 50);

        fs::write(&path, "{ not json").unwrap();
        let defaulted = SettingsStore::new(path).unwrap();
        assert_eq!(defaulted.monitor().camera_index, 0);

        let _ = fs::remove_dir_all(&root);
    }
}
