use gradetrackd::bridge::FileBridge;
use gradetrackd::config::Config;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub data_dir: PathBuf,
    pub bridge: FileBridge,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let data_dir = config.data_dir.clone();
        Self {
            bridge: FileBridge::in_dir(&data_dir),
            data_dir,
            config,
        }
    }

    pub fn select_data_dir(&mut self, path: PathBuf) {
        self.bridge = FileBridge::in_dir(&path);
        self.data_dir = path;
    }
}
