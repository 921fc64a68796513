use super::{BridgeResult, DataBridge};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DATA_FILE_NAME: &str = "grade_data.json";

#[derive(Debug, Clone)]
pub struct FileBridge {
    path: PathBuf,
}

impl FileBridge {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DATA_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataBridge for FileBridge {
    async fn load_data(&self) -> BridgeResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(raw),
            // Nothing saved yet reads as an empty document.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok("{}".to_string()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_data(&self, data: String) -> BridgeResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write next to the target, then swap in. Each write gets its own
        // temp name since overlapping saves are allowed.
        let tmp = self
            .path
            .with_extension(format!("json.{}.saving", crate::model::new_id()));
        if let Err(e) = tokio::fs::write(&tmp, data.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(path = %self.path.display(), bytes = data.len(), "data file written");
        Ok(())
    }

    async fn data_location(&self) -> BridgeResult<String> {
        Ok(self.path.to_string_lossy().to_string())
    }
}
