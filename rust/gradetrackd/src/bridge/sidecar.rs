use super::{BridgeError, BridgeResult, DataBridge};
use crate::config::DATA_DIR_ENV;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

struct SidecarIo {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Talks to a `gradetrackd` child process, one JSON line per request.
///
/// Requests are serialized behind a mutex. Replies left unread by a
/// cancelled call are discarded by the next one.
pub struct SidecarBridge {
    io: Mutex<SidecarIo>,
    next_id: AtomicU64,
}

impl SidecarBridge {
    /// Must be called from inside a tokio runtime.
    pub fn spawn(program: &Path, data_dir: Option<&Path>) -> BridgeResult<Self> {
        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = data_dir {
            cmd.env(DATA_DIR_ENV, dir);
        }

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Protocol("sidecar stdin not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Protocol("sidecar stdout not piped".into()))?;

        tracing::info!(program = %program.display(), "sidecar started");
        Ok(Self {
            io: Mutex::new(SidecarIo {
                _child: child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> BridgeResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let payload = json!({ "id": id, "method": method, "params": params });

        let mut io = self.io.lock().await;
        io.stdin.write_all(payload.to_string().as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        // A call dropped mid-flight leaves its reply unread; skip it.
        let resp = loop {
            let Some(line) = io.stdout.next_line().await? else {
                return Err(BridgeError::Protocol("sidecar closed its output".into()));
            };
            let resp: serde_json::Value = serde_json::from_str(line.trim())?;
            match resp.get("id").and_then(|v| v.as_str()) {
                Some(reply_id) if reply_id == id => break resp,
                stale => tracing::debug!(?stale, method, "skipping stale sidecar reply"),
            }
        };
        drop(io);

        if resp.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            return Ok(resp.get("result").cloned().unwrap_or(serde_json::Value::Null));
        }

        let error = resp.get("error");
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        Err(BridgeError::Remote {
            code: field("code"),
            message: field("message"),
        })
    }

    fn string_field(result: &serde_json::Value, name: &str) -> BridgeResult<String> {
        result
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| BridgeError::Protocol(format!("reply missing result.{name}")))
    }
}

#[async_trait]
impl DataBridge for SidecarBridge {
    async fn load_data(&self) -> BridgeResult<String> {
        let result = self.call("data.load", json!({})).await?;
        Self::string_field(&result, "data")
    }

    async fn save_data(&self, data: String) -> BridgeResult<()> {
        self.call("data.save", json!({ "data": data })).await?;
        Ok(())
    }

    async fn data_location(&self) -> BridgeResult<String> {
        let result = self.call("data.location", json!({})).await?;
        Self::string_field(&result, "location")
    }
}
