mod ipc;

use gradetrackd::config::Config;
use gradetrackd::telemetry;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    telemetry::init_tracing(config.log_json);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "gradetrackd starting"
    );

    let mut state = ipc::AppState::new(config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed; shutting down");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req).await,
            // Can't reply without id.
            Err(e) => ipc::bad_json(e.to_string()),
        };

        let mut out = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed; gradetrackd exiting");
    Ok(())
}
