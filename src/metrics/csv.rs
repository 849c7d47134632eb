//! CSV rendering of call samples and the append-only CSV mirror

use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::recorder::ApiCallSample;

pub const HEADER: &str = "id,timestamp,endpoint,method,use_case,status,success,\
response_time_ms,request_size,response_size,images,error";

/// Quote a field when it contains a separator, quote or line break
pub fn escape(field: &str) -> String {
    if field.contains(|c: char| c == ',' || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn row(sample: &ApiCallSample) -> String {
    [
        sample.id.to_string(),
        sample.timestamp.to_rfc3339(),
        escape(&sample.endpoint),
        sample.method.clone(),
        sample.use_case.map(|u| u.as_str().to_string()).unwrap_or_default(),
        sample.status.to_string(),
        sample.success.to_string(),
        format!("{:.3}", sample.response_time_ms),
        sample.request_size.to_string(),
        sample.response_size.to_string(),
        sample.images.to_string(),
        escape(sample.error.as_deref().unwrap_or("")),
    ]
    .join(",")
}

/// Background writer appending one line per sample
pub struct CsvSink {
    tx: mpsc::UnboundedSender<String>,
}

impl CsvSink {
    /// Start the writer task for `path`
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Cannot open metrics CSV; mirror disabled");
                    return;
                }
            };

            let is_new = file.metadata().await.map(|m| m.len() == 0).unwrap_or(false);
            if is_new {
                if let Err(e) = file.write_all(format!("{}\n", HEADER).as_bytes()).await {
                    warn!(path = ?path, error = %e, "Failed to write metrics CSV header");
                }
            }
            info!(path = ?path, "Mirroring API call metrics to CSV");

            while let Some(line) = rx.recv().await {
                let write = async {
                    file.write_all(line.as_bytes()).await?;
                    file.write_all(b"\n").await?;
                    file.flush().await
                };
                if let Err(e) = write.await {
                    warn!(path = ?path, error = %e, "Failed to append metrics CSV row");
                }
            }
        });

        Self { tx }
    }

    pub fn append(&self, sample: &ApiCallSample) {
        if self.tx.send(row(sample)).is_err() {
            warn!("Metrics CSV writer has stopped");
        }
    }
}
