//! Subprocess-backed stem separator.
//!
//! Supervises an external separation tool (e.g. `demucs`): spawn, pipe
//! stdout/stderr, wait with a timeout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

use crate::error::BackendError;
use crate::traits::Separator;

pub struct SubprocessSeparator {
    binary: String,
    timeout: Duration,
}

impl SubprocessSeparator {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout }
    }
}

#[async_trait]
impl Separator for SubprocessSeparator {
    async fn separate(
        &self,
        audio_path: &Path,
        model_name: &str,
        stems: &[String],
        out_dir: &Path,
    ) -> Result<HashMap<String, PathBuf>, BackendError> {
        std::fs::create_dir_all(out_dir)?;

        let child = Command::new(&self.binary)
            .arg("-n")
            .arg(model_name)
            .arg("-o")
            .arg(out_dir)
            .arg(audio_path)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::ToolingMissing(format!("failed to spawn {}: {e}", self.binary)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(BackendError::IoFailed(e.to_string())),
            Err(_) => return Err(BackendError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(stderr = %stderr, "separation subprocess exited non-zero");
            return Err(BackendError::InferenceFailed(stderr.to_string()));
        }

        let mut result = HashMap::new();
        for stem in stems {
            let path = out_dir.join(format!("{stem}.wav"));
            if !path.exists() {
                return Err(BackendError::InferenceFailed(format!("missing expected stem output: {stem}")));
            }
            result.insert(stem.clone(), path);
        }
        Ok(result)
    }

    /// Confirms the separation binary is actually spawnable before the
    /// first job, rather than discovering a missing tool mid-job.
    async fn load(&self) -> Result<(), BackendError> {
        let mut child = Command::new(&self.binary)
            .arg("--help")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| BackendError::LoadFailed(format!("{} not runnable: {e}", self.binary)))?;
        let _ = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        Ok(())
    }
}
