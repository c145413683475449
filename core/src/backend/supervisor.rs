/// Backend process supervisor
///
/// Spawns the external detection backend, forwards its output to the log,
/// waits until it reports ready and kills it on shutdown. The child is also
/// killed when the supervisor is dropped.
use super::api::{BackendApi, Readiness};
use crate::{AgisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

fn default_startup_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// How to launch the backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl BackendConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            startup_timeout_ms: default_startup_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub struct BackendSupervisor {
    config: BackendConfig,
    child: Option<Child>,
}

impl BackendSupervisor {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    /// Spawn the backend process
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!(target: "backend", command = %self.config.command, "Backend already running");
            return Ok(());
        }

        info!(
            target: "backend",
            command = %self.config.command,
            args = ?self.config.args,
            "Starting backend process"
        );

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = self.config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            error!(target: "backend", error = %e, "Failed to spawn backend process");
            AgisError::Backend(format!("failed to spawn {}: {}", self.config.command, e))
        })?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }

        info!(target: "backend", pid = ?child.id(), "Backend process started");
        self.child = Some(child);
        Ok(())
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Whether the child is still alive; reaps it if it has exited
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!(target: "backend", status = %status, "Backend process exited");
                self.child = None;
                false
            }
            Err(e) => {
                warn!(target: "backend", error = %e, "Failed to poll backend process");
                false
            }
        }
    }

    /// Poll `/healthz` until the server is up, then `/readyz` until it
    /// reports ready. Fails if the process exits or the startup timeout
    /// elapses first.
    pub async fn wait_ready(&mut self, api: &BackendApi) -> Result<()> {
        let timeout = self.config.startup_timeout();
        // None when the timeout is too large to represent; wait without a deadline
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if !self.is_running() {
                return Err(AgisError::Backend(
                    "backend exited before becoming ready".to_string(),
                ));
            }

            match api.healthz().await {
                Ok(()) => match api.readyz().await {
                    Ok(Readiness::Ready) => {
                        info!(target: "backend", base = %api.base(), "Backend is ready");
                        return Ok(());
                    }
                    Ok(Readiness::NotReady) => {
                        debug!(target: "backend", "Backend is up but still starting");
                    }
                    Err(e) => {
                        debug!(target: "backend", error = %e, "Readiness probe failed");
                    }
                },
                Err(e) => {
                    debug!(target: "backend", error = %e, "Backend not up yet");
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(AgisError::Backend(format!(
                    "backend not ready after {:?}",
                    timeout
                )));
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// Kill and reap the child; no-op when nothing is running
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!(target: "backend", pid = ?child.id(), "Stopping backend process");
        if child.try_wait()?.is_none() {
            child.kill().await?;
        }
        let status = child.wait().await?;
        info!(target: "backend", status = %status, "Backend process stopped");
        Ok(())
    }
}

/// Forward a child output stream to the log, line by line
fn forward_output<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            info!(target: "backend", stream = name, "{}", line);
        }
        debug!(target: "backend", stream = name, "Output reader exited");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_toml() {
        let cfg: BackendConfig = toml::from_str(
            r#"
            command = "python"
            args = ["backend/main.py"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.command, "python");
        assert_eq!(cfg.args, vec!["backend/main.py"]);
        assert_eq!(cfg.startup_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert!(cfg.env.is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut sup = BackendSupervisor::new(BackendConfig::new("true"));
        assert!(!sup.is_running());
        assert!(sup.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let mut sup = BackendSupervisor::new(BackendConfig::new("/nonexistent/agisfl-backend"));
        assert!(matches!(sup.start(), Err(AgisError::Backend(_))));
        assert!(!sup.is_running());
    }
}
