//! Downstream process shutdown.

use std::time::Duration;

use goose_operator_core::config::DownstreamConfig;
use goose_operator_core::config::defaults::OperatorDefaults;
use tokio::process::Child;

use crate::error::OperatorError;

/// Shutdown request with configurable grace periods.
///
/// Escalation:
/// 1. Close the agent's stdin (done by the caller)
/// 2. Wait `stdin_close_grace` for a clean exit
/// 3. Send SIGTERM to the process group
/// 4. Wait `sigterm_grace`
/// 5. Kill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequest {
    /// Time to wait after closing stdin before sending SIGTERM.
    pub stdin_close_grace: Duration,
    /// Time to wait after SIGTERM before killing.
    pub sigterm_grace: Duration,
}

impl Default for ShutdownRequest {
    fn default() -> Self {
        let d = OperatorDefaults::default();
        Self {
            stdin_close_grace: d.stdin_close_grace,
            sigterm_grace: d.sigterm_grace,
        }
    }
}

impl From<&DownstreamConfig> for ShutdownRequest {
    fn from(config: &DownstreamConfig) -> Self {
        Self {
            stdin_close_grace: config.stdin_close_grace,
            sigterm_grace: config.sigterm_grace,
        }
    }
}

/// Run the shutdown sequence and reap the child.
///
/// Returns the child's exit code, or -1 when it was ended by a signal.
pub async fn shutdown_downstream(
    child: &mut Child,
    request: &ShutdownRequest,
) -> Result<i32, OperatorError> {
    tracing::info!(state = "shutting_down", "stopping downstream agent");

    match tokio::time::timeout(request.stdin_close_grace, child.wait()).await {
        Ok(Ok(status)) => {
            let code = status.code().unwrap_or(-1);
            tracing::info!(code, state = "stopped", "downstream exited after stdin close");
            return Ok(code);
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "wait failed after stdin close");
        }
        Err(_) => {
            tracing::info!("downstream did not exit within stdin_close_grace");
        }
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Some(pid) = child.id() {
            tracing::info!(pid, "sending SIGTERM to process group");
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::warn!(pid, error = ?e, "killpg SIGTERM failed");
            }
        }
    }

    match tokio::time::timeout(request.sigterm_grace, child.wait()).await {
        Ok(Ok(status)) => {
            let code = status.code().unwrap_or(-1);
            tracing::info!(code, state = "stopped", "downstream exited after SIGTERM");
            return Ok(code);
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "wait failed after SIGTERM");
        }
        Err(_) => {
            tracing::warn!("downstream did not exit within sigterm_grace");
        }
    }

    tracing::warn!("killing downstream agent");
    if let Err(e) = child.kill().await {
        tracing::error!(error = %e, "kill failed");
    }

    let status = child.wait().await.map_err(OperatorError::Io)?;
    let code = status.code().unwrap_or(-1);
    tracing::info!(code, state = "stopped", "downstream exited after kill");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    #[test]
    fn test_shutdown_request_defaults() {
        let req = ShutdownRequest::default();
        assert_eq!(req.stdin_close_grace, Duration::from_millis(500));
        assert_eq!(req.sigterm_grace, Duration::from_secs(2));
    }

    #[test]
    fn test_from_downstream_config() {
        let config = DownstreamConfig {
            stdin_close_grace: Duration::from_millis(10),
            ..DownstreamConfig::default()
        };
        let req = ShutdownRequest::from(&config);
        assert_eq!(req.stdin_close_grace, Duration::from_millis(10));
        assert_eq!(req.sigterm_grace, Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exits_on_stdin_close() {
        let mut child = Command::new("cat")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        drop(child.stdin.take());
        let code = shutdown_downstream(&mut child, &ShutdownRequest::default())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_when_stdin_ignored() {
        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .unwrap();
        let req = ShutdownRequest {
            stdin_close_grace: Duration::from_millis(50),
            sigterm_grace: Duration::from_secs(2),
        };
        let started = std::time::Instant::now();
        let code = shutdown_downstream(&mut child, &req).await.unwrap();
        assert_eq!(code, -1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
