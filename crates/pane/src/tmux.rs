//! tmux-backed pane adapter.
//!
//! Each operation is one or two blocking-style `tmux` invocations run through
//! `tokio::process`. No timeout is applied; a hung tmux call hangs the job.

use async_trait::async_trait;
use tokio::process::Command;

use crate::{PaneAdapter, PaneError};

/// Drives a single tmux pane addressed as `session:window.pane`.
#[derive(Debug, Clone)]
pub struct TmuxPane {
    binary: String,
    target: String,
}

/// Outcome of a tmux invocation that ran but did not succeed.
struct Rejected(String);

impl TmuxPane {
    pub fn new(binary: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            target: target.into(),
        }
    }

    /// `send-keys -l` types the text literally, so words like `Enter` or
    /// `C-c` inside a command are not interpreted as key names.
    pub(crate) fn literal_args(&self, line: &str) -> Vec<String> {
        vec![
            "send-keys".into(),
            "-t".into(),
            self.target.clone(),
            "-l".into(),
            line.into(),
        ]
    }

    pub(crate) fn submit_args(&self) -> Vec<String> {
        vec![
            "send-keys".into(),
            "-t".into(),
            self.target.clone(),
            "C-m".into(),
        ]
    }

    pub(crate) fn capture_args(&self, depth: usize) -> Vec<String> {
        vec![
            "capture-pane".into(),
            "-t".into(),
            self.target.clone(),
            "-p".into(),
            "-S".into(),
            format!("-{}", depth),
        ]
    }

    pub(crate) fn list_panes_args(&self) -> Vec<String> {
        vec!["list-panes".into(), "-t".into(), self.target.clone()]
    }

    /// Run tmux with `args`, returning stdout on success.
    async fn run(&self, args: &[String]) -> Result<Result<String, Rejected>, PaneError> {
        tracing::trace!(binary = %self.binary, ?args, "tmux");
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PaneError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(Ok(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("tmux exited with {}", output.status)
            } else {
                stderr
            };
            Ok(Err(Rejected(reason)))
        }
    }
}

#[async_trait]
impl PaneAdapter for TmuxPane {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn inject(&self, line: &str) -> Result<(), PaneError> {
        let injection = |Rejected(reason)| PaneError::Injection {
            target: self.target.clone(),
            reason,
        };

        if !line.is_empty() {
            self.run(&self.literal_args(line)).await?.map_err(injection)?;
        }
        self.run(&self.submit_args()).await?.map_err(injection)?;
        Ok(())
    }

    async fn capture(&self, depth: usize) -> Result<String, PaneError> {
        self.run(&self.capture_args(depth))
            .await?
            .map_err(|Rejected(reason)| PaneError::Capture {
                target: self.target.clone(),
                reason,
            })
    }

    async fn health_check(&self) -> Result<(), PaneError> {
        self.run(&self.list_panes_args())
            .await?
            .map(|_| ())
            .map_err(|Rejected(reason)| PaneError::Unavailable {
                target: self.target.clone(),
                reason,
            })
    }
}
