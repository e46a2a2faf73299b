//! In-memory pane for tests.
//!
//! Records every call in order and answers captures from a scripted screen.
//! By default the screen echoes injected lines, the way a shell prompt would,
//! followed by whatever output the test appends.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{PaneAdapter, PaneError};

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneCall {
    Inject(String),
    Capture(usize),
    HealthCheck,
}

#[derive(Default)]
struct State {
    calls: Vec<PaneCall>,
    screen: String,
    echo: bool,
    reply: Option<String>,
    fail_inject_at: Option<usize>,
    fail_capture: bool,
    unavailable: bool,
}

pub struct FakePane {
    target: String,
    state: Mutex<State>,
}

impl FakePane {
    /// Pane whose screen echoes every injected line.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: Mutex::new(State {
                echo: true,
                ..State::default()
            }),
        }
    }

    /// Pane whose capture always returns exactly `screen`, ignoring injections.
    pub fn with_screen(target: impl Into<String>, screen: impl Into<String>) -> Self {
        let pane = Self::new(target);
        {
            let mut state = pane.state.lock();
            state.echo = false;
            state.screen = screen.into();
        }
        pane
    }

    /// Output the "program" prints after each submitted line, appended to
    /// the echoed screen on every inject.
    pub fn reply_with(self, output: impl Into<String>) -> Self {
        self.state.lock().reply = Some(output.into());
        self
    }

    /// Fail the `n`th inject call (0-based) and every one after it.
    pub fn fail_inject_at(self, n: usize) -> Self {
        self.state.lock().fail_inject_at = Some(n);
        self
    }

    pub fn fail_capture(self) -> Self {
        self.state.lock().fail_capture = true;
        self
    }

    pub fn unavailable(self) -> Self {
        self.state.lock().unavailable = true;
        self
    }

    /// Append raw text to the screen, as if the program printed it.
    pub fn print(&self, text: &str) {
        self.state.lock().screen.push_str(text);
    }

    pub fn calls(&self) -> Vec<PaneCall> {
        self.state.lock().calls.clone()
    }

    /// Lines passed to `inject`, in order.
    pub fn injected(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                PaneCall::Inject(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PaneAdapter for FakePane {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn inject(&self, line: &str) -> Result<(), PaneError> {
        let mut state = self.state.lock();
        let index = state
            .calls
            .iter()
            .filter(|c| matches!(c, PaneCall::Inject(_)))
            .count();
        state.calls.push(PaneCall::Inject(line.to_string()));

        if state.unavailable || state.fail_inject_at.is_some_and(|n| index >= n) {
            return Err(PaneError::Injection {
                target: self.target.clone(),
                reason: "can't find pane".into(),
            });
        }

        if state.echo {
            state.screen.push_str(line);
            state.screen.push('\n');
            if let Some(reply) = state.reply.clone() {
                state.screen.push_str(&reply);
            }
        }
        Ok(())
    }

    async fn capture(&self, depth: usize) -> Result<String, PaneError> {
        let mut state = self.state.lock();
        state.calls.push(PaneCall::Capture(depth));
        if state.unavailable || state.fail_capture {
            return Err(PaneError::Capture {
                target: self.target.clone(),
                reason: "can't find pane".into(),
            });
        }

        let lines: Vec<&str> = state.screen.lines().collect();
        let start = lines.len().saturating_sub(depth);
        let mut out = lines[start..].join("\n");
        out.push('\n');
        Ok(out)
    }

    async fn health_check(&self) -> Result<(), PaneError> {
        let mut state = self.state.lock();
        state.calls.push(PaneCall::HealthCheck);
        if state.unavailable {
            return Err(PaneError::Unavailable {
                target: self.target.clone(),
                reason: "can't find session".into(),
            });
        }
        Ok(())
    }
}
