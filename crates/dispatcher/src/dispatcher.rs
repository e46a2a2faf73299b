//! Command dispatch: tag, inject, wait, capture, extract, persist.
//!
//! A submission is one linear sequence against the shared pane. The only
//! suspension point is the wait window, and the pane is held exclusively
//! from the first injected line until the capture returns.

pub mod job_id;
pub mod marker;
mod target_lock;

use jobs::{EventLog, JobStore, StoreError};
use pane::{PaneAdapter, PaneError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use settings::{Config, WorkdirHint};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use job_id::derive_job_id;
pub use marker::{extract, marker_for, Extraction};
pub use target_lock::TargetLocks;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid job id: {0:?}")]
    InvalidJobId(String),

    #[error(transparent)]
    Pane(#[from] PaneError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A command submission. Only `text` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    /// Text to type into the pane; each line is submitted separately.
    pub text: String,
    /// Pin the job id (resubmitting with the same id replaces its output).
    #[serde(default)]
    pub id: Option<String>,
    /// Advisory annotation, logged only.
    #[serde(default)]
    pub mode: Option<String>,
    /// Advisory working directory, handled per [`WorkdirHint`].
    #[serde(default)]
    pub workdir: Option<String>,
    /// Capture window override in milliseconds. `0` captures immediately.
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Injection succeeded. Says nothing about the command's own outcome.
    Accepted,
}

/// Response to a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: String,
    pub status: JobStatus,
    /// Tail of the captured output.
    pub preview: String,
}

/// Tunables taken from [`Config`].
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Wait window used when the caller gives none. Extraction is only as
    /// good as this window is long enough for the program to answer.
    pub capture_delay: Duration,
    /// Upper bound on any wait window, including caller overrides.
    pub max_wait: Duration,
    pub max_capture_lines: usize,
    pub preview_chars: usize,
    pub default_mode: String,
    pub workdir_hint: WorkdirHint,
}

impl DispatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture_delay: config.capture_delay(),
            max_wait: config.max_wait(),
            max_capture_lines: config.max_capture_lines,
            preview_chars: config.preview_chars,
            default_mode: config.default_mode.clone(),
            workdir_hint: config.workdir_hint,
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Dispatcher {
    pane: Arc<dyn PaneAdapter>,
    store: JobStore,
    events: Arc<EventLog>,
    locks: TargetLocks,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        pane: Arc<dyn PaneAdapter>,
        store: JobStore,
        events: Arc<EventLog>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            pane,
            store,
            events,
            locks: TargetLocks::new(),
            options,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn target(&self) -> String {
        self.pane.target()
    }

    /// Whether the target pane currently exists.
    pub async fn health(&self) -> Result<(), PaneError> {
        self.pane.health_check().await
    }

    /// Deliver `request.text` to the pane and store what it printed.
    ///
    /// Returns once the output is persisted. Nothing is rolled back on a pane
    /// failure: lines injected before the error stay in the terminal.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission, DispatchError> {
        let id = match request.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if jobs::is_valid_job_id(id) => id.to_string(),
            Some(id) => return Err(DispatchError::InvalidJobId(id.to_string())),
            None => derive_job_id(&request.text),
        };
        let mode = request
            .mode
            .as_deref()
            .unwrap_or(&self.options.default_mode);
        let workdir = request.workdir.as_deref().filter(|w| !w.is_empty());
        let wait = self.wait_window(&id, request.wait_ms);

        info!(
            job_id = %id,
            mode,
            workdir = workdir.unwrap_or(""),
            n_chars = request.text.chars().count(),
            "Job accepted"
        );
        self.events.emit(
            "accept",
            &id,
            json!({
                "mode": mode,
                "workdir": workdir,
                "n_chars": request.text.chars().count(),
            }),
        );

        let capture = match self.deliver(&id, &request.text, workdir, wait).await {
            Ok(capture) => capture,
            Err(error) => {
                warn!(job_id = %id, "Job failed: {}", error);
                self.events
                    .emit("failed", &id, json!({ "error": error.to_string() }));
                return Err(error.into());
            }
        };

        let extraction = extract(&capture, &marker_for(&id));
        if !extraction.marker_found {
            warn!(
                job_id = %id,
                "Marker not found in capture, storing whole pane"
            );
        }

        self.store.save(&id, extraction.output.clone()).await?;

        let n_lines = util::line_count(&extraction.output);
        info!(job_id = %id, n_lines, "Job delivered");
        self.events
            .emit("delivered", &id, json!({ "n_lines": n_lines }));

        Ok(Submission {
            preview: util::tail_chars(&extraction.output, self.options.preview_chars).to_string(),
            id,
            status: JobStatus::Accepted,
        })
    }

    /// Inject hint, marker and command lines, wait, and capture, holding
    /// the target for the whole sequence.
    async fn deliver(
        &self,
        id: &str,
        text: &str,
        workdir: Option<&str>,
        wait: Duration,
    ) -> Result<String, PaneError> {
        let target = self.pane.target();
        let _guard = self.locks.acquire(&target).await;
        debug!(job_id = %id, %target, "Acquired pane");

        if let Some(line) = workdir.and_then(|dir| self.workdir_line(dir)) {
            self.pane.inject(&line).await?;
        }
        self.pane.inject(&marker_for(id)).await?;
        for line in util::split_lines(text) {
            self.pane.inject(line).await?;
        }

        tokio::time::sleep(wait).await;
        self.pane.capture(self.options.max_capture_lines).await
    }

    /// Caller's `wait_ms`, or the configured default, capped at `max_wait`.
    fn wait_window(&self, id: &str, wait_ms: Option<u64>) -> Duration {
        let requested = wait_ms
            .map(Duration::from_millis)
            .unwrap_or(self.options.capture_delay);
        if requested > self.options.max_wait {
            warn!(
                job_id = %id,
                requested_ms = requested.as_millis() as u64,
                max_ms = self.options.max_wait.as_millis() as u64,
                "Wait window clamped"
            );
            return self.options.max_wait;
        }
        requested
    }

    fn workdir_line(&self, dir: &str) -> Option<String> {
        match self.options.workdir_hint {
            WorkdirHint::Comment => Some(format!("(workdir hint) {}", dir)),
            WorkdirHint::Ignore => None,
            WorkdirHint::ChangeDirectory => Some(format!("cd {}", shell_words::quote(dir))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pane::{FakePane, MockPaneAdapter, PaneCall};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tracing_test::traced_test;

    struct Harness {
        dispatcher: Dispatcher,
        pane: Arc<FakePane>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(pane: FakePane) -> Self {
            Self::with_options(pane, DispatchOptions::default())
        }

        fn with_options(pane: FakePane, options: DispatchOptions) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let pane = Arc::new(pane);
            let store = JobStore::open(dir.path().join("state")).unwrap();
            let events = Arc::new(EventLog::open(dir.path().join("events.log")).unwrap());
            let dispatcher = Dispatcher::new(pane.clone(), store, events, options);
            Self {
                dispatcher,
                pane,
                dir,
            }
        }

        fn events(&self) -> Vec<Value> {
            std::fs::read_to_string(self.dir.path().join("events.log"))
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    fn request(text: &str, id: Option<&str>) -> SubmitRequest {
        SubmitRequest {
            text: text.to_string(),
            id: id.map(str::to_string),
            wait_ms: Some(0),
            ..SubmitRequest::default()
        }
    }

    #[tokio::test]
    async fn stores_output_after_marker() {
        let h = Harness::new(FakePane::with_screen(
            "claude:0.0",
            "<<<BRIDGE_START id=job1>>>\nhi\n",
        ));

        let submission = h.dispatcher.submit(request("echo hi", Some("job1"))).await.unwrap();

        assert_eq!(submission.id, "job1");
        assert_eq!(submission.status, JobStatus::Accepted);
        assert!(submission.preview.ends_with("hi"));
        assert_eq!(h.dispatcher.store().read("job1").unwrap(), "hi");
    }

    #[tokio::test]
    async fn missing_marker_stores_whole_capture() {
        let h = Harness::new(FakePane::with_screen(
            "claude:0.0",
            "\n  cleared screen\nsome output  \n\n",
        ));

        h.dispatcher.submit(request("ls", Some("job2"))).await.unwrap();

        assert_eq!(
            h.dispatcher.store().read("job2").unwrap(),
            "cleared screen\nsome output"
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn warns_when_marker_scrolled_away() {
        let h = Harness::new(FakePane::with_screen("claude:0.0", "only later output\n"));

        h.dispatcher.submit(request("x", Some("gone"))).await.unwrap();

        assert!(logs_contain("Marker not found"));
        assert_eq!(h.dispatcher.store().read("gone").unwrap(), "only later output");
    }

    #[tokio::test]
    async fn injects_each_line_in_order_after_marker() {
        let h = Harness::new(FakePane::new("claude:0.0"));

        h.dispatcher
            .submit(request("first\nsecond\r\nthird", Some("multi")))
            .await
            .unwrap();

        assert_eq!(
            h.pane.calls(),
            vec![
                PaneCall::Inject("<<<BRIDGE_START id=multi>>>".into()),
                PaneCall::Inject("first".into()),
                PaneCall::Inject("second".into()),
                PaneCall::Inject("third".into()),
                PaneCall::Capture(2000),
            ]
        );
        assert_eq!(
            h.dispatcher.store().read("multi").unwrap(),
            "first\nsecond\nthird"
        );
    }

    #[tokio::test]
    async fn lone_carriage_return_splits_lines() {
        let h = Harness::new(FakePane::new("claude:0.0"));

        h.dispatcher
            .submit(request("first\rsecond", Some("cr")))
            .await
            .unwrap();

        assert_eq!(
            h.pane.calls(),
            vec![
                PaneCall::Inject("<<<BRIDGE_START id=cr>>>".into()),
                PaneCall::Inject("first".into()),
                PaneCall::Inject("second".into()),
                PaneCall::Capture(2000),
            ]
        );
    }

    #[tokio::test]
    async fn echoed_terminal_output_is_attributed_to_job() {
        let pane = FakePane::new("claude:0.0");
        pane.print("$ earlier command\nearlier output\n");
        let h = Harness::new(pane.reply_with("result line\n"));

        let submission = h.dispatcher.submit(request("run", Some("echo1"))).await.unwrap();

        let stored = h.dispatcher.store().read("echo1").unwrap();
        assert!(!stored.contains("earlier output"));
        assert!(stored.ends_with("run\nresult line"));
        assert_eq!(submission.preview, stored);
    }

    #[tokio::test]
    async fn resubmitting_same_id_overwrites() {
        let h = Harness::new(FakePane::new("claude:0.0").reply_with("ok\n"));

        h.dispatcher.submit(request("one", Some("same"))).await.unwrap();
        h.dispatcher.submit(request("two", Some("same"))).await.unwrap();

        let stored = h.dispatcher.store().read("same").unwrap();
        assert_eq!(stored, "ok\ntwo\nok");
    }

    #[tokio::test]
    async fn derived_ids_differ_for_identical_text() {
        let h = Harness::new(FakePane::new("claude:0.0"));

        let a = h.dispatcher.submit(request("pwd", None)).await.unwrap();
        let b = h.dispatcher.submit(request("pwd", None)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 12);
        assert!(h.dispatcher.store().contains(&a.id));
        assert!(h.dispatcher.store().contains(&b.id));
    }

    #[tokio::test]
    async fn empty_id_is_derived() {
        let h = Harness::new(FakePane::new("claude:0.0"));

        let submission = h.dispatcher.submit(request("pwd", Some(""))).await.unwrap();

        assert_eq!(submission.id.len(), 12);
        assert!(submission.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(h.dispatcher.store().contains(&submission.id));
        assert_eq!(
            h.pane.injected()[0],
            format!("<<<BRIDGE_START id={}>>>", submission.id)
        );
    }

    #[tokio::test]
    async fn invalid_id_rejected_before_injection() {
        let h = Harness::new(FakePane::new("claude:0.0"));

        let err = h
            .dispatcher
            .submit(request("rm -rf /", Some("../escape")))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidJobId(_)));
        assert!(h.pane.calls().is_empty());
    }

    #[tokio::test]
    async fn preview_is_tail_of_output() {
        let options = DispatchOptions {
            preview_chars: 5,
            ..DispatchOptions::default()
        };
        let h = Harness::with_options(
            FakePane::with_screen("claude:0.0", "<<<BRIDGE_START id=p>>>\n0123456789\n"),
            options,
        );

        let submission = h.dispatcher.submit(request("x", Some("p"))).await.unwrap();

        assert_eq!(submission.preview, "56789");
        assert_eq!(h.dispatcher.store().read("p").unwrap(), "0123456789");
    }

    #[tokio::test]
    async fn workdir_comment_precedes_marker() {
        let h = Harness::new(FakePane::new("claude:0.0"));
        let mut req = request("ls", Some("wd"));
        req.workdir = Some("/srv/app".into());

        h.dispatcher.submit(req).await.unwrap();

        assert_eq!(
            h.pane.injected(),
            vec![
                "(workdir hint) /srv/app",
                "<<<BRIDGE_START id=wd>>>",
                "ls"
            ]
        );
    }

    #[tokio::test]
    async fn workdir_ignore_and_cd_policies() {
        let ignore = Harness::with_options(
            FakePane::new("claude:0.0"),
            DispatchOptions {
                workdir_hint: WorkdirHint::Ignore,
                ..DispatchOptions::default()
            },
        );
        let mut req = request("ls", Some("wd"));
        req.workdir = Some("/srv/my app".into());
        ignore.dispatcher.submit(req.clone()).await.unwrap();
        assert_eq!(ignore.pane.injected(), vec!["<<<BRIDGE_START id=wd>>>", "ls"]);

        let cd = Harness::with_options(
            FakePane::new("claude:0.0"),
            DispatchOptions {
                workdir_hint: WorkdirHint::ChangeDirectory,
                ..DispatchOptions::default()
            },
        );
        cd.dispatcher.submit(req).await.unwrap();
        assert_eq!(cd.pane.injected()[0], "cd '/srv/my app'");
    }

    #[tokio::test]
    async fn empty_workdir_is_no_hint() {
        let h = Harness::new(FakePane::new("claude:0.0"));
        let mut req = request("ls", Some("wd"));
        req.workdir = Some(String::new());

        h.dispatcher.submit(req).await.unwrap();

        assert_eq!(h.pane.injected(), vec!["<<<BRIDGE_START id=wd>>>", "ls"]);
    }

    #[tokio::test(start_paused = true)]
    async fn default_wait_window_applies_when_unset() {
        let h = Harness::new(FakePane::new("claude:0.0"));
        let mut req = request("sleepy", Some("w"));
        req.wait_ms = None;

        let started = tokio::time::Instant::now();
        h.dispatcher.submit(req).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1510), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_wait_overrides_default() {
        let h = Harness::new(FakePane::new("claude:0.0"));
        let mut req = request("quick", Some("w"));
        req.wait_ms = Some(250);

        let started = tokio::time::Instant::now();
        h.dispatcher.submit(req).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(260), "{:?}", elapsed);
    }

    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn oversized_wait_is_clamped() {
        let options = DispatchOptions {
            max_wait: Duration::from_secs(5),
            ..DispatchOptions::default()
        };
        let h = Harness::with_options(FakePane::new("claude:0.0"), options);
        let mut req = request("forever", Some("w"));
        req.wait_ms = Some(u64::MAX);

        let started = tokio::time::Instant::now();
        h.dispatcher.submit(req).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(5010), "{:?}", elapsed);
        assert!(logs_contain("Wait window clamped"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_jobs_do_not_interleave() {
        let h = Harness::new(FakePane::new("claude:0.0").reply_with("done\n"));
        let mut first = request("alpha", Some("j1"));
        first.wait_ms = Some(100);
        let mut second = request("beta", Some("j2"));
        second.wait_ms = Some(100);

        let (a, b) = tokio::join!(h.dispatcher.submit(first), h.dispatcher.submit(second));
        a.unwrap();
        b.unwrap();

        assert_eq!(
            h.pane.calls(),
            vec![
                PaneCall::Inject("<<<BRIDGE_START id=j1>>>".into()),
                PaneCall::Inject("alpha".into()),
                PaneCall::Capture(2000),
                PaneCall::Inject("<<<BRIDGE_START id=j2>>>".into()),
                PaneCall::Inject("beta".into()),
                PaneCall::Capture(2000),
            ]
        );
        assert_eq!(h.dispatcher.store().read("j1").unwrap(), "done\nalpha\ndone");
        assert_eq!(h.dispatcher.store().read("j2").unwrap(), "done\nbeta\ndone");
    }

    #[tokio::test]
    async fn logs_accept_and_delivered_events() {
        let h = Harness::new(FakePane::with_screen(
            "claude:0.0",
            "<<<BRIDGE_START id=ev>>>\na\nb\n",
        ));
        let mut req = request("two lines", Some("ev"));
        req.mode = Some("plan".into());

        h.dispatcher.submit(req).await.unwrap();

        let events = h.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "accept");
        assert_eq!(events[0]["id"], "ev");
        assert_eq!(events[0]["mode"], "plan");
        assert_eq!(events[0]["n_chars"], 9);
        assert!(events[0]["workdir"].is_null());
        assert_eq!(events[1]["event"], "delivered");
        assert_eq!(events[1]["n_lines"], 2);
    }

    #[tokio::test]
    async fn default_mode_recorded_when_absent() {
        let h = Harness::new(FakePane::new("claude:0.0"));
        h.dispatcher.submit(request("x", Some("m"))).await.unwrap();
        assert_eq!(h.events()[0]["mode"], "ask");
    }

    #[tokio::test]
    async fn injection_failure_is_not_stored_and_not_rolled_back() {
        let h = Harness::new(FakePane::new("claude:0.0").fail_inject_at(2));

        let err = h
            .dispatcher
            .submit(request("one\ntwo\nthree", Some("half")))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Pane(PaneError::Injection { .. })));
        // Marker and first line were already typed; no capture happened.
        assert_eq!(
            h.pane.injected(),
            vec!["<<<BRIDGE_START id=half>>>", "one", "two"]
        );
        assert!(!h.pane.calls().contains(&PaneCall::Capture(2000)));
        assert!(!h.dispatcher.store().contains("half"));
        let events = h.events();
        assert_eq!(events.last().unwrap()["event"], "failed");
    }

    #[tokio::test]
    async fn capture_failure_surfaces_as_pane_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = MockPaneAdapter::new();
        mock.expect_target().return_const("claude:0.0".to_string());
        mock.expect_inject().times(2).returning(|_| Ok(()));
        mock.expect_capture()
            .withf(|depth| *depth == 2000)
            .times(1)
            .returning(|_| {
                Err(PaneError::Capture {
                    target: "claude:0.0".into(),
                    reason: "no server running".into(),
                })
            });

        let dispatcher = Dispatcher::new(
            Arc::new(mock),
            JobStore::open(dir.path().join("state")).unwrap(),
            Arc::new(EventLog::open(dir.path().join("events.log")).unwrap()),
            DispatchOptions::default(),
        );

        let err = dispatcher
            .submit(request("status", Some("cap")))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Pane(PaneError::Capture { .. })));
        assert!(!dispatcher.store().contains("cap"));
    }

    #[tokio::test]
    async fn health_reflects_pane() {
        let healthy = Harness::new(FakePane::new("claude:0.0"));
        assert!(healthy.dispatcher.health().await.is_ok());

        let gone = Harness::new(FakePane::new("claude:0.0").unavailable());
        assert!(matches!(
            gone.dispatcher.health().await,
            Err(PaneError::Unavailable { .. })
        ));
    }
}
