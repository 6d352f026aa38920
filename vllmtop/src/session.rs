//! Server session controller: owns the dashboard's view of one management
//! server, drives the poll loop and sequences user actions.
//!
//! All state lives in a `watch` channel. Every mutation goes through
//! `send_modify`, which gives a single writer at a time no matter which task
//! (poll loop, action, diagnostics fetch) produced the result.

use std::{
    cmp::Reverse,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiResult, ServerApi};
use crate::config::Settings;
use crate::prefs::PreferenceStore;
use crate::types::{Model, ServerState, ServerStatus, ServiceStatusDetails};

pub const DEFAULT_SERVICE_LINES: u32 = 120;
pub const MAX_SERVICE_LINES: u32 = 500;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub server_url: Option<String>,
    pub status: Option<ServerStatus>,
    /// Most recently used first.
    pub models: Vec<Model>,
    pub usage: HashMap<String, i64>,
    pub reachable: bool,
    pub busy: bool,
    /// Epoch millis of the first poll in the current Starting/Stopping run.
    pub transition_started_at: Option<i64>,
    pub last_error: Option<String>,
    pub service_status: Option<ServiceStatusDetails>,
    pub service_status_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            server_url: None,
            status: None,
            models: Vec::new(),
            usage: HashMap::new(),
            reachable: true,
            busy: false,
            transition_started_at: None,
            last_error: None,
            service_status: None,
            service_status_loading: false,
        }
    }
}

impl SessionState {
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> Option<i64> {
        self.transition_started_at
            .map(|started| now_ms.saturating_sub(started).max(0))
    }
}

/// Trim, drop trailing slashes, and require an http(s) scheme with a host.
pub fn normalize_url(raw: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SessionError::InvalidUrl("URL is empty".into()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| SessionError::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SessionError::InvalidUrl(format!(
            "{trimmed}: scheme must be http or https"
        )));
    }
    Ok(trimmed.to_string())
}

/// Stable sort: recorded models by descending timestamp, then the rest in
/// fetch order.
pub fn order_by_usage(models: &mut [Model], usage: &HashMap<String, i64>) {
    models.sort_by_key(|m| Reverse(usage.get(&m.id).copied()));
}

/// Next value of the transition timer given the previous and new state.
pub fn reconcile_transition(
    prev: Option<ServerState>,
    next: ServerState,
    started_at: Option<i64>,
    now_ms: i64,
) -> Option<i64> {
    let was = prev.is_some_and(ServerState::is_transitional);
    match (was, next.is_transitional()) {
        (_, false) => None,
        (false, true) => Some(now_ms),
        (true, true) => started_at.or(Some(now_ms)),
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Stop,
    Restart,
    Shutdown,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Start => "Start failed",
            Action::Stop => "Stop failed",
            Action::Restart => "Restart failed",
            Action::Shutdown => "Shutdown failed",
        }
    }
}

struct Inner {
    api: Arc<dyn ServerApi>,
    prefs: Arc<dyn PreferenceStore>,
    state: watch::Sender<SessionState>,
    poll_interval: Duration,
    clock: Clock,
    // Bumped on stop/configure/dispose; poll results from an older epoch are dropped.
    epoch: AtomicU64,
    disposed: AtomicBool,
    // held for the duration of one poll
    poll_gate: tokio::sync::Mutex<()>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(h) = self.poller.get_mut().ok().and_then(Option::take) {
            h.abort();
        }
    }
}

/// Cheap-to-clone handle; the poll loop only holds a weak reference, so
/// dropping the last handle ends polling.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(
        api: Arc<dyn ServerApi>,
        prefs: Arc<dyn PreferenceStore>,
        settings: Settings,
    ) -> Self {
        Self::with_clock(api, prefs, settings, Arc::new(now_ms))
    }

    pub fn with_clock(
        api: Arc<dyn ServerApi>,
        prefs: Arc<dyn PreferenceStore>,
        settings: Settings,
        clock: Clock,
    ) -> Self {
        let initial = SessionState {
            server_url: prefs.server_url(),
            usage: prefs.model_usage(),
            ..SessionState::default()
        };
        debug!(
            url = ?initial.server_url,
            usage_entries = initial.usage.len(),
            "session hydrated"
        );
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                api,
                prefs,
                state,
                poll_interval: settings.poll_interval,
                clock,
                epoch: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                poll_gate: tokio::sync::Mutex::new(()),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn now(&self) -> i64 {
        (self.inner.clock)()
    }

    fn server_url(&self) -> Option<String> {
        self.inner.state.borrow().server_url.clone()
    }

    fn alive(&self) -> bool {
        !self.inner.disposed.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        if self.alive() {
            self.inner.state.send_modify(f);
        }
    }

    /// Normalise, persist and switch to `raw`, then poll right away.
    pub async fn configure(&self, raw: &str) -> Result<(), SessionError> {
        let url = normalize_url(raw)?;
        if let Err(e) = self.inner.prefs.save_server_url(&url) {
            warn!(error = %e, "could not persist server URL");
        }
        info!(url = %url, "server configured");
        self.update(|s| s.server_url = Some(url));
        // after the URL swap, so a poll that read the old URL sees a new epoch
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.poll_now().await;
        Ok(())
    }

    pub fn start_polling(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                Session { inner }.poll_tick().await;
            }
        });
        let mut slot = self.inner.poller.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
        debug!(interval_ms = period.as_millis() as u64, "polling started");
    }

    pub fn stop_polling(&self) {
        let handle = self
            .inner
            .poller
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(h) = handle {
            h.abort();
            debug!("polling stopped");
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop polling and ignore any result still in flight.
    pub fn dispose(&self) {
        self.stop_polling();
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Timer path: skip if a poll is already running.
    async fn poll_tick(&self) {
        let Ok(_gate) = self.inner.poll_gate.try_lock() else {
            debug!("previous poll still running, skipping tick");
            return;
        };
        self.poll_locked().await;
    }

    /// Explicit path: wait for any running poll, then poll.
    pub async fn poll_now(&self) {
        let _gate = self.inner.poll_gate.lock().await;
        self.poll_locked().await;
    }

    async fn poll_locked(&self) {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let Some(url) = self.server_url() else {
            return;
        };
        let api = &self.inner.api;
        let res = tokio::try_join!(api.get_status(&url), api.get_models(&url));

        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!(url = %url, "discarding poll from a previous session epoch");
            return;
        }
        let now = self.now();
        match res {
            Ok((status, models)) => {
                debug!(url = %url, state = ?status.state, models = models.len(), "poll ok");
                self.update(|s| apply_poll(s, status, models, now));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "poll failed");
                self.update(|s| {
                    s.reachable = false;
                    s.busy = false;
                });
            }
        }
    }

    pub async fn start(&self) {
        self.fire(Action::Start).await
    }

    pub async fn stop(&self) {
        self.fire(Action::Stop).await
    }

    pub async fn restart(&self) {
        self.fire(Action::Restart).await
    }

    pub async fn shutdown(&self) {
        self.fire(Action::Shutdown).await
    }

    async fn fire(&self, action: Action) {
        let Some(url) = self.server_url() else {
            debug!(?action, "no server configured, ignoring action");
            return;
        };
        info!(?action, url = %url, "dispatching action");
        self.update(|s| s.busy = true);
        let api = &self.inner.api;
        let res = match action {
            Action::Start => api.start(&url).await,
            Action::Stop => api.stop(&url).await,
            Action::Restart => api.restart(&url).await,
            Action::Shutdown => api.shutdown(&url).await,
        };
        self.finish_action(action.label(), res);
    }

    fn finish_action(&self, label: &str, res: ApiResult<()>) {
        self.update(|s| {
            if let Err(e) = &res {
                s.last_error = Some(format!("{label}: {e}"));
            }
            s.busy = false;
        });
        if let Err(e) = res {
            warn!(error = %e, "{label}");
        }
    }

    /// Switch the served model; usage is recorded only if the server accepted.
    pub async fn switch_model(&self, model_id: &str) {
        let Some(url) = self.server_url() else {
            debug!(model = model_id, "no server configured, ignoring switch");
            return;
        };
        info!(model = model_id, url = %url, "switching model");
        self.update(|s| s.busy = true);
        let res = self.inner.api.switch_model(&url, model_id).await;
        if res.is_ok() {
            let ts = self.now();
            if let Err(e) = self.inner.prefs.record_model_usage(model_id, ts) {
                warn!(error = %e, model = model_id, "could not persist model usage");
            }
            self.update(|s| {
                s.usage.insert(model_id.to_string(), ts);
                let usage = &s.usage;
                order_by_usage(&mut s.models, usage);
            });
        }
        self.finish_action("Switch failed", res);
    }

    /// On-demand diagnostics; `lines` is clamped to 1..=500.
    pub async fn fetch_service_status(&self, lines: u32) {
        let Some(url) = self.server_url() else {
            return;
        };
        let lines = lines.clamp(1, MAX_SERVICE_LINES);
        self.update(|s| s.service_status_loading = true);
        let res = self.inner.api.get_service_status(&url, lines).await;
        self.update(|s| {
            match res {
                Ok(details) => s.service_status = Some(details),
                Err(e) => {
                    warn!(error = %e, "service status fetch failed");
                    s.last_error = Some(format!("Service status failed: {e}"));
                }
            }
            s.service_status_loading = false;
        });
    }

    /// Clear the one-shot error after it has been shown.
    pub fn consume_error(&self) {
        self.update(|s| s.last_error = None);
    }
}

fn apply_poll(s: &mut SessionState, status: ServerStatus, mut models: Vec<Model>, now: i64) {
    order_by_usage(&mut models, &s.usage);
    let prev = s.status.as_ref().map(|st| st.state);
    s.transition_started_at = reconcile_transition(prev, status.state, s.transition_started_at, now);
    s.status = Some(status);
    s.models = models;
    s.reachable = true;
    s.busy = false;
}
