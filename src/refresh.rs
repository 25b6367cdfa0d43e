//! Background refresh of the service snapshot.
//!
//! [`RefreshController`] owns the fetch/poll/error/retry lifecycle: it
//! fetches once on [`start`](RefreshController::start), then again on every
//! tick of a fixed interval and on every manual
//! [`refetch`](RefreshController::refetch).  Subscribers receive a
//! [`RefreshState`] snapshot after every transition.
//!
//! ```text
//!            start / tick / refetch
//!   Idle ─────────────► Loading ──── ok ───► Ready ─┐
//!                         ▲  └────── err ──► Error ─┤
//!                         └──── tick / refetch ─────┘
//! ```
//!
//! At most one fetch is ever outstanding: a tick or refetch that arrives
//! while the phase is [`Phase::Loading`] is dropped, not queued, so a hung
//! request is never duplicated.  Failures are never fatal; the controller
//! stays armed and tries again on the next tick.
//!
//! ## For contributors
//!
//! Every transition happens under one mutex, and listeners run under it too,
//! in transition order.  Listeners must therefore be quick and must not call
//! back into the controller (the TUI's listener just forwards the snapshot
//! over a channel).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::source::{DataSource, FetchError, ServiceGroup};

/// How often the controller re-fetches when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not started yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed.
    Error,
}

/// The view state handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshState {
    pub phase: Phase,
    /// Last successfully fetched snapshot, in backend order.  Survives
    /// failures; empty until the first success.
    pub data: Vec<ServiceGroup>,
    /// Description of the last failure.  Always `None` when `Ready`.
    pub error_message: Option<String>,
    /// Completion time of the last successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
}

impl RefreshState {
    fn succeed(&mut self, groups: Vec<ServiceGroup>, at: DateTime<Utc>) {
        self.phase = Phase::Ready;
        self.data = groups;
        self.error_message = None;
        self.last_updated = Some(at);
    }

    fn fail(&mut self, err: &FetchError) {
        self.phase = Phase::Error;
        self.error_message = Some(err.to_string());
    }
}

/// What asked for a refresh; only used for logging.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Start,
    Timer,
    Manual,
}

type Listener = Box<dyn Fn(&RefreshState) + Send>;

struct Inner {
    state: RefreshState,
    listeners: Vec<Listener>,
    stopped: bool,
}

impl Inner {
    fn publish(&self) {
        for listener in &self.listeners {
            listener(&self.state);
        }
    }
}

/// State shared between the controller handle, the timer task and the
/// in-flight fetch task.
struct Shared<S> {
    source: S,
    inner: Mutex<Inner>,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: DataSource> Shared<S> {
    /// Move to `Loading` and spawn one fetch, unless stopped or a fetch is
    /// already in flight.  Returns whether a fetch was started.
    fn request_refresh(self: &Arc<Self>, trigger: Trigger) -> bool {
        {
            let mut inner = self.lock();
            if inner.stopped {
                debug!(?trigger, "controller stopped; ignoring refresh request");
                return false;
            }
            if inner.state.phase == Phase::Loading {
                debug!(?trigger, "refresh already in flight; suppressed");
                return false;
            }
            inner.state.phase = Phase::Loading;
            inner.publish();
        }

        debug!(?trigger, "refresh started");
        // Fetch in a child task: a panicking source must still end the
        // cycle, or the phase would stay `Loading` for good.
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let fetcher = Arc::clone(&shared);
            let fetch = tokio::spawn(async move { fetcher.source.fetch_service_groups().await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(err) => {
                    error!(error = %err, "fetch task did not finish");
                    Err(FetchError::Task(err.to_string()))
                }
            };
            shared.complete(result);
        });
        true
    }

    fn complete(&self, result: Result<Vec<ServiceGroup>, FetchError>) {
        let mut inner = self.lock();
        if inner.stopped {
            debug!("controller stopped; discarding fetch result");
            return;
        }

        match result {
            Ok(groups) => {
                debug!(groups = groups.len(), "refresh succeeded");
                inner.state.succeed(groups, Utc::now());
            }
            Err(err) => {
                warn!(error = %err, "refresh failed");
                inner.state.fail(&err);
            }
        }
        inner.publish();
    }
}

/// Polls a [`DataSource`] on a fixed interval and tracks the result.
///
/// Must be started and used from within a tokio runtime context.
pub struct RefreshController<S> {
    shared: Arc<Shared<S>>,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl<S: DataSource> RefreshController<S> {
    /// Create an idle controller.  Nothing is fetched until
    /// [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    pub fn new(source: S, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        Self {
            shared: Arc::new(Shared {
                source,
                inner: Mutex::new(Inner {
                    state: RefreshState::default(),
                    listeners: Vec::new(),
                    stopped: false,
                }),
            }),
            interval,
            timer: None,
        }
    }

    /// Register a listener that receives the state after every transition.
    pub fn subscribe(&self, listener: impl Fn(&RefreshState) + Send + 'static) {
        self.shared.lock().listeners.push(Box::new(listener));
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RefreshState {
        self.shared.lock().state.clone()
    }

    /// Fetch immediately, then arm the recurring timer.
    ///
    /// Calling it again, or after [`stop`](Self::stop), does nothing.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            warn!("refresh controller already started");
            return;
        }
        if self.shared.lock().stopped {
            warn!("refresh controller was stopped; not restarting");
            return;
        }

        self.shared.request_refresh(Trigger::Start);

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.request_refresh(Trigger::Timer);
            }
        }));

        info!(interval_ms = period.as_millis() as u64, "refresh controller started");
    }

    /// Request an out-of-cycle refresh.
    ///
    /// Subject to the same suppression as timer ticks and does not move the
    /// timer's schedule.  Returns whether a fetch was actually started.
    pub fn refetch(&self) -> bool {
        if self.timer.is_none() {
            debug!("refresh controller not running; ignoring refetch");
            return false;
        }
        self.shared.request_refresh(Trigger::Manual)
    }
}

impl<S> RefreshController<S> {
    /// Cancel the timer and freeze the state.
    ///
    /// A fetch still in flight is allowed to finish, but its result is
    /// discarded.  Idempotent.
    pub fn stop(&mut self) {
        {
            let mut inner = self.shared.lock();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        info!("refresh controller stopped");
    }
}

impl<S> Drop for RefreshController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
