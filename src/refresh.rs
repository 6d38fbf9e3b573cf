//! Background weather refresh
//!
//! A tokio task re-fetches the forecast on an interval (and on demand) and
//! reports results over an mpsc channel. Every fetch is stamped with a request
//! generation; [`WeatherState`] only accepts the result of the most recent one,
//! so a slow response can never overwrite a newer record.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::WEATHER_CACHE_TTL_MINUTES;
use crate::data::{FetchError, Location, WeatherRecord};
use crate::normalizer::WeatherNormalizer;
use crate::units::TemperatureUnit;

/// Issues monotonically increasing request generations
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier one
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Whether a completion for `generation` may still be applied
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest()
    }
}

/// Messages sent from the background refresh task
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A fetch was issued
    RefreshStarted { generation: u64 },
    /// A fetch produced a new record
    WeatherUpdated {
        generation: u64,
        record: Box<WeatherRecord>,
    },
    /// A fetch failed; the message is the displayable error
    RefreshError { generation: u64, message: String },
}

/// Latest known weather plus fetch bookkeeping
#[derive(Debug, Clone)]
pub struct WeatherState {
    tracker: RequestTracker,
    ttl: chrono::Duration,
    record: Option<WeatherRecord>,
    error: Option<String>,
    last_fetch: Option<DateTime<Utc>>,
    loading: bool,
}

impl WeatherState {
    pub fn new(tracker: RequestTracker) -> Self {
        Self {
            tracker,
            ttl: chrono::Duration::minutes(WEATHER_CACHE_TTL_MINUTES),
            record: None,
            error: None,
            last_fetch: None,
            loading: false,
        }
    }

    pub fn record(&self) -> Option<&WeatherRecord> {
        self.record.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when nothing was fetched yet or the last fetch is older than the TTL
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.last_fetch {
            Some(at) => now.signed_duration_since(at) >= self.ttl,
            None => true,
        }
    }

    /// Records the outcome of request `generation`
    ///
    /// Returns `false` (and changes nothing) when a newer request was issued
    /// since. An error keeps the previous record.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<WeatherRecord, FetchError>,
        now: DateTime<Utc>,
    ) -> bool {
        match result {
            Ok(record) => self.apply(
                RefreshMessage::WeatherUpdated {
                    generation,
                    record: Box::new(record),
                },
                now,
            ),
            Err(e) => self.apply(
                RefreshMessage::RefreshError {
                    generation,
                    message: e.to_string(),
                },
                now,
            ),
        }
    }

    /// Applies a message from the refresh task, ignoring superseded ones
    pub fn apply(&mut self, message: RefreshMessage, now: DateTime<Utc>) -> bool {
        match message {
            RefreshMessage::RefreshStarted { generation } => {
                if !self.tracker.is_current(generation) {
                    return false;
                }
                self.loading = true;
            }
            RefreshMessage::WeatherUpdated { generation, record } => {
                if !self.tracker.is_current(generation) {
                    tracing::debug!(generation, "Ignoring superseded weather result");
                    return false;
                }
                self.record = Some(*record);
                self.error = None;
                self.last_fetch = Some(now);
                self.loading = false;
            }
            RefreshMessage::RefreshError {
                generation,
                message,
            } => {
                if !self.tracker.is_current(generation) {
                    tracing::debug!(generation, "Ignoring superseded weather error");
                    return false;
                }
                self.error = Some(message);
                self.loading = false;
            }
        }
        true
    }
}

/// Configuration for the refresh interval
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between automatic refreshes
    pub interval: Duration,
    /// Whether automatic refresh is enabled; on-demand refresh always works
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(WEATHER_CACHE_TTL_MINUTES as u64 * 60),
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh task
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    tracker: RequestTracker,
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the refresh task for one location
    ///
    /// Each fetch runs in its own task, so an on-demand refresh does not wait
    /// for a slow periodic one; the older result is then superseded.
    pub fn spawn(
        normalizer: WeatherNormalizer,
        location: Location,
        units: TemperatureUnit,
        config: RefreshConfig,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let tracker = RequestTracker::new();

        let task_tracker = tracker.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick(), if config.enabled => {}
                    trigger = trigger_rx.recv() => {
                        if trigger.is_none() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }

                let generation = task_tracker.begin();
                if msg_tx
                    .send(RefreshMessage::RefreshStarted { generation })
                    .await
                    .is_err()
                {
                    break;
                }

                let normalizer = normalizer.clone();
                let location = location.clone();
                let tx = msg_tx.clone();
                tokio::spawn(async move {
                    let message = match normalizer.refresh(&location, units).await {
                        Ok(record) => RefreshMessage::WeatherUpdated {
                            generation,
                            record: Box::new(record),
                        },
                        Err(e) => {
                            tracing::warn!(generation, error = %e, "Background refresh failed");
                            RefreshMessage::RefreshError {
                                generation,
                                message: e.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(message).await;
                });
            }
            tracing::debug!("Refresh task stopped");
        });

        Self {
            receiver: msg_rx,
            tracker,
            trigger_tx,
            shutdown_tx,
        }
    }

    /// Tracker shared with the task, for building a [`WeatherState`]
    pub fn tracker(&self) -> RequestTracker {
        self.tracker.clone()
    }

    /// Requests an immediate refresh; requests made while one is pending coalesce
    pub fn request_refresh(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Checks for a pending message without blocking
    pub fn try_recv(&mut self) -> Option<RefreshMessage> {
        self.receiver.try_recv().ok()
    }

    /// Stops the background task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Runs `work` unless `shutdown` completes first
///
/// `shutdown` is borrowed so one pinned signal future can guard every await
/// of a loop.
pub async fn or_shutdown<T, S>(work: impl Future<Output = T>, shutdown: Pin<&mut S>) -> Option<T>
where
    S: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = shutdown => None,
    }
}
