//! Liveness heartbeat
//!
//! Runs on one dedicated OS thread with its own current-thread tokio
//! runtime, so a slow or unreachable endpoint can never stall interception.
//! Every failure is logged and dropped.
//!
//! The payload identifies the machine by host name (via `sysinfo`), not by
//! the name of the user running the process.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use interpose_core::epoch_millis;

/// Name of the heartbeat thread
pub const THREAD_NAME: &str = "interpose-heartbeat";

/// Heartbeat settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Whether the host should start a heartbeat at all
    pub enabled: bool,
    pub interval: Duration,
    /// Delay before the first beat
    pub initial_delay: Duration,
    /// POST endpoint; `None` logs locally only
    pub url: Option<String>,
    /// Connect and request timeout
    pub timeout: Duration,
    /// Value of the payload's `agent` field
    pub agent: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            enabled: false,
            interval: Duration::from_secs(30),
            initial_delay: Duration::from_secs(5),
            url: None,
            timeout: Duration::from_secs(3),
            agent: "bytebuddy_agent".to_string(),
        }
    }
}

/// JSON body posted on every beat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub hostname: String,
    pub runtime_version: String,
    pub agent: String,
}

impl HeartbeatPayload {
    pub fn collect(agent: &str) -> Self {
        HeartbeatPayload {
            timestamp: epoch_millis(SystemTime::now()),
            hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
            runtime_version: concat!("interpose/", env!("CARGO_PKG_VERSION")).to_string(),
            agent: agent.to_string(),
        }
    }
}

/// Beat counters
#[derive(Debug, Default)]
pub struct HeartbeatStats {
    beats: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl HeartbeatStats {
    /// Beats fired, posted or not
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    /// Posts answered with a 2xx status
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Posts that failed or got a non-2xx answer
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Periodic liveness reporter
pub struct Heartbeat;

impl Heartbeat {
    /// Spawn the heartbeat thread
    ///
    /// Fails only if the interval is zero, or the runtime or the thread
    /// cannot be created.
    pub fn start(config: HeartbeatConfig) -> io::Result<HeartbeatHandle> {
        if config.interval.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "heartbeat interval must be positive",
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(HeartbeatStats::default());

        tracing::info!(
            "[Heartbeat] starting: every {}, first in {}, endpoint {}",
            humantime::format_duration(config.interval),
            humantime::format_duration(config.initial_delay),
            config.url.as_deref().unwrap_or("none")
        );

        let thread_stats = Arc::clone(&stats);
        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(run(config, shutdown_rx, thread_stats)))?;

        Ok(HeartbeatHandle {
            shutdown: shutdown_tx,
            thread: Some(thread),
            stats,
        })
    }
}

async fn run(config: HeartbeatConfig, mut shutdown: watch::Receiver<bool>, stats: Arc<HeartbeatStats>) {
    let client = match config.url {
        Some(_) => match reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("[Heartbeat] http client unavailable, logging only: {}", e);
                None
            }
        },
        None => None,
    };

    let mut ticker = tokio::time::interval_at(Instant::now() + config.initial_delay, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        // a stop request waits for this beat
        beat(&config, client.as_ref(), &stats).await;
    }
    tracing::info!("[Heartbeat] stopped after {} beat(s)", stats.beats());
}

async fn beat(config: &HeartbeatConfig, client: Option<&reqwest::Client>, stats: &HeartbeatStats) {
    let payload = HeartbeatPayload::collect(&config.agent);
    stats.beats.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "[Heartbeat] {} | host {} | runtime {} | ALIVE",
        payload.timestamp,
        payload.hostname,
        payload.runtime_version
    );

    let (Some(url), Some(client)) = (config.url.as_deref(), client) else {
        return;
    };
    match client.post(url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            stats.delivered.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("[Heartbeat] delivered: {}", response.status());
        }
        Ok(response) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("[Heartbeat] endpoint answered {}", response.status());
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("[Heartbeat] post failed: {}", e);
        }
    }
}

/// Owner of a running heartbeat; dropping it stops the task
pub struct HeartbeatHandle {
    shutdown: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<HeartbeatStats>,
}

impl HeartbeatHandle {
    pub fn stats(&self) -> &HeartbeatStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop scheduling beats and wait for the thread
    ///
    /// A beat already in flight finishes first.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.shutdown.send(true);
        if thread.join().is_err() {
            tracing::warn!("[Heartbeat] thread panicked");
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl std::fmt::Debug for HeartbeatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatHandle")
            .field("running", &self.is_running())
            .field("stats", &self.stats)
            .finish()
    }
}
