//! The pull-based sync agent.
//!
//! On a fixed interval the agent asks the master which records changed since
//! its watermark. A non-empty delta triggers a full-state fetch, wholesale
//! regeneration of every affected zone file, cleanup of zones that vanished
//! from the authoritative listing, and a single reload of the local unbound
//! process. The watermark only advances after a cycle completes without
//! error, so a failed cycle is naturally retried on the next tick.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zonesync_types::{AgentConfig, Record};

use crate::reload::{ReloadOutcome, UnboundReloader};
use crate::zonefile;

const USER_AGENT: &str = "zonesync-agent";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors local to the agent. All of these are transient: the cycle is
/// aborted, the watermark stays put, and the next tick retries.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("master responded with HTTP status {0}")]
    Status(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Task(String),
}

/// The monotonic sync watermark. Not persisted: a restarted agent resyncs
/// from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark(i64);

impl Watermark {
    pub fn get(self) -> i64 {
        self.0
    }

    /// Advance, never regress.
    pub fn advance_to(&mut self, timestamp: i64) {
        if timestamp > self.0 {
            self.0 = timestamp;
        }
    }
}

/// What one sync cycle did, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Zones whose files were (re)written this cycle.
    pub written: Vec<String>,
    /// Zones whose stale files were removed this cycle.
    pub removed: Vec<String>,
    /// Present when a reload was attempted (at most once per cycle).
    pub reload: Option<ReloadOutcome>,
}

impl CycleReport {
    fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty() && self.reload.is_none()
    }
}

#[derive(serde::Deserialize)]
struct RecordsResponse {
    records: Vec<Record>,
}

/// Pulls record changes from a master and maintains the local zone files.
pub struct SyncAgent {
    http: reqwest::Client,
    config: AgentConfig,
    reloader: UnboundReloader,
    watermark: Watermark,
}

impl SyncAgent {
    /// The watermark is passed in explicitly so the host process decides its
    /// starting point (normally zero, meaning a full resync).
    pub fn new(config: AgentConfig, watermark: Watermark) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        let reloader = UnboundReloader::new(config.unbound_pidfile.clone());
        Ok(Self { http, config, reloader, watermark })
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Drive sync cycles until cancelled. Cancellation is honored between
    /// cycles only; an in-flight cycle always runs to completion.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            master = %self.config.master_location,
            interval_secs = self.config.update_interval().as_secs(),
            "sync agent started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("sync agent shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.run_cycle().await {
                Ok(report) if report.is_idle() => {}
                Ok(report) => {
                    info!(
                        flushed = ?report.written,
                        removed = ?report.removed,
                        reload = ?report.reload,
                        "sync cycle applied changes"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "sync cycle failed, retrying on next interval");
                }
            }
        }
    }

    /// One full cycle. Public so tests can step the agent without the ticker.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
        // Taken before the delta query: records mutated while this cycle runs
        // stay above the watermark and are picked up next time.
        let cycle_start = chrono::Utc::now().timestamp();

        let changed = self.fetch_records(Some(self.watermark.get())).await?;
        if changed.is_empty() {
            debug!("no records updated");
            return Ok(CycleReport::idle());
        }

        // The delta only says *that* a zone changed. Regeneration is
        // wholesale, so fetch the complete current state; it also provides
        // the authoritative zone list for stale cleanup.
        let all = self.fetch_records(None).await?;

        let affected: BTreeSet<String> = changed.into_iter().map(|r| r.zone).collect();
        let mut by_zone: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        for record in all {
            by_zone.entry(record.zone.clone()).or_default().push(record);
        }
        let live: HashSet<String> = by_zone.keys().cloned().collect();

        let to_write: Vec<(String, Vec<Record>)> = affected
            .into_iter()
            .filter_map(|zone| by_zone.get(&zone).map(|records| (zone, records.clone())))
            .collect();

        let dir = self.config.local_data_dir.clone();
        let (written, removed) = tokio::task::spawn_blocking(
            move || -> std::io::Result<(Vec<String>, Vec<String>)> {
                let mut written = Vec::with_capacity(to_write.len());
                for (zone, records) in &to_write {
                    zonefile::write_zone(&dir, zone, records)?;
                    written.push(zone.clone());
                }
                let removed = zonefile::remove_stale(&dir, &live)?;
                Ok((written, removed))
            },
        )
        .await
        .map_err(|err| SyncError::Task(err.to_string()))??;

        // One reload per cycle, no matter how many zones changed. A skipped
        // reload is not a failure: the records are materialized either way.
        let reload = if written.is_empty() && removed.is_empty() {
            None
        } else {
            Some(self.reloader.reload())
        };

        self.watermark.advance_to(cycle_start);

        Ok(CycleReport { written, removed, reload })
    }

    async fn fetch_records(&self, updated_after: Option<i64>) -> Result<Vec<Record>, SyncError> {
        let url = format!("{}/api/record", self.config.master_location.trim_end_matches('/'));
        let mut request = self.http.get(&url);
        if let Some(after) = updated_after {
            request = request.query(&[("updated", after)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Status(response.status().as_u16()));
        }

        let body: RecordsResponse = response.json().await?;
        Ok(body.records)
    }
}
