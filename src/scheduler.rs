use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::{PolicyConfig, SchedulerConfig};
use crate::fetcher::PageFetcher;
use crate::models::{MonitoredLink, PricePoint};
use crate::notifier::{self, Notifier};
use crate::parser;
use crate::policy::ExtremumPolicy;
use crate::store::{HistoryStore, LinkRegistry};
use crate::utils::error::{Result, VigiaError};

/// Snapshot of one monitor job's state, returned from `register` and
/// `job_info` for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub url: String,
    pub destination: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub last_error: Option<String>,
}

/// Per-job state machine: `Active` loops on success; `Cancelled` is
/// terminal, reached by user cancel or by a fetch/parse failure. No
/// transition leaves `Cancelled`; a cancelled URL must be re-registered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Active,
    Cancelled,
}

struct JobEntry {
    info: JobInfo,
    handle: JoinHandle<()>,
}

/// Owns the set of recurring monitor jobs, one per URL. Each job is a
/// spawned task looping fetch-parse-decide-notify-persist with a fixed
/// interval between cycles, so one job's cycles never overlap and a slow
/// cycle delays rather than duplicates the next. Job failure never affects
/// other jobs.
///
/// Registry mutations happen while holding the job-map lock, so the map
/// and the durable link set move together: a status check and the registry
/// write it justifies cannot interleave with another job transition.
pub struct MonitorScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    jobs: RwLock<HashMap<String, JobEntry>>, // url -> JobEntry
    history: Arc<dyn HistoryStore>,
    registry: Arc<dyn LinkRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    policy: ExtremumPolicy,
    report_unchanged: bool,
    poll_interval: Duration,
    initial_delay: Duration,
    reconciled: AtomicBool,
}

impl MonitorScheduler {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        registry: Arc<dyn LinkRegistry>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        scheduler_config: &SchedulerConfig,
        policy_config: &PolicyConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                jobs: RwLock::new(HashMap::new()),
                history,
                registry,
                fetcher,
                notifier,
                policy: policy_config.extremum,
                report_unchanged: policy_config.report_unchanged,
                poll_interval: Duration::from_secs(scheduler_config.poll_interval_secs),
                initial_delay: Duration::from_secs(scheduler_config.initial_delay_secs),
                reconciled: AtomicBool::new(false),
            }),
        }
    }

    /// Starts monitoring a URL. If a job for it is already active the
    /// existing snapshot is returned and nothing is created; otherwise the
    /// link is persisted to the registry and a recurring job is scheduled
    /// with a short initial delay.
    ///
    /// The active check, the registry insert, and the job creation happen
    /// under the job-map lock, so a job going terminal at the same moment
    /// cannot be observed as active here nor delete the row inserted here.
    pub async fn register(&self, url: &str, destination: &str) -> Result<JobInfo> {
        let mut jobs = self.inner.jobs.write().await;
        if let Some(entry) = jobs.get(url) {
            if entry.info.status == JobStatus::Active {
                tracing::debug!("Job for {} already active, skipping registration", url);
                return Ok(entry.info.clone());
            }
        }

        self.inner
            .registry
            .insert(&MonitoredLink::new(url, destination))
            .await?;

        Ok(Self::spawn_locked(&self.inner, &mut jobs, url, destination))
    }

    /// Stops monitoring a URL. Returns false when no job for it is active.
    /// Safe to call while that job's cycle is in flight: the current cycle
    /// may still finish its persist/notify step, but no further cycle runs.
    pub async fn cancel(&self, url: &str) -> Result<bool> {
        let mut jobs = self.inner.jobs.write().await;
        match jobs.get_mut(url) {
            Some(entry) if entry.info.status == JobStatus::Active => {
                entry.info.status = JobStatus::Cancelled;
                entry.handle.abort();
            }
            _ => return Ok(false),
        }

        self.inner.registry.delete(url).await?;
        tracing::info!("Cancelled monitor job for {}", url);
        Ok(true)
    }

    /// URLs of active jobs, in lexical order.
    pub async fn list_active(&self) -> Vec<String> {
        let jobs = self.inner.jobs.read().await;
        let mut urls: Vec<String> = jobs
            .values()
            .filter(|entry| entry.info.status == JobStatus::Active)
            .map(|entry| entry.info.url.clone())
            .collect();
        urls.sort();
        urls
    }

    pub async fn job_info(&self, url: &str) -> Option<JobInfo> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(url).map(|entry| entry.info.clone())
    }

    /// Rebuilds the in-memory job set from the link registry: one active
    /// job per persisted link, no registry writes. Must run exactly once,
    /// before any command is dispatched; a second call is an error.
    pub async fn reconcile_on_startup(&self) -> Result<usize> {
        if self.inner.reconciled.swap(true, Ordering::SeqCst) {
            return Err(VigiaError::Internal(
                "reconcile_on_startup must run exactly once".to_string(),
            ));
        }

        let links = self.inner.registry.load_all().await?;
        let restored = links.len();

        let mut jobs = self.inner.jobs.write().await;
        for link in links {
            Self::spawn_locked(&self.inner, &mut jobs, &link.link, &link.destination);
        }

        tracing::info!("Reconciled {} monitor job(s) from the link registry", restored);
        Ok(restored)
    }

    /// Aborts all job tasks. In-memory state is discarded; the link
    /// registry keeps the durable set for the next startup reconcile.
    pub async fn shutdown(&self) {
        let mut jobs = self.inner.jobs.write().await;
        for (url, entry) in jobs.drain() {
            entry.handle.abort();
            tracing::debug!("Aborted monitor job for {}", url);
        }
        tracing::info!("Monitor scheduler shutdown");
    }

    /// Inserts an active job for the URL, replacing a cancelled tombstone
    /// if one is present. Exactly one job per URL at a time. The caller
    /// holds the job-map lock.
    fn spawn_locked(
        inner: &Arc<SchedulerInner>,
        jobs: &mut HashMap<String, JobEntry>,
        url: &str,
        destination: &str,
    ) -> JobInfo {
        if let Some(entry) = jobs.get(url) {
            if entry.info.status == JobStatus::Active {
                return entry.info.clone();
            }
        }

        let info = JobInfo {
            url: url.to_string(),
            destination: destination.to_string(),
            status: JobStatus::Active,
            created_at: Utc::now(),
            last_run: None,
            run_count: 0,
            last_error: None,
        };

        let handle = tokio::spawn(Self::job_loop(
            Arc::downgrade(inner),
            url.to_string(),
            destination.to_string(),
        ));

        jobs.insert(
            url.to_string(),
            JobEntry {
                info: info.clone(),
                handle,
            },
        );

        tracing::info!("Scheduled monitor job for {}", url);
        info
    }

    async fn job_loop(inner: Weak<SchedulerInner>, url: String, destination: String) {
        let initial_delay = match inner.upgrade() {
            Some(sched) => sched.initial_delay,
            None => return,
        };
        tokio::time::sleep(initial_delay).await;

        loop {
            let Some(sched) = inner.upgrade() else {
                return;
            };
            let interval = sched.poll_interval;

            match Self::run_cycle(&sched, &url, &destination).await {
                Ok(()) => {
                    if !Self::record_run(&sched, &url, None).await {
                        // Cancelled while the cycle was in flight.
                        return;
                    }
                }
                Err(err) if err.is_terminal() => {
                    tracing::error!("Disabling monitor job for {}: {}", url, err);

                    // Transition and registry delete under the lock; only
                    // the task that performs the transition sends the
                    // cancellation notice, so exactly one is produced even
                    // when a user cancel lands at the same time.
                    let transitioned = {
                        let mut jobs = sched.jobs.write().await;
                        match jobs.get_mut(&url) {
                            Some(entry) if entry.info.status == JobStatus::Active => {
                                entry.info.status = JobStatus::Cancelled;
                                entry.info.last_run = Some(Utc::now());
                                entry.info.run_count += 1;
                                entry.info.last_error = Some(err.to_string());
                                if let Err(e) = sched.registry.delete(&url).await {
                                    tracing::error!(
                                        "Failed to remove registry entry for {}: {}",
                                        url,
                                        e
                                    );
                                }
                                true
                            }
                            _ => false,
                        }
                    };

                    if transitioned {
                        notifier::send_best_effort(
                            sched.notifier.as_ref(),
                            &destination,
                            &format!("Monitoring cancelled for {}: {}", url, err),
                        )
                        .await;
                    }
                    return;
                }
                Err(err) => {
                    tracing::warn!("Cycle for {} failed, retrying next cycle: {}", url, err);
                    if !Self::record_run(&sched, &url, Some(err.to_string())).await {
                        return;
                    }
                }
            }

            drop(sched);
            tokio::time::sleep(interval).await;
        }
    }

    /// Updates the job's run statistics. Returns false when the job is no
    /// longer active, signalling the loop to stop.
    async fn record_run(sched: &SchedulerInner, url: &str, error: Option<String>) -> bool {
        let mut jobs = sched.jobs.write().await;
        match jobs.get_mut(url) {
            Some(entry) if entry.info.status == JobStatus::Active => {
                entry.info.last_run = Some(Utc::now());
                entry.info.run_count += 1;
                entry.info.last_error = error;
                true
            }
            _ => false,
        }
    }

    /// One fetch-parse-decide-notify-persist cycle. Fetch and parse errors
    /// propagate and disable the job; store errors on the baseline query or
    /// the save are absorbed here and retried next cycle, and delivery
    /// failures are swallowed by the notifier helper.
    async fn run_cycle(sched: &SchedulerInner, url: &str, destination: &str) -> Result<()> {
        tracing::debug!("Starting check cycle for {}", url);

        let body = sched.fetcher.fetch(url).await?;
        let observation = parser::parse_product_page(&body)?;

        match Self::baseline(sched).await {
            Ok(baseline) => {
                let decision =
                    sched
                        .policy
                        .evaluate(&observation, baseline.as_ref(), sched.report_unchanged);
                if let Some(message) = &decision.message {
                    notifier::send_best_effort(sched.notifier.as_ref(), destination, message)
                        .await;
                }
            }
            Err(e) => {
                // Without a baseline we cannot classify notability; the
                // observation is still persisted below.
                tracing::warn!(
                    "Baseline query failed for {}, skipping notification decision: {}",
                    url,
                    e
                );
            }
        }

        if let Err(e) = sched.history.append(&observation).await {
            tracing::warn!("Failed to persist observation for {}: {}", url, e);
        } else {
            tracing::debug!(
                "Persisted observation for {}: {} at {}",
                url,
                observation.new_price,
                observation.timestamp
            );
        }

        Ok(())
    }

    async fn baseline(sched: &SchedulerInner) -> Result<Option<PricePoint>> {
        match sched.policy {
            ExtremumPolicy::Max => sched.history.max_price().await,
            ExtremumPolicy::Min => sched.history.min_price().await,
        }
    }
}
