//! Shared periodic job runner handed to every managed device.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dtsgate_domain::id::JobId;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Cloneable handle to a set of periodic jobs running on the tokio runtime.
///
/// Every job runs on its own task. The first run happens one period after
/// scheduling. A job that overruns its period delays the next run instead
/// of bursting to catch up.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: DashMap<JobId, Job>,
    shutdown: CancellationToken,
}

#[derive(Debug)]
struct Job {
    name: String,
    token: CancellationToken,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` every `period` until removed or shut down.
    ///
    /// Must be called from within a tokio runtime. A zero period is
    /// treated as one millisecond.
    pub fn every<F, Fut>(&self, name: impl Into<String>, period: Duration, job: F) -> JobId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = JobId::new();
        let name = name.into();
        let period = period.max(Duration::from_millis(1));
        let token = self.inner.shutdown.child_token();
        self.inner.jobs.insert(
            id,
            Job {
                name: name.clone(),
                token: token.clone(),
            },
        );
        tracing::debug!(job = %name, %id, period_ms = period.as_millis(), "job scheduled");

        let first = Instant::now() + period;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            tracing::debug!(job = %name, %id, "job stopped");
        });
        id
    }

    /// Stop and forget a job. Returns `false` for an unknown id.
    pub fn remove(&self, id: JobId) -> bool {
        match self.inner.jobs.remove(&id) {
            Some((_, job)) => {
                job.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Names of the jobs currently scheduled.
    #[must_use]
    pub fn job_names(&self) -> Vec<String> {
        self.inner
            .jobs
            .iter()
            .map(|entry| entry.value().name.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.jobs.is_empty()
    }

    /// Stop every job, including jobs scheduled through other clones.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.jobs.clear();
    }
}
