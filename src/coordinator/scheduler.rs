// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interval polling with debounced manual refreshes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Runs a job on an interval and on request.
///
/// - The first run happens immediately after [`spawn`](Self::spawn).
/// - Interval ticks that fall while a run is in progress are skipped. The
///   next run happens on the following tick of the original schedule, so a
///   run that outlasts the interval does not shift later runs.
/// - A requested refresh runs immediately if no run started within the
///   cooldown. Otherwise one pending refresh is kept and served when the
///   cooldown expires or at the next interval tick, whichever is first.
///   Further requests while one is pending are absorbed by it.
#[derive(Debug)]
pub struct Scheduler;

impl Scheduler {
    /// Spawns the scheduling loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use eyeonwater::coordinator::Scheduler;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let handle = Scheduler::spawn(Duration::from_secs(3600), Duration::from_secs(1800), || async {
    ///     // refresh
    /// });
    /// handle.request_refresh();
    /// handle.shutdown();
    /// # }
    /// ```
    pub fn spawn<F, Fut>(interval: Duration, cooldown: Duration, job: F) -> SchedulerHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        assert!(!interval.is_zero(), "scheduler interval must be non-zero");

        let requests = Arc::new(Notify::new());
        let task = tokio::spawn(run(interval, cooldown, job, Arc::clone(&requests)));

        SchedulerHandle { requests, task }
    }
}

/// Handle to a running [`Scheduler`] loop.
///
/// Dropping the handle stops the loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    requests: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Asks for a refresh, subject to the cooldown.
    pub fn request_refresh(&self) {
        self.requests.notify_one();
    }

    /// Stops the loop. A run in progress is abandoned.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Returns `true` once the loop has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F, Fut>(interval: Duration, cooldown: Duration, job: F, requests: Arc<Notify>)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_run: Option<Instant> = None;
    let mut last_end: Option<Instant> = None;
    let mut pending = false;

    loop {
        let deadline = last_run
            .filter(|_| pending)
            .map(|started| started + cooldown);

        tokio::select! {
            scheduled = ticker.tick() => {
                if last_end.is_some_and(|ended| scheduled < ended) {
                    tracing::debug!("Skipping tick missed during a running refresh");
                    continue;
                }
                tracing::trace!("Scheduled refresh");
            }
            () = requests.notified() => {
                if last_run.is_some_and(|started| started.elapsed() < cooldown) {
                    tracing::debug!("Refresh requested during cooldown, deferring");
                    pending = true;
                    continue;
                }
                tracing::debug!("Requested refresh");
            }
            () = sleep_until(deadline) => {
                tracing::debug!("Running deferred refresh");
            }
        }

        pending = false;
        last_run = Some(Instant::now());
        job().await;
        last_end = Some(Instant::now());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    const INTERVAL: Duration = Duration::from_secs(3600);
    const COOLDOWN: Duration = Duration::from_secs(1800);

    fn counting(runs: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send + 'static {
        let runs = Arc::clone(runs);
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    /// Lets the scheduler task react, advancing paused time by 1 ms.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn advance(by: Duration) {
        tokio::time::sleep(by).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_is_immediate_then_on_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = Scheduler::spawn(INTERVAL, COOLDOWN, counting(&runs));

        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        advance(INTERVAL).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        advance(INTERVAL).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn request_after_cooldown_runs_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::spawn(INTERVAL, COOLDOWN, counting(&runs));
        settle().await;

        advance(COOLDOWN + Duration::from_secs(1)).await;
        handle.request_refresh();
        settle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_during_cooldown_collapses_into_one_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::spawn(INTERVAL, COOLDOWN, counting(&runs));
        settle().await;

        for _ in 0..5 {
            handle.request_refresh();
            settle().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        advance(COOLDOWN).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Nothing left pending until the next tick
        advance(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_tick_serves_pending_request() {
        let runs = Arc::new(AtomicUsize::new(0));
        let interval = Duration::from_secs(600);
        let handle = Scheduler::spawn(interval, COOLDOWN, counting(&runs));
        settle().await;

        handle.request_refresh();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        advance(interval).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // The deferred run was consumed by the tick; only ticks remain.
        advance(interval).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::spawn(INTERVAL, COOLDOWN, counting(&runs));
        settle().await;

        handle.shutdown();
        settle().await;
        assert!(handle.is_finished());

        advance(INTERVAL * 3).await;
        handle.request_refresh();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_longer_than_interval_skips_the_missed_tick() {
        let origin = Instant::now();
        let starts = Arc::new(Mutex::new(Vec::new()));
        let interval = Duration::from_secs(600);
        let job = {
            let starts = Arc::clone(&starts);
            move || {
                let starts = Arc::clone(&starts);
                async move {
                    starts.lock().push(origin.elapsed().as_secs());
                    tokio::time::sleep(Duration::from_secs(700)).await;
                }
            }
        };
        let _handle = Scheduler::spawn(interval, COOLDOWN, job);

        advance(Duration::from_secs(1100)).await;
        assert_eq!(*starts.lock(), vec![0]);

        advance(Duration::from_secs(200)).await;
        assert_eq!(*starts.lock(), vec![0, 1200]);
    }

    #[tokio::test]
    #[should_panic(expected = "scheduler interval must be non-zero")]
    async fn zero_interval_is_rejected_at_spawn() {
        let runs = Arc::new(AtomicUsize::new(0));
        let _handle = Scheduler::spawn(Duration::ZERO, COOLDOWN, counting(&runs));
    }
}
