//! The scheduler engine (spec §4.4): maintains at most one pending timer
//! for the next due schedule. On fire it dispatches to the `Executor`,
//! then either advances (repeating) or deletes (one-shot) the schedule,
//! and re-arms.
//!
//! All state transitions — start, stop, re-arm, and fire — run under a
//! single `tokio::sync::Mutex`, so there is never more than one concurrent
//! fire and `Stop` only returns once an in-progress fire has finished.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::executor::Executor;
use crate::pattern::Pattern;
use crate::store::TaskStore;

/// Guard against firing a row whose `due` has not actually arrived when the
/// wake-up occurs (§4.4 onFire steps 1-2 both use this constant).
const DUE_TOLERANCE_MS: i64 = 250;

struct Inner {
    timer: Option<JoinHandle<()>>,
}

pub struct Engine {
    store: Arc<dyn TaskStore>,
    executor: Arc<Executor>,
    inner: Mutex<Inner>,
    running: AtomicBool,
    min_rearm_delay: StdDuration,
    max_rearm_delay: StdDuration,
}

impl Engine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        executor: Arc<Executor>,
        min_rearm_delay: StdDuration,
        max_rearm_delay: StdDuration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            executor,
            inner: Mutex::new(Inner { timer: None }),
            running: AtomicBool::new(false),
            min_rearm_delay,
            max_rearm_delay,
        })
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The `due` of the earliest schedule, or `None` if not running or
    /// nothing is scheduled.
    pub async fn next_due(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.running() {
            return Ok(None);
        }
        Ok(self.store.next_due().await?.map(|row| row.due))
    }

    /// Idempotent: starting an already-running engine is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("scheduler engine starting");
        let mut guard = self.inner.lock().await;
        self.rearm_locked(&mut guard).await;
    }

    /// Idempotent: stopping an already-stopped engine is a no-op. Waits for
    /// an in-progress fire to finish before returning, since `on_fire`
    /// holds the same lock this acquires.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut guard = self.inner.lock().await;
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        info!("scheduler engine stopped");
    }

    /// Cancels any pending timer and installs a new one for the earliest
    /// due schedule, if any. Called by the facade after any mutation that
    /// may change the next-due row, and by `on_fire` after each fire.
    pub async fn rearm(self: &Arc<Self>) {
        if !self.running() {
            return;
        }
        let mut guard = self.inner.lock().await;
        self.rearm_locked(&mut guard).await;
    }

    async fn rearm_locked(self: &Arc<Self>, guard: &mut Inner) {
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }

        let next = match self.store.next_due().await {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "rearm: failed to query next due schedule");
                return;
            }
        };
        let Some(next) = next else {
            return;
        };

        let now = Utc::now();
        let raw_delay = next.due - now;
        let clamped = raw_delay
            .max(Duration::from_std(self.min_rearm_delay).unwrap_or(Duration::zero()))
            .min(Duration::from_std(self.max_rearm_delay).unwrap_or(Duration::zero()));
        let delay = clamped.to_std().unwrap_or(self.min_rearm_delay);

        let expected_due = next.due;
        let engine = Arc::clone(self);
        guard.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.on_fire(expected_due).await;
        }));
    }

    /// Fires the engine: dispatches the due schedule to the executor, then
    /// advances or deletes it, and re-arms. Runs entirely under the
    /// engine's lock, so it never overlaps another fire or a facade
    /// mutation.
    async fn on_fire(self: &Arc<Self>, expected_due: DateTime<Utc>) {
        let mut guard = self.inner.lock().await;
        if !self.running() {
            return;
        }

        let tolerance = Duration::milliseconds(DUE_TOLERANCE_MS);
        if expected_due + tolerance > Utc::now() {
            // Long-sleep refresh: the clamp cut this wake-up short of the
            // real due time (spec's 45-day clamp). Re-arm and wait again.
            self.rearm_locked(&mut guard).await;
            return;
        }

        let next = match self.store.next_due().await {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "on_fire: failed to query next due schedule");
                self.rearm_locked(&mut guard).await;
                return;
            }
        };
        let Some(next) = next else {
            return;
        };
        if next.due + tolerance >= Utc::now() {
            // Earliest row isn't actually due yet (e.g. it was replaced).
            self.rearm_locked(&mut guard).await;
            return;
        }

        if let Err(e) = self.executor.execute(&next.task_id).await {
            warn!(task_id = %next.task_id, error = %e, "scheduled execution failed; schedule still advances");
        }

        let advance_result = match &next.repeats {
            Some(pattern_text) => match Pattern::from_str(pattern_text) {
                Ok(pattern) => {
                    let new_due = pattern.next(Utc::now());
                    self.store.advance_schedule(next.schedule_id, new_due).await
                }
                Err(e) => {
                    error!(
                        schedule_id = next.schedule_id,
                        error = %e,
                        "stored repeat pattern failed to parse; deleting schedule"
                    );
                    self.store.delete_schedule(next.schedule_id).await
                }
            },
            None => self.store.delete_schedule(next.schedule_id).await,
        };
        if let Err(e) = advance_result {
            error!(schedule_id = next.schedule_id, error = %e, "failed to advance/delete schedule after fire");
        }

        self.rearm_locked(&mut guard).await;
    }
}
