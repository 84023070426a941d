//! Worker notification loop.
//!
//! Runs the hybrid push/poll consumption strategy: push modes react to
//! insert events and keep a heartbeat drain as a backstop for missed
//! notifications; poll mode backs off adaptively while the queue stays
//! empty and tightens again the moment work appears.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use facture_core::{defaults, JobEventSource};

use crate::executor::JobExecutor;
use crate::mode::ProcessingMode;

/// Adaptive poll pacing. Pure state, separate from the loop for testing.
#[derive(Debug)]
pub struct PollState {
    base: Duration,
    multiplier: f64,
    empty_streak: u32,
}

impl PollState {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            multiplier: 1.0,
            empty_streak: 0,
        }
    }

    /// Interval to sleep before the next poll.
    pub fn interval(&self) -> Duration {
        self.base.mul_f64(self.multiplier)
    }

    /// Record an empty poll. Every sixth consecutive empty poll widens the
    /// interval by 1.5x, capped at four times the base.
    pub fn on_empty(&mut self) {
        self.empty_streak += 1;
        if self.empty_streak >= defaults::EMPTY_POLL_STREAK {
            self.empty_streak = 0;
            self.multiplier =
                (self.multiplier * defaults::POLL_BACKOFF_FACTOR).min(defaults::POLL_MAX_MULTIPLIER);
        }
    }

    /// Record a poll that found work: pacing resets and the next recheck
    /// comes quickly in case more invoices are arriving.
    pub fn on_busy(&mut self) -> Duration {
        self.multiplier = 1.0;
        self.empty_streak = 0;
        Duration::from_millis(defaults::BUSY_RECHECK_DELAY_MS)
    }

    /// Sleep to insert before the next drain, given how many invoices the
    /// last drain processed. A busy drain gets the short recheck delay;
    /// an empty one sleeps the (possibly widened) interval.
    pub fn next_delay(&mut self, processed: usize) -> Duration {
        if processed > 0 {
            self.on_busy()
        } else {
            self.on_empty();
            self.interval()
        }
    }
}

/// The worker's top-level loop over one executor and an optional push
/// event source.
pub struct NotifyLoop {
    executor: Arc<JobExecutor>,
    event_source: Option<Arc<dyn JobEventSource>>,
    mode: ProcessingMode,
    poll_interval: Duration,
}

impl NotifyLoop {
    pub fn new(
        executor: Arc<JobExecutor>,
        event_source: Option<Arc<dyn JobEventSource>>,
        mode: ProcessingMode,
        poll_interval: Duration,
    ) -> Self {
        Self {
            executor,
            event_source,
            mode,
            poll_interval,
        }
    }

    /// Run until ctrl-c.
    ///
    /// Starts with a full queue drain so invoices uploaded while the worker
    /// was down are picked up before any event arrives.
    pub async fn run(mut self) {
        let processed = self.executor.drain().await;
        info!(
            subsystem = "worker",
            component = "loop",
            mode = %self.mode,
            processed,
            "Startup sweep complete"
        );

        if self.mode.is_push() && self.event_source.is_none() {
            warn!(
                subsystem = "worker",
                component = "loop",
                mode = %self.mode,
                "Push mode requested but no event source available; downgrading"
            );
            self.mode = self.mode.downgrade();
        }

        match self.mode {
            ProcessingMode::Poll => self.run_poll().await,
            ProcessingMode::PushRealtime | ProcessingMode::PushListen => self.run_push().await,
        }

        info!(
            subsystem = "worker",
            component = "loop",
            "Worker stopped"
        );
    }

    async fn run_poll(&self) {
        let mut state = PollState::new(self.poll_interval);
        info!(
            subsystem = "worker",
            component = "loop",
            interval_secs = self.poll_interval.as_secs(),
            "Polling for pending invoices"
        );

        // Drain first, then sleep exactly one delay: a busy cycle is
        // re-checked 500ms later, not a full interval later.
        loop {
            let processed = self.executor.drain().await;
            let delay = state.next_delay(processed);

            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = sleep(delay) => {}
            }
        }
    }

    async fn run_push(&self) {
        // Checked in run(); poll mode never reaches here.
        let Some(source) = self.event_source.as_ref() else {
            return;
        };

        loop {
            let mut subscription = match source.subscribe().await {
                Ok(subscription) => subscription,
                Err(e) => {
                    warn!(
                        subsystem = "worker",
                        component = "loop",
                        mode = %self.mode,
                        error = %e,
                        "Subscription failed; downgrading to poll mode"
                    );
                    return self.run_poll().await;
                }
            };

            info!(
                subsystem = "worker",
                component = "loop",
                mode = %self.mode,
                "Subscribed to invoice events"
            );

            // Sweep anything that arrived while no subscription was held.
            self.executor.drain().await;

            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut idle_ticks = 0u32;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => return,
                    event = subscription.next() => {
                        match event {
                            Some(event) if event.is_new_pending() => {
                                idle_ticks = 0;
                                self.executor.drain().await;
                            }
                            Some(_) => {}
                            None => {
                                // Subscription lost; cool down, then
                                // resubscribe from the outer loop.
                                warn!(
                                    subsystem = "worker",
                                    component = "loop",
                                    mode = %self.mode,
                                    cooldown_secs = defaults::RECONNECT_COOLDOWN_SECS,
                                    "Event subscription lost; reconnecting"
                                );
                                break;
                            }
                        }
                    }
                    _ = tick.tick() => {
                        idle_ticks += 1;
                        // Heartbeat drain: notifications can be missed, the
                        // queue is the source of truth.
                        if idle_ticks >= defaults::HEARTBEAT_IDLE_TICKS {
                            idle_ticks = 0;
                            self.executor.drain().await;
                        }
                    }
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => return,
                _ = sleep(Duration::from_secs(defaults::RECONNECT_COOLDOWN_SECS)) => {}
            }
        }
    }
}
