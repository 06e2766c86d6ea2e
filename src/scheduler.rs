use embassy_sync::blocking_mutex::raw::RawMutex;
use log::*;

use crate::bluetooth::Notifier;
use crate::config::SchedulerConfig;
use crate::errors::NotifyError;
use crate::led::{Feedback, SharedFeedback};
use crate::payload::Payload;
use crate::state::SharedState;

const MICROS_PER_MILLI: u64 = 1_000;

#[allow(async_fn_in_trait)]
pub trait Timebase {
    /// Non-decreasing microseconds since boot.
    fn now_us(&self) -> u64;

    /// Returns once `now_us() >= deadline_us`, immediately if already past.
    async fn wait_until(&mut self, deadline_us: u64);

    async fn delay_ms(&mut self, ms: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A gate was closed; nothing was touched.
    Skipped,
    Sent { sequence: u32 },
    Failed { sequence: u32 },
}

pub struct NotificationScheduler<'a, M, F, N, T>
where
    M: RawMutex,
    F: Feedback,
    N: Notifier,
    T: Timebase,
{
    shared: &'a SharedState<M>,
    feedback: &'a SharedFeedback<M, F>,
    notifier: N,
    timebase: T,
    period_us: u64,
    pulse_ms: u64,
    sequence: u32,
    next_deadline: Option<u64>,
}

impl<'a, M, F, N, T> NotificationScheduler<'a, M, F, N, T>
where
    M: RawMutex,
    F: Feedback,
    N: Notifier,
    T: Timebase,
{
    pub fn new(
        config: SchedulerConfig,
        shared: &'a SharedState<M>,
        feedback: &'a SharedFeedback<M, F>,
        notifier: N,
        timebase: T,
    ) -> Self {
        Self {
            shared,
            feedback,
            notifier,
            timebase,
            period_us: config.period_ms.saturating_mul(MICROS_PER_MILLI),
            pulse_ms: config.pulse_ms,
            sequence: 0,
            next_deadline: None,
        }
    }

    /// Sequence number the next attempted notification will carry.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.next_deadline
    }

    pub fn timebase(&self) -> &T {
        &self.timebase
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn run(&mut self) -> ! {
        info!(
            "[Scheduler] Notify task start. Period={} ms, LED pulse={} ms",
            self.period_us / MICROS_PER_MILLI,
            self.pulse_ms
        );
        loop {
            self.wait_next_tick().await;
            self.tick().await;
        }
    }

    /// Sleeps until the next absolute deadline and advances it by one period.
    pub async fn wait_next_tick(&mut self) {
        let deadline = match self.next_deadline {
            Some(previous) => previous.wrapping_add(self.period_us),
            None => self.timebase.now_us().wrapping_add(self.period_us),
        };
        self.next_deadline = Some(deadline);
        self.timebase.wait_until(deadline).await;
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let Some(target) = self.shared.notify_target() else {
            trace!("[Scheduler] Not subscribed, skipping tick");
            return TickOutcome::Skipped;
        };

        let sequence = self.sequence;
        let value = Payload::new(sequence, self.timebase.now_us()).encode();
        self.shared.store_value(value);

        let result = self
            .notifier
            .notify(target, &value)
            .await
            .map_err(NotifyError::Transport);

        let outcome = match result {
            Ok(()) => {
                debug!("[Scheduler] Sent seq={}", sequence);
                self.pulse().await;
                TickOutcome::Sent { sequence }
            }
            Err(e) => {
                error!("[Scheduler] Send notify failed (seq={}): {}", sequence, e);
                TickOutcome::Failed { sequence }
            }
        };

        // Counts attempts, not successes
        self.sequence = self.sequence.wrapping_add(1);
        outcome
    }

    async fn pulse(&mut self) {
        self.feedback.set_active();
        self.timebase.delay_ms(self.pulse_ms).await;
        self.feedback.set_idle();
    }
}
