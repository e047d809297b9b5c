use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::machine::{StartOutcome, TimerEvent, TimerMachine, TimerSnapshot};
use super::TimerError;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Receives tick and expiry notifications. Called while the timer lock is held,
/// so implementations must not block.
pub trait TimerObserver: Send + Sync {
    fn notify(&self, event: TimerEvent);
}

impl TimerObserver for UnboundedSender<TimerEvent> {
    fn notify(&self, event: TimerEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Timer event dropped, receiver closed");
        }
    }
}

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Read-only handle on the countdown. Never waits on whoever owns the controller.
#[derive(Clone)]
pub struct TimerWatch {
    machine: Arc<Mutex<TimerMachine>>,
}

impl TimerWatch {
    pub fn snapshot(&self) -> TimerSnapshot {
        lock(&self.machine).snapshot()
    }
}

pub struct TimerController {
    machine: Arc<Mutex<TimerMachine>>,
    observer: Arc<dyn TimerObserver>,
    period: Duration,
    ticker: Option<Ticker>,
}

impl TimerController {
    pub fn new(observer: Arc<dyn TimerObserver>) -> Self {
        Self::with_period(observer, TICK_PERIOD)
    }

    pub fn with_period(observer: Arc<dyn TimerObserver>, period: Duration) -> Self {
        Self {
            machine: Arc::new(Mutex::new(TimerMachine::new())),
            observer,
            period,
            ticker: None,
        }
    }

    /// (Re)initializes the countdown for a question and recreates the ticker.
    pub fn start(
        &mut self,
        question_id: &str,
        time_limit: u32,
        initial_elapsed: u32,
        active: bool,
    ) -> Result<StartOutcome, TimerError> {
        self.teardown();
        let outcome = lock(&self.machine).start(question_id, time_limit, initial_elapsed, active)?;
        tracing::debug!(
            question_id,
            time_limit,
            initial_elapsed,
            active,
            ?outcome,
            "Timer started"
        );
        if active {
            self.activate();
        }
        Ok(outcome)
    }

    /// Pauses or resumes ticking. `elapsed` and the expiry latch are kept.
    pub fn set_active(&mut self, active: bool) {
        if !active {
            self.teardown();
            lock(&self.machine).set_active(false);
            return;
        }
        if self.is_ticking() {
            return;
        }
        self.teardown();
        lock(&self.machine).set_active(true);
        self.activate();
    }

    /// Cancels the ticker. No notification is delivered once this returns.
    pub fn stop(&mut self) {
        self.teardown();
        lock(&self.machine).set_active(false);
    }

    /// Stops and forgets the tracked question.
    pub fn reset(&mut self) {
        self.teardown();
        lock(&self.machine).reset();
    }

    /// Lets a question whose expiry could not be handled expire again on the
    /// next tick. Returns `false` when nothing had expired.
    pub fn rearm_expiry(&mut self) -> bool {
        self.teardown();
        {
            let mut machine = lock(&self.machine);
            if !machine.rearm_expiry() {
                return false;
            }
            machine.set_active(true);
        }
        self.ticker = Some(self.spawn_ticker());
        true
    }

    pub fn watch(&self) -> TimerWatch {
        TimerWatch {
            machine: Arc::clone(&self.machine),
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    pub fn elapsed(&self) -> u32 {
        lock(&self.machine).elapsed()
    }

    pub fn epoch(&self) -> u64 {
        lock(&self.machine).epoch()
    }

    pub fn question_id(&self) -> Option<String> {
        lock(&self.machine).question_id().map(str::to_string)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        lock(&self.machine).snapshot()
    }

    fn activate(&mut self) {
        {
            let mut machine = lock(&self.machine);
            if let Some(event) = machine.poll_expiry() {
                tracing::info!(question_id = event.question_id(), "Timer already past its limit");
                self.observer.notify(event);
                return;
            }
            if !machine.should_tick() {
                return;
            }
        }
        self.ticker = Some(self.spawn_ticker());
    }

    fn spawn_ticker(&self) -> Ticker {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let machine = Arc::clone(&self.machine);
        let observer = Arc::clone(&self.observer);
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !step(&machine, observer.as_ref(), &token) {
                            break;
                        }
                    }
                }
            }
        });

        Ticker { cancel, handle }
    }

    fn teardown(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel.cancel();
            // A tick that grabbed the lock before the cancel finishes notifying here.
            drop(lock(&self.machine));
            ticker.handle.abort();
        }
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }
}

/// One tick under the lock. Returns whether the ticker should keep running.
fn step(machine: &Mutex<TimerMachine>, observer: &dyn TimerObserver, token: &CancellationToken) -> bool {
    let mut machine = lock(machine);
    if token.is_cancelled() {
        return false;
    }
    for event in machine.tick() {
        observer.notify(event);
    }
    machine.should_tick()
}

fn lock(machine: &Mutex<TimerMachine>) -> MutexGuard<'_, TimerMachine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}
