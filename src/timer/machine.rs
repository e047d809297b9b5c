use serde::Serialize;

use super::TimerError;

/// Something observers must hear about. `epoch` identifies the question instance
/// that produced the event, so a late event can be told apart from a live one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick {
        epoch: u64,
        question_id: String,
        elapsed: u32,
    },
    Expired {
        epoch: u64,
        question_id: String,
        elapsed: u32,
    },
}

impl TimerEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            TimerEvent::Tick { epoch, .. } | TimerEvent::Expired { epoch, .. } => *epoch,
        }
    }

    pub fn question_id(&self) -> &str {
        match self {
            TimerEvent::Tick { question_id, .. } | TimerEvent::Expired { question_id, .. } => {
                question_id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A different question: elapsed reset and expiry latch cleared.
    NewQuestion,
    /// Same question, elapsed moved to the supplied value.
    Resynced,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub question_id: Option<String>,
    pub time_limit: u32,
    pub elapsed: u32,
    pub remaining: u32,
    pub active: bool,
    pub expired: bool,
}

#[derive(Debug, Default)]
pub struct TimerMachine {
    question_id: Option<String>,
    time_limit: u32,
    elapsed: u32,
    active: bool,
    expired: bool,
    epoch: u64,
}

impl TimerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        question_id: &str,
        time_limit: u32,
        initial_elapsed: u32,
        active: bool,
    ) -> Result<StartOutcome, TimerError> {
        if time_limit == 0 {
            return Err(TimerError::InvalidTimeLimit(question_id.to_string()));
        }

        let outcome = if self.question_id.as_deref() != Some(question_id) {
            self.question_id = Some(question_id.to_string());
            self.elapsed = initial_elapsed;
            self.expired = false;
            self.epoch += 1;
            StartOutcome::NewQuestion
        } else if self.elapsed != initial_elapsed {
            self.elapsed = initial_elapsed;
            StartOutcome::Resynced
        } else {
            StartOutcome::Unchanged
        };

        self.time_limit = time_limit;
        self.active = active;
        Ok(outcome)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active && self.question_id.is_some();
    }

    /// Fires expiry without a tick when elapsed already reached the limit,
    /// e.g. after restoring a question whose time ran out while the process was down.
    pub fn poll_expiry(&mut self) -> Option<TimerEvent> {
        if !self.active || self.expired || self.elapsed < self.time_limit {
            return None;
        }
        let question_id = self.question_id.clone()?;
        self.expired = true;
        Some(TimerEvent::Expired {
            epoch: self.epoch,
            question_id,
            elapsed: self.elapsed,
        })
    }

    /// Advances one second. Nothing happens while paused or once expired.
    /// At the limit elapsed stays put and only expiry can fire.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.should_tick() {
            return Vec::new();
        }
        let Some(question_id) = self.question_id.clone() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if self.elapsed < self.time_limit {
            self.elapsed += 1;
            events.push(TimerEvent::Tick {
                epoch: self.epoch,
                question_id,
                elapsed: self.elapsed,
            });
        }
        events.extend(self.poll_expiry());
        events
    }

    /// Clears the expiry latch of the tracked question without starting a new
    /// epoch, so the next tick or activation fires expiry again.
    pub fn rearm_expiry(&mut self) -> bool {
        if self.question_id.is_none() || !self.expired {
            return false;
        }
        self.expired = false;
        true
    }

    pub fn should_tick(&self) -> bool {
        self.active && !self.expired && self.question_id.is_some()
    }

    /// Forgets the tracked question, so the next `start` is always a new question.
    pub fn reset(&mut self) {
        let epoch = self.epoch + 1;
        *self = Self {
            epoch,
            ..Self::default()
        };
    }

    pub fn question_id(&self) -> Option<&str> {
        self.question_id.as_deref()
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            question_id: self.question_id.clone(),
            time_limit: self.time_limit,
            elapsed: self.elapsed,
            remaining: self.time_limit.saturating_sub(self.elapsed),
            active: self.active,
            expired: self.expired,
        }
    }
}
