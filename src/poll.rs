use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Active,
    Paused,
}

/// Visibility-aware refresh schedule. The periodic timer is the owned
/// `deadline`; dropping it cancels the schedule.
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    state: PollState,
    deadline: Option<Instant>,
}

impl Poller {
    /// Starts Active. The caller fetches once right away; the first periodic
    /// fetch is due one interval later.
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            state: PollState::Active,
            deadline: Some(now + interval),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Returns true when the caller should fetch immediately.
    pub fn set_visible(&mut self, visible: bool, now: Instant) -> bool {
        match (self.state, visible) {
            (PollState::Active, false) => {
                self.state = PollState::Paused;
                self.deadline = None;
                false
            }
            (PollState::Paused, true) => {
                self.state = PollState::Active;
                self.deadline = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Returns true when a periodic fetch is due and re-arms the timer.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}
