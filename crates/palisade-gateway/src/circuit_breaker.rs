//! Per-route circuit breaker.
//!
//! Count-based sliding window. While closed, the outcome of the last
//! `sliding_window_size` calls is kept; once at least
//! `minimum_number_of_calls` are recorded and the failure percentage reaches
//! `failure_rate_threshold`, the breaker opens. After
//! `wait_duration_in_open_state` it admits `permitted_calls_in_half_open_state`
//! trial calls: one failure re-opens it, all successes close it.

use std::collections::VecDeque;

use palisade_config::CircuitBreakerSettings;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected.
    Open,
    /// A limited number of trial calls are admitted.
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed {
        window: VecDeque<bool>,
    },
    Open {
        until: Instant,
    },
    HalfOpen {
        period: u64,
        admitted: usize,
        succeeded: usize,
    },
}

impl Inner {
    fn closed() -> Self {
        Self::Closed {
            window: VecDeque::new(),
        }
    }
}

#[derive(Debug)]
struct Machine {
    state: Inner,
    half_open_periods: u64,
}

/// Circuit breaker guarding one route's backend.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: CircuitBreakerSettings,
    machine: Mutex<Machine>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        Self {
            settings,
            machine: Mutex::new(Machine {
                state: Inner::closed(),
                half_open_periods: 0,
            }),
        }
    }

    /// Breaker name.
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Breaker settings.
    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    /// Current state.
    ///
    /// An open breaker whose wait has elapsed still reports `Open` until the
    /// next [`try_acquire`](Self::try_acquire).
    pub fn state(&self) -> CircuitState {
        match self.machine.lock().state {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Asks permission to call the backend.
    ///
    /// Returns `None` while open, or while half-open with every trial slot
    /// taken.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut machine = self.machine.lock();
        let limit = self.settings.permitted_calls_in_half_open_state.max(1);
        let trial = match &mut machine.state {
            Inner::Closed { .. } => None,
            Inner::Open { until } => {
                if Instant::now() < *until {
                    return None;
                }
                machine.half_open_periods += 1;
                let period = machine.half_open_periods;
                info!(breaker = %self.settings.name, "Circuit half-open");
                machine.state = Inner::HalfOpen {
                    period,
                    admitted: 1,
                    succeeded: 0,
                };
                Some(period)
            }
            Inner::HalfOpen {
                period, admitted, ..
            } => {
                if *admitted >= limit {
                    return None;
                }
                *admitted += 1;
                Some(*period)
            }
        };
        Some(CallPermit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn record(&self, failed: bool, trial: Option<u64>) {
        let mut machine = self.machine.lock();
        let next = match &mut machine.state {
            Inner::Closed { window } => {
                window.push_back(failed);
                while window.len() > self.settings.sliding_window_size.max(1) {
                    window.pop_front();
                }
                if window.len() < self.settings.minimum_number_of_calls {
                    return;
                }
                let failures = window.iter().filter(|f| **f).count();
                if failures * 100 < usize::from(self.settings.failure_rate_threshold) * window.len()
                {
                    return;
                }
                warn!(
                    breaker = %self.settings.name,
                    failures,
                    calls = window.len(),
                    "Circuit opened"
                );
                self.open()
            }
            Inner::Open { .. } => return,
            Inner::HalfOpen {
                period, succeeded, ..
            } => {
                // Calls admitted outside this half-open period do not count.
                if trial != Some(*period) {
                    return;
                }
                if failed {
                    warn!(breaker = %self.settings.name, "Trial call failed, circuit re-opened");
                    self.open()
                } else {
                    *succeeded += 1;
                    if *succeeded < self.settings.permitted_calls_in_half_open_state.max(1) {
                        return;
                    }
                    info!(breaker = %self.settings.name, "Circuit closed");
                    Inner::closed()
                }
            }
        };
        machine.state = next;
    }

    fn release(&self, trial: u64) {
        let mut machine = self.machine.lock();
        if let Inner::HalfOpen {
            period, admitted, ..
        } = &mut machine.state
        {
            if *period == trial {
                *admitted = admitted.saturating_sub(1);
            }
        }
    }

    fn open(&self) -> Inner {
        Inner::Open {
            until: Instant::now() + self.settings.wait_duration_in_open_state,
        }
    }
}

/// Permission for one backend call, granted by [`CircuitBreaker::try_acquire`].
///
/// Settle it with [`success`](Self::success) or [`failure`](Self::failure).
/// Dropping it unsettled, e.g. when the caller goes away mid-call, records
/// nothing and hands a half-open trial slot back.
#[derive(Debug)]
#[must_use = "an unsettled permit records no outcome"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: Option<u64>,
    settled: bool,
}

impl CallPermit<'_> {
    /// True if this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial.is_some()
    }

    /// Records a successful call.
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(false, self.trial);
    }

    /// Records a failed call.
    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(true, self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(trial) = self.trial {
            self.breaker.release(trial);
        }
    }
}
