use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// Runtime circuit state for upstream rate fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
///
/// Rates are percentages over a sliding window of the most recent call
/// outcomes. A call is "slow" when it takes longer than
/// `slow_call_duration`; slow calls count toward opening the circuit even
/// when they succeed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    pub window_size: usize,
    /// Observations required before the rates are evaluated at all.
    pub min_calls: usize,
    pub failure_rate_threshold: f64,
    pub slow_call_rate_threshold: f64,
    pub slow_call_duration: Duration,
    /// How long the circuit stays open before admitting trial calls.
    pub open_wait: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_permits: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            min_calls: 50,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 50.0,
            slow_call_duration: Duration::from_secs(2),
            open_wait: Duration::from_secs(30),
            half_open_permits: 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CallOutcome {
    failed: bool,
    slow: bool,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    window: VecDeque<CallOutcome>,
    opened_at: Option<Instant>,
    half_open_issued: u32,
    half_open_successes: u32,
}

impl CircuitInner {
    fn transition(&mut self, to: CircuitState) {
        if self.state != to {
            warn!(from = ?self.state, to = ?to, "circuit breaker state transition");
            self.state = to;
        }
    }
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            half_open_issued: 0,
            half_open_successes: 0,
        }
    }
}

/// Thread-safe circuit breaker for upstream network requests.
///
/// Only the breaker's own bookkeeping is serialized; concurrent upstream
/// calls proceed in parallel, bounded solely by the half-open permit count.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    /// Whether a call may go upstream right now. While open this is false
    /// until `open_wait` has elapsed; the first allowed call after that
    /// moves the circuit to half-open and consumes one trial permit.
    pub fn allow_request(&self) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let can_probe = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= self.config.open_wait)
                    .unwrap_or(false);

                if can_probe {
                    inner.transition(CircuitState::HalfOpen);
                    inner.opened_at = None;
                    inner.half_open_issued = 1;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_issued < self.config.half_open_permits {
                    inner.half_open_issued += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, duration: Duration) {
        self.record(false, duration);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.record(true, duration);
    }

    fn record(&self, failed: bool, duration: Duration) {
        let slow = duration > self.config.slow_call_duration;
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(CallOutcome { failed, slow });
                while inner.window.len() > self.config.window_size {
                    inner.window.pop_front();
                }
                if self.rates_exceeded(&inner.window) {
                    inner.transition(CircuitState::Open);
                    inner.opened_at = Some(Instant::now());
                    inner.window.clear();
                }
            }
            CircuitState::HalfOpen => {
                // A slow trial call counts against recovery.
                if failed || slow {
                    inner.transition(CircuitState::Open);
                    inner.opened_at = Some(Instant::now());
                    inner.half_open_issued = 0;
                    inner.half_open_successes = 0;
                } else {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.half_open_permits {
                        inner.transition(CircuitState::Closed);
                        inner.window.clear();
                        inner.half_open_issued = 0;
                        inner.half_open_successes = 0;
                    }
                }
            }
            // Outcome of a call that was already in flight when the circuit
            // opened; the window restarts fresh on the next transition.
            CircuitState::Open => {}
        }
    }

    fn rates_exceeded(&self, window: &VecDeque<CallOutcome>) -> bool {
        if window.len() < self.config.min_calls.max(1) {
            return false;
        }

        let total = window.len() as f64;
        let failed = window.iter().filter(|o| o.failed).count() as f64;
        let slow = window.iter().filter(|o| o.slow).count() as f64;

        failed * 100.0 / total >= self.config.failure_rate_threshold
            || slow * 100.0 / total >= self.config.slow_call_rate_threshold
    }

    pub fn state(&self) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state
    }

    pub fn observed_calls(&self) -> usize {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.window.len()
    }
}
