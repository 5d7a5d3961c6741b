//! Tri-state circuit breaker guarding the reasoning collaborator.
//! Process-wide state lives behind one mutex; the clock is injected so
//! tests can drive cooldown expiry without sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use lineage_core::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

pub trait Clock: Send + Sync {
    /// Monotonic time since an arbitrary origin.
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Settable clock for deterministic breaker tests.
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Duration>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Whether a call may proceed. While open, the cooldown is checked
    /// here: once elapsed, the breaker moves to half-open and admits
    /// exactly one probe; further callers are rejected until the probe
    /// reports back.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        self.advance_state(&mut inner);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            tracing::info!("reasoning circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.probe_in_flight = false;
        match inner.state {
            // one half-open failure reopens immediately
            CircuitState::HalfOpen => self.open(&mut inner),
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut inner);
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.advance_state(&mut inner);
        inner.state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn open(&self, inner: &mut Inner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(self.clock.now());
        tracing::warn!(
            failures = inner.consecutive_failures,
            cooldown_secs = self.config.cooldown_secs,
            "reasoning circuit opened"
        );
    }

    fn advance_state(&self, inner: &mut Inner) {
        if inner.state != CircuitState::Open {
            return;
        }
        let Some(opened_at) = inner.opened_at else { return };
        if self.clock.now() - opened_at >= Duration::from_secs(self.config.cooldown_secs) {
            inner.state = CircuitState::HalfOpen;
            inner.probe_in_flight = false;
            tracing::info!("reasoning circuit half-open after cooldown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> (Arc<ManualClock>, CircuitBreaker) {
        let clock = Arc::new(ManualClock::default());
        let config = BreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 30,
        };
        let breaker = CircuitBreaker::new(config, clock.clone());
        (clock, breaker)
    }

    #[test]
    fn opens_after_exactly_threshold_consecutive_failures() {
        let (_, breaker) = breaker();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn success_resets_the_consecutive_count() {
        let (_, breaker) = breaker();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn cooldown_admits_exactly_one_probe() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(!breaker.try_acquire());

        clock.advance(Duration::from_secs(29));
        assert!(!breaker.try_acquire());

        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire());
        // the probe is in flight; nobody else gets through
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn probe_success_closes_and_resets() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn probe_failure_reopens_immediately() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
        // the reopened window starts fresh
        clock.advance(Duration::from_secs(30));
        assert!(breaker.try_acquire());
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let (_, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());
    }
}
