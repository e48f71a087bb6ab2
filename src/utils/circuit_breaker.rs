use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards calls to the external event bus. After `failure_threshold`
// consecutive failures the circuit opens and calls fail fast for
// `open_for`; the first call after that is a trial (half-open). Only one
// trial is in flight at a time and other callers fail fast meanwhile. A
// trial that never reports back is replaced after another `open_for`.
// Successful trials close the circuit again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { successes: u32, trial: Option<Instant> },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    Open,

    #[error("{0}")]
    Inner(E),
}

pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    // Never held across an await.
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state()
    }

    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(CircuitBreakerError::Open);
        }

        match operation.await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Phase> {
        // A poisoned lock still holds a valid phase.
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit(&self) -> bool {
        let mut phase = self.lock();
        match *phase {
            Phase::Closed { .. } => true,
            Phase::Open { since } if since.elapsed() < self.config.open_for => false,
            Phase::Open { .. } => {
                tracing::info!(breaker = self.name, "Circuit breaker half-open, sending trial call");
                *phase = Phase::HalfOpen { successes: 0, trial: Some(Instant::now()) };
                true
            }
            Phase::HalfOpen { trial: Some(started), .. } if started.elapsed() < self.config.open_for => false,
            Phase::HalfOpen { successes, .. } => {
                *phase = Phase::HalfOpen { successes, trial: Some(Instant::now()) };
                true
            }
        }
    }

    fn on_success(&self) {
        let mut phase = self.lock();
        match *phase {
            Phase::HalfOpen { successes, .. } if successes + 1 >= self.config.success_threshold => {
                tracing::info!(breaker = self.name, "Circuit breaker closed");
                *phase = Phase::Closed { failures: 0 };
            }
            Phase::HalfOpen { successes, .. } => {
                *phase = Phase::HalfOpen { successes: successes + 1, trial: None };
            }
            Phase::Closed { .. } => *phase = Phase::Closed { failures: 0 },
            Phase::Open { .. } => {}
        }
    }

    fn on_failure(&self) {
        let mut phase = self.lock();
        match *phase {
            Phase::Closed { failures } if failures + 1 >= self.config.failure_threshold => {
                tracing::warn!(breaker = self.name, failures = failures + 1, "Circuit breaker opened");
                *phase = Phase::Open { since: Instant::now() };
            }
            Phase::Closed { failures } => *phase = Phase::Closed { failures: failures + 1 },
            Phase::HalfOpen { .. } => {
                tracing::warn!(breaker = self.name, "Trial call failed, circuit breaker reopened");
                *phase = Phase::Open { since: Instant::now() };
            }
            Phase::Open { .. } => {}
        }
    }
}
