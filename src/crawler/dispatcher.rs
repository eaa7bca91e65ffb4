//! Dispatcher that bounds how many crawl tasks run at once
//!
//! Admission goes through a fair `tokio` semaphore, so permits are handed out
//! in request order. The number of permits (the *window*) follows a resource
//! signal:
//! - pressure above `pressure_threshold` halves the window, never below the
//!   floor
//! - pressure below `recover_threshold` grows it by one, never above the
//!   ceiling
//!
//! Shrinking never cancels running work. Permits that cannot be taken back
//! immediately are recorded as shrink debt and forgotten as tasks return them.

use super::gauge::PressureGauge;
use crate::config::CrawlerConfig;
use crate::DocsError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Window bounds and control thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    pub floor: usize,
    pub ceiling: usize,
    pub pressure_threshold: f64,
    pub recover_threshold: f64,
    pub sample_interval: Duration,
}

impl From<&CrawlerConfig> for DispatcherConfig {
    fn from(config: &CrawlerConfig) -> Self {
        let floor = config.concurrency_floor.max(1) as usize;
        Self {
            floor,
            ceiling: (config.concurrency_ceiling as usize).max(floor),
            pressure_threshold: config.pressure_threshold,
            recover_threshold: config.recover_threshold,
            sample_interval: Duration::from_millis(config.sample_interval_ms.max(1)),
        }
    }
}

/// Snapshot of the dispatcher's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudget {
    /// Current concurrency window
    pub window: usize,
    /// Permits currently held by running tasks
    pub in_flight: usize,
    pub floor: usize,
    pub ceiling: usize,
}

#[derive(Debug)]
struct WindowState {
    window: usize,
    in_flight: usize,
    /// Permits to forget when they come back
    shrink_debt: usize,
}

struct Inner {
    config: DispatcherConfig,
    semaphore: Arc<Semaphore>,
    gauge: Arc<dyn PressureGauge>,
    state: Mutex<WindowState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resource-adaptive admission control
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

/// Permission for one task to run
///
/// Dropping the permit releases it.
pub struct Permit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        let mut state = self.inner.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.shrink_debt > 0 {
            state.shrink_debt -= 1;
            permit.forget();
        }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher whose window starts at the ceiling
    pub fn new(config: DispatcherConfig, gauge: Arc<dyn PressureGauge>) -> Self {
        let window = config.ceiling;
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(window)),
                gauge,
                state: Mutex::new(WindowState {
                    window,
                    in_flight: 0,
                    shrink_debt: 0,
                }),
                config,
            }),
        }
    }

    /// Waits for a free slot in the window
    ///
    /// Fails once the dispatcher has been closed.
    pub async fn admit(&self) -> Result<Permit, DocsError> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DocsError::DispatcherClosed)?;
        Ok(self.wrap(permit))
    }

    /// Takes a slot only if one is free right now
    pub fn try_admit(&self) -> Option<Permit> {
        let permit = self.inner.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.wrap(permit))
    }

    fn wrap(&self, permit: OwnedSemaphorePermit) -> Permit {
        self.inner.state().in_flight += 1;
        Permit {
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns a slot; the same as dropping the permit
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    /// Applies one pressure reading and returns the resulting window
    pub fn adjust(&self, pressure: f64) -> usize {
        let config = &self.inner.config;
        let semaphore = &self.inner.semaphore;
        let mut state = self.inner.state();

        if pressure > config.pressure_threshold {
            let target = (state.window / 2).max(config.floor);
            if target < state.window {
                let reduce = state.window - target;
                state.window = target;

                let free = semaphore.available_permits().min(reduce);
                let mut reclaimed = 0;
                if free > 0 {
                    if let Ok(permits) = semaphore.try_acquire_many(free as u32) {
                        permits.forget();
                        reclaimed = free;
                    }
                }
                state.shrink_debt += reduce - reclaimed;

                tracing::info!(
                    "Resource pressure {:.2}: window shrunk to {} ({} in flight)",
                    pressure,
                    state.window,
                    state.in_flight
                );
            }
        } else if pressure < config.recover_threshold && state.window < config.ceiling {
            state.window += 1;
            if state.shrink_debt > 0 {
                state.shrink_debt -= 1;
            } else {
                semaphore.add_permits(1);
            }
            tracing::debug!(
                "Resource pressure {:.2}: window grown to {}",
                pressure,
                state.window
            );
        }

        state.window
    }

    /// Reads the gauge once and adjusts the window
    pub fn sample(&self) -> usize {
        let pressure = self.inner.gauge.pressure();
        self.adjust(pressure)
    }

    /// Runs the control loop every `sample_interval` until closed
    pub fn spawn_sampler(&self) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let period = self.inner.config.sample_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if dispatcher.is_closed() {
                    break;
                }
                dispatcher.sample();
            }
        })
    }

    /// Stops admitting; tasks holding permits keep running
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    pub fn budget(&self) -> ResourceBudget {
        let state = self.inner.state();
        ResourceBudget {
            window: state.window,
            in_flight: state.in_flight,
            floor: self.inner.config.floor,
            ceiling: self.inner.config.ceiling,
        }
    }
}
