//! Resource-pressure signals for the dispatcher

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// A source of resource pressure in `[0, 1]`
pub trait PressureGauge: Send + Sync {
    fn pressure(&self) -> f64;
}

/// Memory pressure of the whole machine, read from `/proc/meminfo`
///
/// Pressure is `1 - MemAvailable / MemTotal`. Where the file is missing or
/// unreadable (non-Linux systems) the gauge reports `0.0`, which keeps the
/// window at its ceiling.
#[derive(Debug, Clone)]
pub struct SystemMemoryGauge {
    path: PathBuf,
}

impl SystemMemoryGauge {
    pub fn new() -> Self {
        Self::with_path("/proc/meminfo")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for SystemMemoryGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureGauge for SystemMemoryGauge {
    fn pressure(&self) -> f64 {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_meminfo(&content).unwrap_or(0.0),
            Err(e) => {
                tracing::trace!("Cannot read {}: {}", self.path.display(), e);
                0.0
            }
        }
    }
}

fn meminfo_kb(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// Computes memory pressure from the text of `/proc/meminfo`
pub(crate) fn parse_meminfo(content: &str) -> Option<f64> {
    let total = meminfo_kb(content, "MemTotal")?;
    let available = meminfo_kb(content, "MemAvailable")?;
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(available) as f64 / total as f64;
    Some(used.clamp(0.0, 1.0))
}

/// A gauge whose reading is set by hand
///
/// Used for fixed-window runs and to drive the dispatcher in tests.
#[derive(Debug, Default)]
pub struct FixedGauge {
    bits: AtomicU64,
}

impl FixedGauge {
    pub fn new(pressure: f64) -> Self {
        Self {
            bits: AtomicU64::new(pressure.to_bits()),
        }
    }

    pub fn set(&self, pressure: f64) {
        self.bits.store(pressure.to_bits(), Ordering::Relaxed);
    }
}

impl PressureGauge for FixedGauge {
    fn pressure(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
