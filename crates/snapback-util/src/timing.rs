//! Duration logging for engine calls and subvolume primitives.
//!
//! ```rust,ignore
//! use snapback_util::TimingGuard;
//!
//! async fn purge(catalog: &Catalog) {
//!     let _timing = TimingGuard::engine("purge");
//!     // logged on drop
//! }
//! ```

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What is being timed. Each kind has its own default thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Restore, purge or cleanup.
    Engine,
    /// One create, rename or delete.
    Subvolume,
}

impl OperationKind {
    fn default_thresholds(self) -> Thresholds {
        match self {
            Self::Engine => Thresholds {
                info: Duration::from_millis(100),
                warn: Duration::from_secs(5),
            },
            // Deleting a large subvolume routinely takes seconds.
            Self::Subvolume => Thresholds {
                info: Duration::from_millis(250),
                warn: Duration::from_secs(30),
            },
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Engine => "engine",
            Self::Subvolume => "subvolume",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    info: Duration,
    warn: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Quiet,
    Notable,
    Slow,
}

/// Logs how long it lived when dropped: debug below the info threshold,
/// info up to the warn threshold, warn above.
#[derive(Debug)]
pub struct TimingGuard {
    kind: OperationKind,
    name: String,
    start: Instant,
    thresholds: Thresholds,
}

impl TimingGuard {
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(kind = %kind, operation = %name, "Starting operation");
        Self {
            kind,
            name,
            start: Instant::now(),
            thresholds: kind.default_thresholds(),
        }
    }

    pub fn engine(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Engine, name)
    }

    pub fn subvolume(name: impl Into<String>) -> Self {
        Self::new(OperationKind::Subvolume, name)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }

    fn severity(&self, elapsed: Duration) -> Severity {
        if elapsed >= self.thresholds.warn {
            Severity::Slow
        } else if elapsed >= self.thresholds.info {
            Severity::Notable
        } else {
            Severity::Quiet
        }
    }
}

/// Human-readable duration: `250ms`, `1.50s`, `1m 30.0s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{:.2}s", duration.as_secs_f64()),
        _ => {
            let secs = (ms % 60_000) as f64 / 1000.0;
            format!("{}m {secs:.1}s", ms / 60_000)
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        let duration = format_duration(elapsed);
        let duration_ms = elapsed.as_millis() as u64;

        match self.severity(elapsed) {
            Severity::Slow => warn!(
                kind = %self.kind,
                operation = %self.name,
                duration_ms,
                "Slow {} {} took {}",
                self.kind,
                self.name,
                duration
            ),
            Severity::Notable => info!(
                kind = %self.kind,
                operation = %self.name,
                duration_ms,
                "{} finished in {}",
                self.name,
                duration
            ),
            Severity::Quiet => debug!(
                kind = %self.kind,
                operation = %self.name,
                duration_ms,
                "{} finished in {}",
                self.name,
                duration
            ),
        }
    }
}
