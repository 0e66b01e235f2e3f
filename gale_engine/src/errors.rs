//! Non-fatal error accounting.
//!
//! Gaps in narrative content, unknown markup tags and similar problems are
//! logged and play continues. Each report carries a weight by severity, and if
//! the weighted total inside a rolling window crosses a threshold the tracker
//! returns [`ErrorCascade`], which callers treat as fatal. A loop that keeps
//! producing errors therefore stops the game instead of spinning quietly.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use log::{error, warn};
use thiserror::Error;

/// Window over which non-fatal errors are summed.
pub const CASCADE_WINDOW: Duration = Duration::from_secs(30);
/// Weighted score at which the tracker gives up.
pub const CASCADE_THRESHOLD: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Severity::Warn => 1,
            Severity::Error => 2,
            Severity::Critical => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("error cascade: {count} non-fatal errors reached weighted score {score} (limit {CASCADE_THRESHOLD})")]
pub struct ErrorCascade {
    pub score: u32,
    pub count: usize,
}

/// Rolling record of recent non-fatal errors.
#[derive(Debug, Default, Clone)]
pub struct ErrorTracker {
    recent: VecDeque<(Instant, u32)>,
    total_reported: usize,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a non-fatal error.
    ///
    /// # Errors
    /// Returns [`ErrorCascade`] once the weighted score inside the window reaches the threshold.
    pub fn report(&mut self, severity: Severity, message: &str) -> Result<(), ErrorCascade> {
        self.report_at(Instant::now(), severity, message)
    }

    /// As [`ErrorTracker::report`], with an explicit timestamp.
    ///
    /// # Errors
    /// Returns [`ErrorCascade`] once the weighted score inside the window reaches the threshold.
    pub fn report_at(&mut self, now: Instant, severity: Severity, message: &str) -> Result<(), ErrorCascade> {
        match severity {
            Severity::Warn => warn!("{message}"),
            Severity::Error | Severity::Critical => error!("[{severity}] {message}"),
        }
        self.total_reported += 1;

        while let Some((stamp, _)) = self.recent.front() {
            if now.saturating_duration_since(*stamp) > CASCADE_WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        self.recent.push_back((now, severity.weight()));

        let score = self.cascade_score();
        if score >= CASCADE_THRESHOLD {
            error!("non-fatal errors are cascading (score {score}); giving up");
            return Err(ErrorCascade {
                score,
                count: self.recent.len(),
            });
        }
        Ok(())
    }

    /// Weighted sum of the errors currently inside the window.
    pub fn cascade_score(&self) -> u32 {
        self.recent.iter().map(|(_, weight)| weight).sum()
    }

    pub fn total_reported(&self) -> usize {
        self.total_reported
    }
}
