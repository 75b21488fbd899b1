//! Search budgets
//!
//! Cycle and chain enumeration cost grows combinatorially with graph density,
//! so every detector call runs under an explicit budget: a maximum number of
//! node expansions and a wall-clock allowance. When either runs out the
//! detector stops and reports what it found so far.
//!
//! # Example
//!
//! ```rust
//! use fintrace_core::budget::{BudgetTracker, SearchBudget};
//!
//! let budget = SearchBudget::default().with_max_expansions(1_000);
//! let mut tracker = BudgetTracker::new("detection/cycles", budget);
//!
//! while tracker.tick().is_ok() {
//!     // expand one node
//! }
//! assert!(tracker.is_exhausted());
//! ```

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Expansions between wall-clock checks.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

/// Budget for a single detector call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// Maximum node expansions.
    pub max_expansions: u64,
    /// Wall-clock allowance in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            max_expansions: 5_000_000,
            timeout_ms: 10_000,
        }
    }
}

impl SearchBudget {
    /// Development budget: generous, for exploring small hand-made cases.
    pub fn development() -> Self {
        Self {
            max_expansions: 50_000_000,
            timeout_ms: 120_000,
        }
    }

    /// Production budget: tight enough that a dense upload cannot stall a run.
    pub fn production() -> Self {
        Self {
            max_expansions: 2_000_000,
            timeout_ms: 5_000,
        }
    }

    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self {
            max_expansions: u64::MAX,
            timeout_ms: u64::MAX,
        }
    }

    /// Set max expansions
    pub fn with_max_expansions(mut self, max: u64) -> Self {
        self.max_expansions = max;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Wall-clock allowance.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the budget
    pub fn validate(&self) -> Result<()> {
        if self.max_expansions == 0 {
            return Err(EngineError::config("max_expansions must be greater than zero"));
        }
        if self.timeout_ms == 0 {
            return Err(EngineError::config("timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}

/// Tracks budget consumption for one detector call.
#[derive(Debug)]
pub struct BudgetTracker {
    name: String,
    budget: SearchBudget,
    start: Instant,
    expansions: u64,
    exhausted: bool,
}

impl BudgetTracker {
    /// Start tracking `budget` for the detector called `name`.
    pub fn new(name: impl Into<String>, budget: SearchBudget) -> Self {
        Self {
            name: name.into(),
            budget,
            start: Instant::now(),
            expansions: 0,
            exhausted: false,
        }
    }

    /// A tracker that never runs out, for direct calls and tests.
    pub fn unlimited(name: impl Into<String>) -> Self {
        Self::new(name, SearchBudget::unlimited())
    }

    /// Record one node expansion.
    ///
    /// Returns an error once the expansion count or the wall-clock allowance
    /// is exceeded; every later call fails as well.
    pub fn tick(&mut self) -> Result<()> {
        if self.exhausted {
            return Err(self.exhaustion_error());
        }

        self.expansions += 1;
        if self.expansions > self.budget.max_expansions {
            return Err(self.exhaust());
        }
        if self.expansions % CLOCK_CHECK_INTERVAL == 0 && self.elapsed() > self.budget.timeout() {
            return Err(self.exhaust());
        }
        Ok(())
    }

    /// Expansions recorded so far.
    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    /// Time since the tracker was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether the budget ran out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Detector name the tracker was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn exhaust(&mut self) -> EngineError {
        self.exhausted = true;
        let err = self.exhaustion_error();
        tracing::warn!(
            detector = %self.name,
            expansions = self.expansions,
            elapsed = ?self.elapsed(),
            "Search budget exhausted, returning partial results"
        );
        err
    }

    fn exhaustion_error(&self) -> EngineError {
        if self.expansions > self.budget.max_expansions {
            EngineError::BudgetExhausted {
                detector: self.name.clone(),
                expansions: self.expansions,
            }
        } else {
            EngineError::Timeout {
                detector: self.name.clone(),
                elapsed: self.elapsed(),
            }
        }
    }
}

impl Drop for BudgetTracker {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        if !self.exhausted && elapsed > self.budget.timeout() / 2 {
            tracing::debug!(
                detector = %self.name,
                elapsed = ?elapsed,
                timeout = ?self.budget.timeout(),
                "Detector took >50% of its time budget"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_presets() {
        assert!(SearchBudget::production().max_expansions < SearchBudget::development().max_expansions);
        assert_eq!(SearchBudget::default().timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_validation() {
        assert!(SearchBudget::default().validate().is_ok());
        assert!(SearchBudget::default().with_max_expansions(0).validate().is_err());
        assert!(SearchBudget::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_tracker_expansion_limit() {
        let mut tracker = BudgetTracker::new("test", SearchBudget::default().with_max_expansions(2));
        assert!(tracker.tick().is_ok());
        assert!(tracker.tick().is_ok());

        let err = tracker.tick().unwrap_err();
        assert!(matches!(err, EngineError::BudgetExhausted { expansions: 3, .. }));
        assert!(tracker.is_exhausted());

        // Stays exhausted
        assert!(tracker.tick().is_err());
    }

    #[test]
    fn test_tracker_timeout() {
        let budget = SearchBudget::default().with_timeout(Duration::from_millis(1));
        let mut tracker = BudgetTracker::new("test", budget);
        std::thread::sleep(Duration::from_millis(5));

        let mut result = Ok(());
        for _ in 0..CLOCK_CHECK_INTERVAL {
            result = tracker.tick();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(EngineError::Timeout { .. })));
    }

    #[test]
    fn test_unlimited_tracker() {
        let mut tracker = BudgetTracker::unlimited("test");
        for _ in 0..10_000 {
            assert!(tracker.tick().is_ok());
        }
        assert_eq!(tracker.expansions(), 10_000);
        assert!(!tracker.is_exhausted());
    }
}
