//! Core detector traits.
//!
//! This module defines the traits every detector implements:
//! - `Detector`: metadata and configuration checks
//! - `BatchDetector`: one synchronous pass over a read-only input

use crate::budget::{BudgetTracker, SearchBudget};
use crate::detector::DetectorMetadata;
use crate::error::Result;
use std::fmt::Debug;

/// Base trait for all detectors.
pub trait Detector: Send + Sync + Debug {
    /// Returns the detector metadata.
    fn metadata(&self) -> &DetectorMetadata;

    /// Validate detector configuration.
    ///
    /// Called by the engine before any input is processed.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the detector ID.
    fn id(&self) -> &str {
        &self.metadata().id
    }
}

/// A detector that runs as a single batch pass over a read-only input.
///
/// Implementations must not mutate shared state: the same input is handed
/// to several detectors, possibly on different threads.
///
/// # Type Parameters
///
/// - `I`: Input type (usually the transaction graph)
/// - `O`: Findings produced by the detector
pub trait BatchDetector<I: ?Sized, O>: Detector {
    /// Run the detector.
    ///
    /// Enumerating detectors call [`BudgetTracker::tick`] once per node
    /// expansion and return whatever they found when it reports exhaustion.
    fn detect(&self, input: &I, budget: &mut BudgetTracker) -> Result<O>;

    /// Validate the input before execution.
    fn validate_input(&self, _input: &I) -> Result<()> {
        Ok(())
    }

    /// Validate, then run under a fresh tracker for `budget`.
    fn detect_with_budget(&self, input: &I, budget: &SearchBudget) -> Result<O> {
        self.validate()?;
        self.validate_input(input)?;
        let mut tracker = BudgetTracker::new(self.id(), budget.clone());
        self.detect(input, &mut tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[derive(Debug)]
    struct CountingDetector {
        metadata: DetectorMetadata,
    }

    impl Detector for CountingDetector {
        fn metadata(&self) -> &DetectorMetadata {
            &self.metadata
        }
    }

    impl BatchDetector<[u32], usize> for CountingDetector {
        fn detect(&self, input: &[u32], budget: &mut BudgetTracker) -> Result<usize> {
            let mut seen = 0;
            for _ in input {
                if budget.tick().is_err() {
                    break;
                }
                seen += 1;
            }
            Ok(seen)
        }

        fn validate_input(&self, input: &[u32]) -> Result<()> {
            if input.is_empty() {
                return Err(EngineError::validation("empty input"));
            }
            Ok(())
        }
    }

    fn detector() -> CountingDetector {
        CountingDetector {
            metadata: DetectorMetadata::enumeration("test/counting"),
        }
    }

    #[test]
    fn test_detector_id() {
        assert_eq!(detector().id(), "test/counting");
    }

    #[test]
    fn test_detect_with_budget_stops_early() {
        let budget = SearchBudget::default().with_max_expansions(3);
        let seen = detector()
            .detect_with_budget(&[1, 2, 3, 4, 5][..], &budget)
            .unwrap();
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_detect_with_budget_validates_input() {
        let result = detector().detect_with_budget(&[][..], &SearchBudget::default());
        assert!(matches!(result, Err(EngineError::ValidationError(_))));
    }
}
