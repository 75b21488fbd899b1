//! Detector catalog.

use fintrace_core::detector::{DetectorMetadata, SearchKind};
use fintrace_core::traits::Detector;
use fintrace_detection::{CycleDetector, KingpinScorer, ShellNetworkDetector, SmurfingDetector};

/// Metadata of every detector the engine runs, in merge order.
pub fn detectors() -> Vec<DetectorMetadata> {
    vec![
        CycleDetector::new().metadata().clone(),
        SmurfingDetector::new().metadata().clone(),
        ShellNetworkDetector::new().metadata().clone(),
        KingpinScorer::new().metadata().clone(),
    ]
}

/// IDs of the detectors bounded by the engine's search budget.
pub fn budgeted() -> Vec<String> {
    detectors()
        .into_iter()
        .filter(|m| m.search == SearchKind::Enumeration)
        .map(|m| m.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids() {
        let ids: Vec<String> = detectors().into_iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                "detection/cycles",
                "detection/smurfing",
                "detection/shell-networks",
                "detection/kingpin"
            ]
        );
    }

    #[test]
    fn test_only_enumerations_are_budgeted() {
        assert_eq!(budgeted(), vec!["detection/cycles", "detection/shell-networks"]);
    }

    #[test]
    fn test_descriptions_present() {
        for metadata in detectors() {
            assert!(!metadata.description.is_empty(), "{} has no description", metadata.id);
        }
    }
}
