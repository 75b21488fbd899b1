//! Engine Configuration
//!
//! One serde structure holding every detector threshold plus the search
//! budget and the parallelism switch.
//!
//! # Example
//!
//! ```rust,ignore
//! use fintrace_detection::config::EngineConfig;
//!
//! // Load from environment
//! let config = EngineConfig::from_env()?;
//!
//! // Or load from file
//! let config = EngineConfig::from_file("config/engine.toml")?;
//! config.validate()?;
//! ```

use fintrace_core::budget::SearchBudget;
use fintrace_core::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cycle detector thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Shortest reported cycle, in accounts.
    pub min_length: usize,
    /// Longest reported cycle, in accounts.
    pub max_length: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5,
        }
    }
}

impl CycleConfig {
    /// Validate bounds.
    pub fn validate(&self) -> Result<()> {
        if self.min_length < 3 {
            return Err(EngineError::config("cycles.min_length must be at least 3"));
        }
        if self.min_length > self.max_length {
            return Err(EngineError::config(
                "cycles.min_length must not exceed cycles.max_length",
            ));
        }
        Ok(())
    }
}

/// Smurfing detector thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmurfingConfig {
    /// Window length in hours.
    pub window_hours: u32,
    /// Distinct counterparties needed inside one window.
    pub min_counterparties: usize,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            window_hours: 72,
            min_counterparties: 10,
        }
    }
}

impl SmurfingConfig {
    /// Window length.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.window_hours))
    }

    /// Validate thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.window_hours == 0 {
            return Err(EngineError::config("smurfing.window_hours must be greater than zero"));
        }
        if self.min_counterparties == 0 {
            return Err(EngineError::config(
                "smurfing.min_counterparties must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Shell network detector thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Shortest reported chain, in accounts.
    pub min_length: usize,
    /// Longest reported chain, in accounts.
    pub max_length: usize,
    /// Lowest dataset-wide transaction count of a shell account.
    pub min_shell_transactions: u32,
    /// Highest dataset-wide transaction count of a shell account.
    pub max_shell_transactions: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 6,
            min_shell_transactions: 2,
            max_shell_transactions: 3,
        }
    }
}

impl ShellConfig {
    /// Whether a transaction count marks a shell account.
    #[must_use]
    pub fn is_shell_count(&self, count: u32) -> bool {
        (self.min_shell_transactions..=self.max_shell_transactions).contains(&count)
    }

    /// Validate bounds.
    pub fn validate(&self) -> Result<()> {
        if self.min_length < 3 {
            return Err(EngineError::config("shell.min_length must be at least 3"));
        }
        if self.min_length > self.max_length {
            return Err(EngineError::config(
                "shell.min_length must not exceed shell.max_length",
            ));
        }
        if self.min_shell_transactions > self.max_shell_transactions {
            return Err(EngineError::config(
                "shell.min_shell_transactions must not exceed shell.max_shell_transactions",
            ));
        }
        Ok(())
    }
}

/// Kingpin scoring weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KingpinConfig {
    /// Distinct counterparties needed to be considered.
    pub min_connections: usize,
    /// Weight of normalized flow.
    pub flow_weight: f64,
    /// Weight of centrality (scaled to 0-100).
    pub centrality_weight: f64,
    /// Flow that counts as 1.0 before weighting.
    pub flow_normalizer: f64,
}

impl Default for KingpinConfig {
    fn default() -> Self {
        Self {
            min_connections: 5,
            flow_weight: 0.7,
            centrality_weight: 0.3,
            flow_normalizer: 1_000_000.0,
        }
    }
}

impl KingpinConfig {
    /// Validate weights.
    pub fn validate(&self) -> Result<()> {
        if self.min_connections == 0 {
            return Err(EngineError::config(
                "kingpin.min_connections must be greater than zero",
            ));
        }
        if !(self.flow_normalizer.is_finite() && self.flow_normalizer > 0.0) {
            return Err(EngineError::config(
                "kingpin.flow_normalizer must be a positive number",
            ));
        }
        if self.flow_weight < 0.0 || self.centrality_weight < 0.0 {
            return Err(EngineError::config("kingpin weights must not be negative"));
        }
        Ok(())
    }
}

/// Unified engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Environment name.
    pub environment: String,
    /// Run detectors concurrently.
    pub parallel: bool,
    /// Budget for enumerating detectors.
    pub budget: SearchBudget,
    /// Cycle detector.
    pub cycles: CycleConfig,
    /// Smurfing detector.
    pub smurfing: SmurfingConfig,
    /// Shell network detector.
    pub shell: ShellConfig,
    /// Kingpin scorer.
    pub kingpin: KingpinConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: "default".to_string(),
            parallel: true,
            budget: SearchBudget::default(),
            cycles: CycleConfig::default(),
            smurfing: SmurfingConfig::default(),
            shell: ShellConfig::default(),
            kingpin: KingpinConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create development configuration
    pub fn development() -> Self {
        Self {
            environment: "development".to_string(),
            parallel: false,
            budget: SearchBudget::development(),
            ..Default::default()
        }
    }

    /// Create production configuration
    pub fn production() -> Self {
        Self {
            environment: "production".to_string(),
            parallel: true,
            budget: SearchBudget::production(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("FINTRACE_ENV").as_deref().unwrap_or("default") {
            "production" | "prod" => Self::production(),
            "development" | "dev" => Self::development(),
            _ => Self::default(),
        };

        if let Ok(val) = std::env::var("FINTRACE_PARALLEL") {
            config.parallel = parse_env("FINTRACE_PARALLEL", &val)?;
        }

        if let Ok(val) = std::env::var("FINTRACE_MAX_EXPANSIONS") {
            config.budget.max_expansions = parse_env("FINTRACE_MAX_EXPANSIONS", &val)?;
        }

        if let Ok(val) = std::env::var("FINTRACE_DETECTOR_TIMEOUT_MS") {
            config.budget.timeout_ms = parse_env("FINTRACE_DETECTOR_TIMEOUT_MS", &val)?;
        }

        if let Ok(val) = std::env::var("FINTRACE_SMURFING_WINDOW_HOURS") {
            config.smurfing.window_hours = parse_env("FINTRACE_SMURFING_WINDOW_HOURS", &val)?;
        }

        if let Ok(val) = std::env::var("FINTRACE_SMURFING_THRESHOLD") {
            config.smurfing.min_counterparties = parse_env("FINTRACE_SMURFING_THRESHOLD", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = self.to_toml()?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.budget.validate()?;
        self.cycles.validate()?;
        self.smurfing.validate()?;
        self.shell.validate()?;
        self.kingpin.validate()?;

        if self.environment == "production" && self.budget.max_expansions == u64::MAX {
            tracing::warn!("Production environment running with an unlimited search budget");
        }

        Ok(())
    }

    /// Set parallel execution
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set search budget
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set smurfing configuration
    pub fn with_smurfing(mut self, config: SmurfingConfig) -> Self {
        self.smurfing = config;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::ConfigError(format!("Invalid value for {}: {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cycles.max_length, 5);
        assert_eq!(config.smurfing.window_hours, 72);
        assert_eq!(config.smurfing.min_counterparties, 10);
        assert_eq!(config.shell.max_length, 6);
        assert_eq!(config.kingpin.min_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(!EngineConfig::development().parallel);
        assert_eq!(EngineConfig::production().environment, "production");
        assert_eq!(
            EngineConfig::production().budget,
            SearchBudget::production()
        );
    }

    #[test]
    fn test_validation_rejects_bad_bounds() {
        let mut config = EngineConfig::default();
        config.cycles.min_length = 2;
        assert!(matches!(config.validate(), Err(EngineError::ConfigError(_))));

        let mut config = EngineConfig::default();
        config.shell.min_length = 7;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.smurfing.window_hours = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.smurfing.min_counterparties = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shell_count_range() {
        let shell = ShellConfig::default();
        assert!(!shell.is_shell_count(1));
        assert!(shell.is_shell_count(2));
        assert!(shell.is_shell_count(3));
        assert!(!shell.is_shell_count(4));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let config = EngineConfig::production().with_parallel(false);
        config.to_file(&path).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.cycles.min_length = 6;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert!(EngineConfig::from_file(&path).is_err());
        assert!(EngineConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    /// Sets variables for the lifetime of the guard.
    struct ScopedEnv(Vec<&'static str>);

    impl ScopedEnv {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (name, value) in vars {
                std::env::set_var(name, value);
            }
            Self(vars.iter().map(|(name, _)| *name).collect())
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for name in &self.0 {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        let _env = ScopedEnv::set(&[
            ("FINTRACE_PARALLEL", "false"),
            ("FINTRACE_MAX_EXPANSIONS", "12345"),
            ("FINTRACE_DETECTOR_TIMEOUT_MS", "750"),
            ("FINTRACE_SMURFING_WINDOW_HOURS", "48"),
            ("FINTRACE_SMURFING_THRESHOLD", "6"),
        ]);

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.environment, "default");
        assert!(!config.parallel);
        assert_eq!(config.budget.max_expansions, 12345);
        assert_eq!(config.budget.timeout_ms, 750);
        assert_eq!(config.smurfing.window_hours, 48);
        assert_eq!(config.smurfing.min_counterparties, 6);
    }

    #[test]
    #[serial]
    fn test_from_env_selects_preset() {
        {
            let _env = ScopedEnv::set(&[("FINTRACE_ENV", "prod")]);
            let config = EngineConfig::from_env().unwrap();
            assert_eq!(config.environment, "production");
            assert!(config.parallel);
            assert_eq!(config.budget, SearchBudget::production());
        }

        // Overrides apply on top of the selected preset
        let _env = ScopedEnv::set(&[("FINTRACE_ENV", "development"), ("FINTRACE_PARALLEL", "true")]);
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.environment, "development");
        assert!(config.parallel);
        assert_eq!(config.budget.max_expansions, SearchBudget::development().max_expansions);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_values() {
        {
            let _env = ScopedEnv::set(&[("FINTRACE_MAX_EXPANSIONS", "lots")]);
            assert!(matches!(EngineConfig::from_env(), Err(EngineError::ConfigError(_))));
        }

        let _env = ScopedEnv::set(&[("FINTRACE_SMURFING_THRESHOLD", "0")]);
        assert!(EngineConfig::from_env().is_err());
    }

    #[test]
    fn test_parse_env_value() {
        assert_eq!(parse_env::<u32>("X", " 48 ").unwrap(), 48);
        assert!(parse_env::<bool>("X", "maybe").is_err());
    }
}
