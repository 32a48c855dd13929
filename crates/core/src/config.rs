//! Engine configuration.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables shared by the placement search, ranking and waste classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Lattice step of the coarse search pass.
    pub coarse_step: i32,

    /// Lattice step of the fine search pass.
    pub fine_step: i32,

    /// Maximum candidate boxes checked per search (0 = unlimited).
    pub max_candidates: u64,

    /// Days before expiry at which an item counts as expiring soon.
    pub expiring_soon_days: i64,

    /// Fraction of the usage limit at which an item counts as depleting soon.
    pub depleting_ratio: f64,

    /// Expiry closer than this many days earns the larger priority bonus.
    pub urgent_expiry_days: i64,

    /// Expiry closer than this many days earns the smaller priority bonus.
    pub soon_expiry_days: i64,

    /// Mass above this earns the larger priority bonus.
    pub heavy_mass: f64,

    /// Mass above this earns the smaller priority bonus.
    pub medium_mass: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coarse_step: 5,
            fine_step: 1,
            max_candidates: 0,
            expiring_soon_days: 30,
            depleting_ratio: 0.8,
            urgent_expiry_days: 30,
            soon_expiry_days: 90,
            heavy_mass: 3.0,
            medium_mass: 1.0,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coarse and fine lattice steps.
    pub fn with_steps(mut self, coarse: i32, fine: i32) -> Self {
        self.coarse_step = coarse;
        self.fine_step = fine;
        self
    }

    /// Caps the number of candidates a single search may check.
    pub fn with_max_candidates(mut self, max: u64) -> Self {
        self.max_candidates = max;
        self
    }

    /// Sets the expiring-soon window in days.
    pub fn with_expiring_soon_days(mut self, days: i64) -> Self {
        self.expiring_soon_days = days;
        self
    }

    /// Sets the depleting-soon ratio.
    pub fn with_depleting_ratio(mut self, ratio: f64) -> Self {
        let clamped = ratio.clamp(0.0, 1.0);
        if clamped != ratio {
            log::warn!("Depleting ratio {} clamped to {}", ratio, clamped);
        }
        self.depleting_ratio = clamped;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.coarse_step <= 0 || self.fine_step <= 0 {
            return Err(Error::ConfigError(
                "Search steps must be positive".into(),
            ));
        }
        if self.fine_step > self.coarse_step {
            return Err(Error::ConfigError(
                "Fine step must not exceed coarse step".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.depleting_ratio) {
            return Err(Error::ConfigError(
                "Depleting ratio must be within [0, 1]".into(),
            ));
        }
        if self.urgent_expiry_days > self.soon_expiry_days {
            return Err(Error::ConfigError(
                "Urgent expiry window must not exceed the soon window".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.coarse_step, 5);
        assert_eq!(config.fine_step, 1);
        assert_eq!(config.max_candidates, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_steps(10, 2)
            .with_max_candidates(1_000)
            .with_depleting_ratio(1.5);
        assert_eq!(config.coarse_step, 10);
        assert_eq!(config.fine_step, 2);
        assert_eq!(config.max_candidates, 1_000);
        assert_relative_eq!(config.depleting_ratio, 1.0);
        assert_relative_eq!(EngineConfig::new().with_depleting_ratio(0.75).depleting_ratio, 0.75);
    }

    #[test]
    fn test_validation() {
        assert!(EngineConfig::new().with_steps(0, 1).validate().is_err());
        assert!(EngineConfig::new().with_steps(2, 3).validate().is_err());
        let mut config = EngineConfig::new();
        config.depleting_ratio = -0.1;
        assert!(config.validate().is_err());
    }
}
