use thiserror::Error;

/// Configuration for a [`Runner`](crate::Runner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    rel_tol: f64,
    abs_tol: f64,
    max_steps: u32,
    seed: Option<u64>,
}

/// Errors that can occur when creating a [`Config`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rel_tol must be positive and finite")]
    RelTol,

    #[error("abs_tol must be positive and finite")]
    AbsTol,

    #[error("max_steps must be at least 1")]
    MaxSteps,
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(1e-6, 1e-9, 10_000).unwrap()
    }
}

impl Config {
    /// Creates a config with validated integrator tolerances.
    ///
    /// `max_steps` bounds the steps the integrator may take within one
    /// smooth interval. The maximum step size is given per run.
    ///
    /// # Errors
    ///
    /// Returns an error if a tolerance is non-positive or non-finite, or if
    /// `max_steps` is zero.
    pub fn new(rel_tol: f64, abs_tol: f64, max_steps: u32) -> Result<Self, ConfigError> {
        if !(rel_tol.is_finite() && rel_tol > 0.0) {
            return Err(ConfigError::RelTol);
        }
        if !(abs_tol.is_finite() && abs_tol > 0.0) {
            return Err(ConfigError::AbsTol);
        }
        if max_steps == 0 {
            return Err(ConfigError::MaxSteps);
        }
        Ok(Self {
            rel_tol,
            abs_tol,
            max_steps,
            seed: None,
        })
    }

    /// Seeds the random number generator used for rate-based Events.
    ///
    /// Unseeded runs draw their seed from the operating system.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    #[must_use]
    pub fn rel_tol(&self) -> f64 {
        self.rel_tol
    }

    #[must_use]
    pub fn abs_tol(&self) -> f64 {
        self.abs_tol
    }

    #[must_use]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.rel_tol(), 1e-6);
        assert_eq!(config.abs_tol(), 1e-9);
        assert_eq!(config.max_steps(), 10_000);
        assert_eq!(config.seed(), None);
        assert_eq!(config.with_seed(7).seed(), Some(7));
    }

    #[test]
    fn rejects_invalid_settings() {
        assert_eq!(Config::new(-1.0, 1e-9, 10), Err(ConfigError::RelTol));
        assert_eq!(Config::new(1e-6, f64::NAN, 10), Err(ConfigError::AbsTol));
        assert_eq!(Config::new(1e-6, 1e-9, 0), Err(ConfigError::MaxSteps));
    }
}
