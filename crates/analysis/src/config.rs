use sepcheck_solver::ProverConfig;

/// Per-procedure checking limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    pub prover: ProverConfig,
    /// Maximum number of paths explored per procedure.
    pub max_paths: usize,
    /// Keep checking the remaining postconditions after one fails.
    pub collect_postconditions: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            prover: ProverConfig::default(),
            max_paths: 256,
            collect_postconditions: true,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prover(mut self, prover: ProverConfig) -> Self {
        self.prover = prover;
        self
    }

    /// Set the normalization round limit of the prover.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.prover = self.prover.with_max_rounds(rounds);
        self
    }

    /// Set the path limit.
    pub fn with_max_paths(mut self, paths: usize) -> Self {
        self.max_paths = paths.max(1);
        self
    }

    /// Stop at the first failing postcondition instead of collecting all.
    pub fn with_stop_at_first_postcondition(mut self, stop: bool) -> Self {
        self.collect_postconditions = !stop;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CheckerConfig::new();
        assert_eq!(config.max_paths, 256);
        assert!(config.collect_postconditions);
        assert_eq!(config.prover, ProverConfig::default());
    }

    #[test]
    fn builder_overrides() {
        let config = CheckerConfig::new()
            .with_max_paths(0)
            .with_max_rounds(4)
            .with_stop_at_first_postcondition(true);
        assert_eq!(config.max_paths, 1);
        assert_eq!(config.prover.max_rounds, 4);
        assert!(!config.collect_postconditions);
    }
}
