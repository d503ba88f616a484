/// Prover configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverConfig {
    /// Maximum normalization passes per term.
    pub max_rounds: usize,
    /// Maximum facts processed by a single `assume` (including rule re-queues).
    pub max_absorb_steps: usize,
    /// Try refuting the negated goal when direct evaluation is inconclusive.
    pub refutation_probe: bool,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            max_rounds: 64,
            max_absorb_steps: 10_000,
            refutation_probe: true,
        }
    }
}

impl ProverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the normalization round limit.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Set the per-assumption work limit.
    pub fn with_max_absorb_steps(mut self, steps: usize) -> Self {
        self.max_absorb_steps = steps.max(1);
        self
    }

    /// Enable or disable the refutation probe.
    pub fn with_refutation_probe(mut self, enabled: bool) -> Self {
        self.refutation_probe = enabled;
        self
    }
}
