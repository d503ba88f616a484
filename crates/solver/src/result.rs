/// Outcome of an entailment query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofResult {
    /// The goal follows from the known facts.
    Proved,
    /// The negation of the goal follows from the known facts.
    Refuted,
    /// Neither the goal nor its negation could be derived.
    Unknown,
}

impl ProofResult {
    /// Returns `true` if the result is `Proved`.
    pub fn is_proved(&self) -> bool {
        matches!(self, ProofResult::Proved)
    }

    /// Returns `true` if the result is `Refuted`.
    pub fn is_refuted(&self) -> bool {
        matches!(self, ProofResult::Refuted)
    }

    /// Returns `true` if the result is `Unknown`.
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProofResult::Unknown)
    }
}

impl std::fmt::Display for ProofResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofResult::Proved => write!(f, "proved"),
            ProofResult::Refuted => write!(f, "refuted"),
            ProofResult::Unknown => write!(f, "unknown"),
        }
    }
}
