//! Installation strategies and the fallback-chain interpreter.
use std::fmt;

use crate::platform::PackageManager;

/// One way of installing a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Install through a package manager.
    Manager(PackageManager),
    /// Run a shell snippet (`sh -c`), e.g. an upstream install script.
    Script(String),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager(m) => write!(f, "{m}"),
            Self::Script(s) => write!(f, "script `{s}`"),
        }
    }
}

/// Tagged result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The strategy installed the package.
    Installed,
    /// The strategy failed with the given reason.
    Failed(String),
}

/// A strategy paired with what happened when it was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Strategy that was tried.
    pub strategy: Strategy,
    /// Its outcome.
    pub outcome: Outcome,
}

/// Interpret `chain` in order, stopping at the first [`Outcome::Installed`].
///
/// Returns every attempt made; strategies after the first success are never
/// tried.
pub fn run_chain(chain: &[Strategy], mut attempt: impl FnMut(&Strategy) -> Outcome) -> Vec<Attempt> {
    let mut attempts = Vec::with_capacity(chain.len());
    for strategy in chain {
        let outcome = attempt(strategy);
        let done = outcome == Outcome::Installed;
        attempts.push(Attempt {
            strategy: strategy.clone(),
            outcome,
        });
        if done {
            break;
        }
    }
    attempts
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_success() {
        let chain = vec![
            Strategy::Manager(PackageManager::Brew),
            Strategy::Manager(PackageManager::Apt),
            Strategy::Manager(PackageManager::Pacman),
        ];
        let mut tried = Vec::new();
        let attempts = run_chain(&chain, |s| {
            tried.push(s.to_string());
            if *s == Strategy::Manager(PackageManager::Apt) {
                Outcome::Installed
            } else {
                Outcome::Failed("nope".to_string())
            }
        });
        assert_eq!(tried, vec!["brew", "apt"]);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].outcome, Outcome::Installed);
    }

    #[test]
    fn empty_chain_makes_no_attempts() {
        assert!(run_chain(&[], |_| Outcome::Installed).is_empty());
    }

    #[test]
    fn script_display() {
        let s = Strategy::Script("curl -fsSL https://sh.rustup.rs | sh".to_string());
        assert_eq!(s.to_string(), "script `curl -fsSL https://sh.rustup.rs | sh`");
    }
}
