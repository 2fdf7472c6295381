//! Resolution policy switches, fixed when a [`crate::LayeredFs`] is built.

use serde::{Deserialize, Serialize};

/// What happens when a layer fails for a reason other than not-found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tolerance {
    /// Stop and return the failure; later layers are not consulted.
    #[default]
    ShortCircuit,
    /// Record the failure and keep going with the remaining layers.
    BestEffort,
}

/// How directories are presented when opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectoryMode {
    /// `open` returns the first layer's handle, directory or not. Listings
    /// are still merged by `read_dir`.
    #[default]
    FirstWins,
    /// `open` on a directory returns a synthetic handle over the entries of
    /// every layer that has that directory.
    Overlay,
}

/// The pair of switches a layered filesystem resolves with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionPolicy {
    pub tolerance: Tolerance,
    pub directory_mode: DirectoryMode,
}

impl ResolutionPolicy {
    pub const fn new(tolerance: Tolerance, directory_mode: DirectoryMode) -> Self {
        Self {
            tolerance,
            directory_mode,
        }
    }

    /// Short-circuit, first-wins. The default.
    pub const fn strict() -> Self {
        Self::new(Tolerance::ShortCircuit, DirectoryMode::FirstWins)
    }

    /// Best-effort, first-wins.
    pub const fn best_effort() -> Self {
        Self::new(Tolerance::BestEffort, DirectoryMode::FirstWins)
    }

    /// Short-circuit, overlay.
    pub const fn overlay() -> Self {
        Self::new(Tolerance::ShortCircuit, DirectoryMode::Overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_strict() {
        assert_eq!(ResolutionPolicy::default(), ResolutionPolicy::strict());
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let policy: ResolutionPolicy =
            toml::from_str("tolerance = \"best-effort\"\ndirectory_mode = \"overlay\"\n").unwrap();
        assert_eq!(
            policy,
            ResolutionPolicy::new(Tolerance::BestEffort, DirectoryMode::Overlay)
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let policy: ResolutionPolicy = toml::from_str("directory_mode = \"overlay\"\n").unwrap();
        assert_eq!(policy, ResolutionPolicy::overlay());
    }

    #[test]
    fn test_unknown_tolerance_rejected() {
        let result: Result<ResolutionPolicy, _> = toml::from_str("tolerance = \"sometimes\"\n");
        assert!(result.is_err());
    }
}
