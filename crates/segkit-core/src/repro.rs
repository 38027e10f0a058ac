// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Reproducibility mode controlling whether stages may fan out across threads.
///
/// Results are assembled in cluster/segment order in every mode; `Strict`
/// additionally pins execution to the calling thread.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReproMode {
    Strict,
    #[default]
    Balanced,
    Fast,
}

impl ReproMode {
    /// Returns true when a stage is allowed to use a thread pool.
    pub fn allows_parallel(self) -> bool {
        !matches!(self, Self::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::ReproMode;

    #[test]
    fn repro_mode_default_is_balanced() {
        assert_eq!(ReproMode::default(), ReproMode::Balanced);
    }

    #[test]
    fn strict_mode_disallows_parallel() {
        assert!(!ReproMode::Strict.allows_parallel());
        assert!(ReproMode::Balanced.allows_parallel());
        assert!(ReproMode::Fast.allows_parallel());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn repro_mode_serde_uses_snake_case() {
        let encoded = serde_json::to_string(&ReproMode::Strict).expect("repro mode should serialize");
        assert_eq!(encoded, "\"strict\"");
        let decoded: ReproMode =
            serde_json::from_str("\"fast\"").expect("repro mode should deserialize");
        assert_eq!(decoded, ReproMode::Fast);
    }
}
