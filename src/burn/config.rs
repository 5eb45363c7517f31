//! Burn configuration.
//!
//! A [`BurnConfig`] is fixed once built. The entropy bound is clamped to
//! [`ENTROPY_MIN`]..=[`ENTROPY_MAX`] at construction, so every stored value
//! is in range.

use serde::{Deserialize, Serialize};

use crate::config::BurnSection;

pub const ENTROPY_MIN: u16 = 1;
pub const ENTROPY_MAX: u16 = 256;

const DEFAULT_CONTEXT_HINT: &str = "within the Aurora Project";
const DEFAULT_PROJECT_TOKEN: &str = "Aurora";
const DEFAULT_ENTROPY: i64 = 200;

/// Clamp an arbitrary entropy input into the accepted range.
pub fn clamp_entropy(entropy: i64) -> u16 {
    entropy.clamp(ENTROPY_MIN as i64, ENTROPY_MAX as i64) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Limits a burn is declared to stay within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyBounds {
    pub max_risk: RiskLevel,
    pub allow_self_modification: bool,
    pub forbid_external_calls: bool,
}

impl Default for SafetyBounds {
    fn default() -> Self {
        Self {
            max_risk: RiskLevel::Medium,
            allow_self_modification: false,
            forbid_external_calls: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnConfig {
    concept: String,
    context_hint: String,
    project_token: String,
    checkpoints: Vec<String>,
    overclock: bool,
    entropy: u16,
    safety_bounds: SafetyBounds,
    compression_phrase: String,
    glyph: String,
}

impl BurnConfig {
    /// Config for `concept` with default hint, no checkpoints, overclock on
    /// and entropy 200. The compression phrase defaults to the context hint.
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            context_hint: DEFAULT_CONTEXT_HINT.to_string(),
            project_token: DEFAULT_PROJECT_TOKEN.to_string(),
            checkpoints: Vec::new(),
            overclock: true,
            entropy: clamp_entropy(DEFAULT_ENTROPY),
            safety_bounds: SafetyBounds::default(),
            compression_phrase: DEFAULT_CONTEXT_HINT.to_string(),
            glyph: String::new(),
        }
    }

    /// Config for `concept` carrying every default from a `[burn]` section.
    pub fn from_section(concept: impl Into<String>, section: &BurnSection) -> Self {
        Self::new(concept)
            .with_context_hint(&section.context_hint)
            .with_project_token(&section.project_token)
            .with_checkpoints(section.checkpoints.clone())
            .with_overclock(section.overclock)
            .with_entropy(section.entropy)
            .with_compression_phrase(&section.compression_phrase)
            .with_glyph(&section.glyph)
    }

    /// Sets the context hint. A compression phrase still equal to the old
    /// hint follows the new one.
    pub fn with_context_hint(mut self, hint: &str) -> Self {
        if self.compression_phrase == self.context_hint {
            self.compression_phrase = hint.to_string();
        }
        self.context_hint = hint.to_string();
        self
    }

    pub fn with_project_token(mut self, token: &str) -> Self {
        self.project_token = token.to_string();
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Vec<String>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn with_overclock(mut self, overclock: bool) -> Self {
        self.overclock = overclock;
        self
    }

    pub fn with_entropy(mut self, entropy: i64) -> Self {
        self.entropy = clamp_entropy(entropy);
        self
    }

    pub fn with_safety_bounds(mut self, bounds: SafetyBounds) -> Self {
        self.safety_bounds = bounds;
        self
    }

    /// Empty input keeps the current phrase.
    pub fn with_compression_phrase(mut self, phrase: &str) -> Self {
        if !phrase.is_empty() {
            self.compression_phrase = phrase.to_string();
        }
        self
    }

    pub fn with_glyph(mut self, glyph: &str) -> Self {
        self.glyph = glyph.to_string();
        self
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn context_hint(&self) -> &str {
        &self.context_hint
    }

    pub fn project_token(&self) -> &str {
        &self.project_token
    }

    pub fn checkpoints(&self) -> &[String] {
        &self.checkpoints
    }

    pub fn overclock(&self) -> bool {
        self.overclock
    }

    pub fn entropy(&self) -> u16 {
        self.entropy
    }

    pub fn safety_bounds(&self) -> &SafetyBounds {
        &self.safety_bounds
    }

    pub fn compression_phrase(&self) -> &str {
        &self.compression_phrase
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_clamped_for_any_input() {
        for input in [i64::MIN, -5, 0, 1, 64, 200, 256, 257, 10_000, i64::MAX] {
            let value = BurnConfig::new("c").with_entropy(input).entropy();
            assert!(
                (ENTROPY_MIN..=ENTROPY_MAX).contains(&value),
                "entropy {} stored as {}",
                input,
                value
            );
        }
        assert_eq!(clamp_entropy(0), 1);
        assert_eq!(clamp_entropy(999), 256);
        assert_eq!(clamp_entropy(128), 128);
    }

    #[test]
    fn test_defaults() {
        let cfg = BurnConfig::new("Gamma");
        assert_eq!(cfg.context_hint(), "within the Aurora Project");
        assert_eq!(cfg.compression_phrase(), "within the Aurora Project");
        assert_eq!(cfg.entropy(), 200);
        assert!(cfg.overclock());
        assert!(cfg.checkpoints().is_empty());
        assert_eq!(cfg.glyph(), "");
        assert_eq!(cfg.safety_bounds().max_risk, RiskLevel::Medium);
        assert!(!cfg.safety_bounds().allow_self_modification);
        assert!(cfg.safety_bounds().forbid_external_calls);
    }

    #[test]
    fn test_compression_phrase_follows_hint_until_set() {
        let cfg = BurnConfig::new("c").with_context_hint("inside Lab 7");
        assert_eq!(cfg.compression_phrase(), "inside Lab 7");

        let cfg = BurnConfig::new("c")
            .with_compression_phrase("Tanagra")
            .with_context_hint("inside Lab 7");
        assert_eq!(cfg.compression_phrase(), "Tanagra");

        let cfg = BurnConfig::new("c").with_compression_phrase("");
        assert_eq!(cfg.compression_phrase(), "within the Aurora Project");
    }

    #[test]
    fn test_from_section_uses_file_defaults() {
        let section = BurnSection {
            entropy: 900,
            ..BurnSection::default()
        };
        let cfg = BurnConfig::from_section("concept", &section);
        assert_eq!(cfg.entropy(), 256);
        assert_eq!(cfg.compression_phrase(), "Tanagra at the Firebreak");
        assert_eq!(cfg.glyph(), "🔥");
        assert_eq!(cfg.checkpoints().len(), 4);
        assert_eq!(cfg.project_token(), "Aurora");
    }

    #[test]
    fn test_safety_bounds_override() {
        let cfg = BurnConfig::new("c").with_safety_bounds(SafetyBounds {
            max_risk: RiskLevel::High,
            allow_self_modification: true,
            forbid_external_calls: false,
        });
        assert_eq!(cfg.safety_bounds().max_risk, RiskLevel::High);
        assert!(cfg.safety_bounds().allow_self_modification);
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        let json = serde_json::to_string(&SafetyBounds::default()).unwrap();
        assert!(json.contains("\"max_risk\":\"medium\""));
    }
}
