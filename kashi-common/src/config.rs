//! Configuration loading and provider selection
//!
//! Settings are an explicit struct rather than loose key/value lookups; the
//! service loads them from a TOML file resolved in priority order
//! (command-line argument, environment variable, platform config dir).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Built-in lyrics providers, in the order the chain tries them by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Kpoe,
    CustomKpoe,
    Lrclib,
    Local,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Kpoe => write!(f, "kpoe"),
            ProviderKind::CustomKpoe => write!(f, "custom-kpoe"),
            ProviderKind::Lrclib => write!(f, "lrclib"),
            ProviderKind::Local => write!(f, "local"),
        }
    }
}

/// Translation / romanization engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationEngine {
    Google,
    Gemini,
}

/// Persistent cache retention policy
///
/// `None` disables the persistent tier entirely (never written, never read).
/// The finite strategies expire entries after a fixed window; enforcement is
/// the resolver's job on read, not the store's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    None,
    Conservative,
    Aggressive,
}

impl CacheStrategy {
    /// Retention window in milliseconds (0 when persistence is disabled)
    pub fn window_ms(&self) -> u64 {
        match self {
            CacheStrategy::None => 0,
            CacheStrategy::Conservative => 86_400_000,      // 1 day
            CacheStrategy::Aggressive => 2_592_000_000,     // 30 days
        }
    }

    pub fn persists(&self) -> bool {
        !matches!(self, CacheStrategy::None)
    }
}

/// User-facing engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider tried first, ahead of the remaining built-ins
    pub preferred_provider: ProviderKind,
    /// Built-in provider ordering (preferred provider is hoisted to front)
    pub provider_order: Vec<ProviderKind>,
    /// Providers removed from the chain entirely
    pub excluded_providers: Vec<ProviderKind>,
    /// Base URL for a self-hosted KPoe-compatible server
    pub custom_provider_url: Option<String>,
    /// Source ranking forwarded verbatim to KPoe-compatible servers
    pub source_order: String,
    pub cache_strategy: CacheStrategy,
    pub translation_provider: TranslationEngine,
    pub romanization_provider: TranslationEngine,
    /// When set, overrides the target language requested by the caller
    pub target_language_override: Option<String>,
    /// Prefer externally fetched word-synced lyrics over embedded platform
    /// documents, keeping the embedded document as a fallback
    pub embedded_bypass: bool,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferred_provider: ProviderKind::Kpoe,
            provider_order: vec![
                ProviderKind::Kpoe,
                ProviderKind::CustomKpoe,
                ProviderKind::Lrclib,
                ProviderKind::Local,
            ],
            excluded_providers: vec![],
            custom_provider_url: None,
            source_order: "apple,lyricsplus,musixmatch,spotify,musixmatch-word".to_string(),
            cache_strategy: CacheStrategy::Aggressive,
            translation_provider: TranslationEngine::Google,
            romanization_provider: TranslationEngine::Google,
            target_language_override: None,
            embedded_bypass: false,
            gemini_api_key: None,
            gemini_model: "gemini-pro".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid settings TOML: {e}")))
    }

    /// Load settings from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Compute the provider chain order: the preferred provider first, then
    /// the remaining configured providers, minus exclusions and duplicates
    pub fn chain_order(&self) -> Vec<ProviderKind> {
        let mut order = Vec::with_capacity(self.provider_order.len() + 1);
        order.push(self.preferred_provider);
        for p in &self.provider_order {
            if !order.contains(p) {
                order.push(*p);
            }
        }
        order.retain(|p| !self.excluded_providers.contains(p));
        order
    }

    /// Apply the target-language override, if configured
    pub fn effective_target_language<'a>(&'a self, requested: &'a str) -> &'a str {
        match &self.target_language_override {
            Some(lang) if !lang.is_empty() => lang,
            _ => requested,
        }
    }
}

/// Resolve the data directory following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    default_data_dir()
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("kashi"))
        .unwrap_or_else(|| PathBuf::from("./kashi_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_behavior() {
        let settings = Settings::default();
        assert_eq!(settings.preferred_provider, ProviderKind::Kpoe);
        assert_eq!(settings.cache_strategy, CacheStrategy::Aggressive);
        assert_eq!(settings.translation_provider, TranslationEngine::Google);
        assert!(!settings.embedded_bypass);
    }

    #[test]
    fn cache_strategy_windows() {
        assert_eq!(CacheStrategy::None.window_ms(), 0);
        assert_eq!(CacheStrategy::Conservative.window_ms(), 86_400_000);
        assert_eq!(CacheStrategy::Aggressive.window_ms(), 2_592_000_000);
        assert!(!CacheStrategy::None.persists());
        assert!(CacheStrategy::Conservative.persists());
    }

    #[test]
    fn chain_order_hoists_preferred_provider() {
        let settings = Settings {
            preferred_provider: ProviderKind::Lrclib,
            ..Default::default()
        };
        let order = settings.chain_order();
        assert_eq!(order[0], ProviderKind::Lrclib);
        // No duplicates, all built-ins retained
        assert_eq!(order.len(), 4);
        assert_eq!(
            order.iter().filter(|p| **p == ProviderKind::Lrclib).count(),
            1
        );
    }

    #[test]
    fn chain_order_drops_excluded_providers() {
        let settings = Settings {
            excluded_providers: vec![ProviderKind::Local, ProviderKind::CustomKpoe],
            ..Default::default()
        };
        let order = settings.chain_order();
        assert_eq!(order, vec![ProviderKind::Kpoe, ProviderKind::Lrclib]);
    }

    #[test]
    fn settings_parse_from_toml() {
        let settings = Settings::from_toml_str(
            r#"
            preferred_provider = "lrclib"
            cache_strategy = "conservative"
            embedded_bypass = true
            target_language_override = "ja"
            "#,
        )
        .expect("parse");

        assert_eq!(settings.preferred_provider, ProviderKind::Lrclib);
        assert_eq!(settings.cache_strategy, CacheStrategy::Conservative);
        assert!(settings.embedded_bypass);
        assert_eq!(settings.effective_target_language("en"), "ja");
        // Unspecified keys keep their defaults
        assert_eq!(settings.gemini_model, "gemini-pro");
    }

    #[test]
    fn target_language_override_ignored_when_empty() {
        let settings = Settings {
            target_language_override: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(settings.effective_target_language("ko"), "ko");
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(settings.preferred_provider, ProviderKind::Kpoe);
    }
}
