//! Timeframe profiles: history length, model window, look-ahead and risk multipliers.
//!
//! The built-in table is immutable data constructed once per process. A
//! replacement table can be parsed from TOML:
//!
//! ```toml
//! default = "1h"
//!
//! [profiles.1h]
//! history_limit = 2000
//! sequence_len = 48
//! forward = 3
//! sl_multiplier = 0.8
//! tp_multiplier = 1.5
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Timeframe key every unknown label falls back to.
pub const DEFAULT_TIMEFRAME: &str = "1h";

/// Per-timeframe parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeProfile {
    /// Candles the data collaborator should fetch.
    pub history_limit: usize,
    /// Feature rows fed to the model; also the minimum usable history.
    pub sequence_len: usize,
    /// Look-ahead horizon the model labels were generated with. Not used
    /// during plan synthesis.
    pub forward: usize,
    /// Stop-loss distance in units of the volatility proxy.
    pub sl_multiplier: f64,
    /// Take-profit distance in units of the volatility proxy.
    pub tp_multiplier: f64,
}

impl TimeframeProfile {
    const fn new(
        history_limit: usize,
        sequence_len: usize,
        forward: usize,
        sl_multiplier: f64,
        tp_multiplier: f64,
    ) -> Self {
        Self {
            history_limit,
            sequence_len,
            forward,
            sl_multiplier,
            tp_multiplier,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("profile table has no entry for fallback timeframe '{0}'")]
    MissingFallback(String),

    #[error("profile '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

/// Lookup table from timeframe label to profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    #[serde(default = "default_key")]
    default: String,
    profiles: BTreeMap<String, TimeframeProfile>,
}

fn default_key() -> String {
    DEFAULT_TIMEFRAME.to_string()
}

impl ProfileTable {
    /// The built-in table, shared by every caller.
    pub fn builtin() -> &'static ProfileTable {
        static TABLE: OnceLock<ProfileTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let profiles = [
                ("5m", TimeframeProfile::new(1500, 60, 6, 0.3, 0.6)),
                ("15m", TimeframeProfile::new(2000, 64, 4, 0.5, 1.0)),
                ("1h", TimeframeProfile::new(2000, 48, 3, 0.8, 1.5)),
                ("4h", TimeframeProfile::new(1000, 32, 2, 1.2, 2.0)),
                ("1d", TimeframeProfile::new(700, 30, 2, 2.0, 3.0)),
            ]
            .into_iter()
            .map(|(k, p)| (k.to_string(), p))
            .collect();
            ProfileTable {
                default: default_key(),
                profiles,
            }
        })
    }

    /// Parse and validate a table from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let table: ProfileTable = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if !self.profiles.contains_key(&self.default) {
            return Err(ProfileError::MissingFallback(self.default.clone()));
        }
        for (key, p) in &self.profiles {
            let invalid = |reason: &str| ProfileError::Invalid {
                key: key.clone(),
                reason: reason.to_string(),
            };
            if p.sequence_len == 0 {
                return Err(invalid("sequence_len must be >= 1"));
            }
            if !(p.sl_multiplier.is_finite() && p.sl_multiplier > 0.0) {
                return Err(invalid("sl_multiplier must be finite and positive"));
            }
            if !(p.tp_multiplier.is_finite() && p.tp_multiplier > 0.0) {
                return Err(invalid("tp_multiplier must be finite and positive"));
            }
        }
        Ok(())
    }

    /// Resolve a label; unknown labels get the fallback profile.
    pub fn resolve(&self, timeframe: &str) -> &TimeframeProfile {
        self.profiles
            .get(timeframe)
            .or_else(|| self.profiles.get(&self.default))
            .unwrap_or(&BUILTIN_FALLBACK)
    }

    /// True if the label has its own entry rather than the fallback.
    pub fn is_known(&self, timeframe: &str) -> bool {
        self.profiles.contains_key(timeframe)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

// Only reachable for a table that skipped validation.
const BUILTIN_FALLBACK: TimeframeProfile = TimeframeProfile::new(2000, 48, 3, 0.8, 1.5);

/// Resolve a label against the built-in table.
pub fn resolve(timeframe: &str) -> &'static TimeframeProfile {
    ProfileTable::builtin().resolve(timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_five_timeframes() {
        let keys: Vec<&str> = ProfileTable::builtin().keys().collect();
        assert_eq!(keys.len(), 5);
        for k in ["5m", "15m", "1h", "4h", "1d"] {
            assert!(ProfileTable::builtin().is_known(k), "missing {k}");
        }
    }

    #[test]
    fn known_timeframes_resolve_to_their_own_profile() {
        assert_eq!(resolve("5m").sequence_len, 60);
        assert_eq!(resolve("15m").sequence_len, 64);
        assert_eq!(resolve("4h").sl_multiplier, 1.2);
        assert_eq!(resolve("1d").tp_multiplier, 3.0);
        assert_eq!(resolve("1d").history_limit, 700);
    }

    #[test]
    fn unknown_timeframe_falls_back_to_1h() {
        let p = resolve("3h");
        assert_eq!(p, resolve("1h"));
        assert_eq!(p.sl_multiplier, 0.8);
        assert_eq!(p.tp_multiplier, 1.5);
        assert_eq!(resolve(""), resolve("1h"));
    }

    #[test]
    fn builtin_roundtrips_through_toml() {
        let text = ProfileTable::builtin().to_toml().unwrap();
        let parsed = ProfileTable::from_toml(&text).unwrap();
        assert_eq!(&parsed, ProfileTable::builtin());
    }

    #[test]
    fn toml_table_with_custom_fallback() {
        let text = r#"
default = "swing"

[profiles.swing]
history_limit = 500
sequence_len = 20
forward = 2
sl_multiplier = 1.0
tp_multiplier = 2.5
"#;
        let table = ProfileTable::from_toml(text).unwrap();
        assert_eq!(table.resolve("anything").sequence_len, 20);
        assert_eq!(table.resolve("swing").tp_multiplier, 2.5);
    }

    #[test]
    fn toml_without_fallback_entry_is_rejected() {
        let text = r#"
[profiles.5m]
history_limit = 1500
sequence_len = 60
forward = 6
sl_multiplier = 0.3
tp_multiplier = 0.6
"#;
        let err = ProfileTable::from_toml(text).unwrap_err();
        assert!(matches!(err, ProfileError::MissingFallback(ref k) if k == "1h"));
    }

    #[test]
    fn toml_with_zero_sequence_len_is_rejected() {
        let text = r#"
[profiles.1h]
history_limit = 2000
sequence_len = 0
forward = 3
sl_multiplier = 0.8
tp_multiplier = 1.5
"#;
        let err = ProfileTable::from_toml(text).unwrap_err();
        assert!(matches!(err, ProfileError::Invalid { .. }));
    }
}
