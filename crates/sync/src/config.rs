//! Tunable timings and sizes for editor sessions.
//!
//! Every duration here was chosen empirically; none is a correctness
//! guarantee. Hosts load overrides from TOML:
//!
//! ```toml
//! edit_debounce_ms = 300
//! echo_grace_ms = 150
//!
//! [auto_height]
//! max = 800
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing and layout configuration shared by all sessions of a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
	/// Trailing-edge delay before a local edit is reported through `on_change`.
	pub edit_debounce_ms: u64,
	/// Trailing-edge delay before a local edit is written to the draft store.
	pub draft_debounce_ms: u64,
	/// How long after a programmatic replace change events count as echoes.
	pub echo_grace_ms: u64,
	/// Coalescing window for externally supplied values.
	pub reconcile_debounce_ms: u64,
	/// Auto-save interval used when the host does not supply one.
	pub auto_save_interval_ms: u64,
	pub auto_height: AutoHeightConfig,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			edit_debounce_ms: 500,
			draft_debounce_ms: 1000,
			echo_grace_ms: 100,
			reconcile_debounce_ms: 50,
			auto_save_interval_ms: 30_000,
			auto_height: AutoHeightConfig::default(),
		}
	}
}

/// Container sizing bounds, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoHeightConfig {
	pub min: u32,
	pub max: u32,
	/// Height of the formatting toolbar while it is shown.
	pub toolbar: u32,
}

impl Default for AutoHeightConfig {
	fn default() -> Self {
		Self {
			min: 120,
			max: 600,
			toolbar: 40,
		}
	}
}

impl SyncConfig {
	/// Parses a TOML document; missing keys keep their defaults.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.auto_height.min > self.auto_height.max {
			return Err(ConfigError::Invalid {
				key: "auto_height.min",
				reason: format!(
					"minimum {} exceeds maximum {}",
					self.auto_height.min, self.auto_height.max
				),
			});
		}
		if self.auto_save_interval_ms == 0 {
			return Err(ConfigError::Invalid {
				key: "auto_save_interval_ms",
				reason: "interval must be positive".into(),
			});
		}
		Ok(())
	}

	pub fn edit_debounce(&self) -> Duration {
		Duration::from_millis(self.edit_debounce_ms)
	}

	pub fn draft_debounce(&self) -> Duration {
		Duration::from_millis(self.draft_debounce_ms)
	}

	pub fn echo_grace(&self) -> Duration {
		Duration::from_millis(self.echo_grace_ms)
	}

	pub fn reconcile_debounce(&self) -> Duration {
		Duration::from_millis(self.reconcile_debounce_ms)
	}

	pub fn auto_save_interval(&self) -> Duration {
		Duration::from_millis(self.auto_save_interval_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_uses_defaults() {
		assert_eq!(SyncConfig::from_toml_str("").unwrap(), SyncConfig::default());
	}

	#[test]
	fn overrides_merge_with_defaults() {
		let config = SyncConfig::from_toml_str(
			r#"
			edit_debounce_ms = 250
			[auto_height]
			max = 900
			"#,
		)
		.unwrap();

		assert_eq!(config.edit_debounce(), Duration::from_millis(250));
		assert_eq!(config.echo_grace(), Duration::from_millis(100));
		assert_eq!(config.auto_height.max, 900);
		assert_eq!(config.auto_height.min, 120);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = SyncConfig::from_toml_str("debounce = 10").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn inverted_height_bounds_are_rejected() {
		let err = SyncConfig::from_toml_str("[auto_height]\nmin = 700\nmax = 100").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { key: "auto_height.min", .. }));
	}
}
