//! Session configuration and presets

use serde::{Deserialize, Serialize};

/// Preset configurations for common use cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Balanced defaults for a group details screen.
    #[default]
    Default,
    /// Small buffers, a single screen driving edits by hand.
    Interactive,
    /// Large buffers for scripted or batched edits.
    /// - Command channel (1024)
    /// - Notice channel (256)
    Bulk,
}

impl Preset {
    /// Command channel capacity for this preset.
    pub fn command_capacity(&self) -> usize {
        match self {
            Preset::Default => 64,
            Preset::Interactive => 16,
            Preset::Bulk => 1024,
        }
    }

    /// Notice broadcast capacity for this preset.
    pub fn notice_capacity(&self) -> usize {
        match self {
            Preset::Default => 32,
            Preset::Interactive => 8,
            Preset::Bulk => 256,
        }
    }
}

/// Configuration for a group session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Configuration preset.
    pub preset: Preset,
    /// Override of the preset's command channel capacity.
    pub command_capacity: Option<usize>,
    /// Override of the preset's notice channel capacity.
    pub notice_capacity: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::with_preset(Preset::Default)
    }
}

impl SessionConfig {
    /// Create a configuration from a preset.
    pub fn with_preset(preset: Preset) -> Self {
        Self {
            preset,
            command_capacity: None,
            notice_capacity: None,
        }
    }

    /// Effective command channel capacity (at least 1).
    pub fn command_capacity(&self) -> usize {
        self.command_capacity
            .unwrap_or_else(|| self.preset.command_capacity())
            .max(1)
    }

    /// Effective notice channel capacity (at least 1).
    pub fn notice_capacity(&self) -> usize {
        self.notice_capacity
            .unwrap_or_else(|| self.preset.notice_capacity())
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_capacities() {
        let config = SessionConfig::with_preset(Preset::Bulk);
        assert_eq!(config.command_capacity(), 1024);
        assert_eq!(config.notice_capacity(), 256);
    }

    #[test]
    fn test_overrides_and_floor() {
        let config = SessionConfig {
            command_capacity: Some(0),
            notice_capacity: Some(3),
            ..SessionConfig::default()
        };
        assert_eq!(config.command_capacity(), 1);
        assert_eq!(config.notice_capacity(), 3);
    }

    #[test]
    fn test_from_json() {
        let config: SessionConfig = serde_json::from_str(r#"{"preset":"interactive"}"#).unwrap();
        assert_eq!(config.preset, Preset::Interactive);
        assert_eq!(config.command_capacity(), 16);
    }
}
