//! Engine Configuration
//!
//! [`EngineConfig`] gathers the tunables of an [`crate::AnimationEngine`].
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "root_lock": { "enabled": false }, "resolver": { "reuse_previous_morph": true } }
//! ```

use std::path::Path;

use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Rotation lock applied to root joints of every loaded master clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootLockConfig {
    pub enabled: bool,
    /// Joints whose rotation keys are overwritten.
    pub joint_names: Vec<String>,
    /// Replacement rotation, `[x, y, z, w]`.
    pub rotation: Quat,
}

impl Default for RootLockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            joint_names: vec!["Hips".to_string()],
            rotation: Quat::from_xyzw(0.0, 0.0, 1.0, 0.0),
        }
    }
}

impl RootLockConfig {
    #[must_use]
    pub fn applies_to(&self, joint_name: &str) -> bool {
        self.enabled && self.joint_names.iter().any(|n| n == joint_name)
    }
}

/// Target resolution options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Best-effort fallback: an unresolvable track reuses the most recent
    /// morph-channel resolution of the same clip. Off by default.
    pub reuse_previous_morph: bool,
    /// Only register `morphTarget<N>` aliases for morph targets whose name
    /// starts with this prefix. `None` accepts any prefix.
    pub morph_alias_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames per second used to convert source key times to frames.
    pub frame_rate: f32,
    /// Ramp speed used by `enable_blending` when the caller gives none.
    pub default_blending_speed: f32,
    /// Reuse master clips across loads of the same file.
    pub use_cache: bool,
    pub root_lock: RootLockConfig,
    pub resolver: ResolverOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            default_blending_speed: 0.1,
            use_cache: true,
            root_lock: RootLockConfig::default(),
            resolver: ResolverOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    #[must_use]
    pub fn to_json_string(&self) -> String {
        // Serializing plain data with string keys cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "resolver": { "reuse_previous_morph": true } }"#).unwrap();
        assert!(config.resolver.reuse_previous_morph);
        assert!(config.root_lock.enabled);
        assert_eq!(config.root_lock.joint_names, vec!["Hips".to_string()]);
        assert!((config.frame_rate - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn json_roundtrip_preserves_rotation() {
        let mut config = EngineConfig::default();
        config.root_lock.rotation = Quat::from_xyzw(0.0, 1.0, 0.0, 0.0);
        let back = EngineConfig::from_json_str(&config.to_json_string()).unwrap();
        assert_eq!(back, config);
    }
}
