//! Configuration file loading

pub use serde::{Deserialize, Serialize};

/// File-backed configuration trait
///
/// Implemented by any serde-enabled settings type; the file format is picked
/// by extension (`.toml` or `.ron`).
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !(path.ends_with(".toml") || path.ends_with(".ron")) {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }

        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WindowParams;

    #[test]
    fn unknown_extension_is_rejected_before_touching_the_filesystem() {
        let result = WindowParams::load_from_file("settings.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn toml_round_trip() {
        let path = std::env::temp_dir().join(format!("demo_harness_cfg_{}.toml", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        let mut params = WindowParams::default();
        params.window_name = "round trip".to_string();
        params.width = 640;
        params.save_to_file(&path).unwrap();

        let loaded = WindowParams::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.window_name, "round trip");
        assert_eq!(loaded.width, 640);
        assert_eq!(loaded.height, params.height);
    }

    #[test]
    fn ron_round_trip() {
        let path = std::env::temp_dir().join(format!("demo_harness_cfg_{}.ron", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        let params = WindowParams::default();
        params.save_to_file(&path).unwrap();

        let loaded = WindowParams::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.width, params.width);
        assert_eq!(loaded.use_fullscreen, params.use_fullscreen);
    }
}
