//! Runtime configuration for the glue layer.

use crate::error::{GlueError, Result};
use crate::primitive::AES_BLOCK_SIZE;
use serde::{Deserialize, Serialize};

/// Priority advertised for every driver unless configured otherwise
pub const DEFAULT_PRIORITY: u32 = 10000;

/// Shortest GCM tag accepted by `set_authsize`
pub const DEFAULT_MIN_AUTH_TAG_SIZE: usize = 12;

/// Certification level appended to driver names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FipsMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "fips-140")]
    Fips140,
    #[serde(rename = "fips-140-2")]
    Fips140_2,
    #[serde(rename = "fips-140-3")]
    Fips140_3,
}

impl FipsMode {
    pub fn suffix(self) -> &'static str {
        match self {
            FipsMode::None => "",
            FipsMode::Fips140 => "-fips-140",
            FipsMode::Fips140_2 => "-fips-140-2",
            FipsMode::Fips140_3 => "-fips-140-3",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != FipsMode::None
    }

    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(FipsMode::None),
            "fips-140" | "140" => Ok(FipsMode::Fips140),
            "fips-140-2" | "140-2" => Ok(FipsMode::Fips140_2),
            "fips-140-3" | "140-3" => Ok(FipsMode::Fips140_3),
            other => Err(GlueError::ConfigurationError(format!(
                "unknown FIPS mode '{other}'"
            ))),
        }
    }
}

/// Which algorithms `register_all` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledAlgorithms {
    pub cbc: bool,
    pub cfb: bool,
    pub gcm: bool,
    pub xts: bool,
}

impl Default for EnabledAlgorithms {
    fn default() -> Self {
        Self {
            cbc: true,
            cfb: true,
            gcm: true,
            xts: true,
        }
    }
}

/// Glue configuration
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlueConfig {
    pub priority: u32,
    pub min_auth_tag_size: usize,
    pub fips: FipsMode,
    pub algorithms: EnabledAlgorithms,
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            min_auth_tag_size: DEFAULT_MIN_AUTH_TAG_SIZE,
            fips: FipsMode::None,
            algorithms: EnabledAlgorithms::default(),
        }
    }
}

impl GlueConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `GLUE_PRIORITY`, `GLUE_MIN_AUTH_TAG_SIZE` and
    /// `GLUE_FIPS`.
    ///
    /// # Errors
    /// Returns error if a variable is set but unparsable, or the result
    /// fails validation
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("GLUE_PRIORITY") {
            config.priority = value.trim().parse().map_err(|e| {
                GlueError::ConfigurationError(format!("Invalid GLUE_PRIORITY '{value}': {e}"))
            })?;
        }

        if let Ok(value) = std::env::var("GLUE_MIN_AUTH_TAG_SIZE") {
            config.min_auth_tag_size = value.trim().parse().map_err(|e| {
                GlueError::ConfigurationError(format!(
                    "Invalid GLUE_MIN_AUTH_TAG_SIZE '{value}': {e}"
                ))
            })?;
        }

        if let Ok(value) = std::env::var("GLUE_FIPS") {
            config.fips = FipsMode::parse(&value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.priority == 0 {
            return Err(GlueError::ConfigurationError(
                "priority must be positive".into(),
            ));
        }
        if self.min_auth_tag_size == 0 || self.min_auth_tag_size > AES_BLOCK_SIZE {
            return Err(GlueError::ConfigurationError(format!(
                "min_auth_tag_size {} outside 1..={AES_BLOCK_SIZE}",
                self.min_auth_tag_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 3] = ["GLUE_PRIORITY", "GLUE_MIN_AUTH_TAG_SIZE", "GLUE_FIPS"];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let saved: Vec<_> = VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();
        for key in VARS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let result = f();

        for (key, value) in saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        result
    }

    #[test]
    fn test_defaults() {
        let config = GlueConfig::default();
        assert_eq!(config.priority, 10000);
        assert_eq!(config.min_auth_tag_size, 12);
        assert_eq!(config.fips, FipsMode::None);
        assert!(config.algorithms.cbc && config.algorithms.xts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            GlueConfig::from_json(r#"{"fips": "fips-140-3", "algorithms": {"cfb": false}}"#)
                .unwrap();
        assert_eq!(config.fips.suffix(), "-fips-140-3");
        assert_eq!(config.priority, DEFAULT_PRIORITY);
        assert!(!config.algorithms.cfb);
        assert!(config.algorithms.gcm);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = GlueConfig {
            priority: 300,
            min_auth_tag_size: 8,
            fips: FipsMode::Fips140_2,
            algorithms: EnabledAlgorithms::default(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("fips-140-2"));
        assert_eq!(GlueConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            GlueConfig::from_json(r#"{"min_auth_tag_size": 17}"#),
            Err(GlueError::ConfigurationError(_))
        ));
        assert!(matches!(
            GlueConfig::from_json(r#"{"priority": 0}"#),
            Err(GlueError::ConfigurationError(_))
        ));
        assert!(matches!(
            GlueConfig::from_json("{not json"),
            Err(GlueError::Serialization(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        let config = with_env(&[], GlueConfig::from_env).unwrap();
        assert_eq!(config, GlueConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        let config = with_env(
            &[
                ("GLUE_PRIORITY", "400"),
                ("GLUE_MIN_AUTH_TAG_SIZE", "16"),
                ("GLUE_FIPS", "140-3"),
            ],
            GlueConfig::from_env,
        )
        .unwrap();
        assert_eq!(config.priority, 400);
        assert_eq!(config.min_auth_tag_size, 16);
        assert_eq!(config.fips, FipsMode::Fips140_3);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let result = with_env(&[("GLUE_PRIORITY", "high")], GlueConfig::from_env);
        assert!(matches!(result, Err(GlueError::ConfigurationError(_))));

        let result = with_env(&[("GLUE_FIPS", "fips-9000")], GlueConfig::from_env);
        assert!(matches!(result, Err(GlueError::ConfigurationError(_))));
    }
}
