//! Detection and session configuration, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use crate::circle::HoughCircleConfig;
use crate::preprocess::PreprocessConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The file is not valid configuration JSON.
    Parse(serde_json::Error),
    /// A value is out of range.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {}", e),
            Self::Parse(e) => write!(f, "failed to parse config: {}", e),
            Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Per-tick detection configuration: preprocessing plus the two voting passes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EyeDetectConfig {
    /// Intensity conversion and denoising.
    pub preprocess: PreprocessConfig,
    /// Small-radius, strict pass for the pupil boundary.
    pub pupil: HoughCircleConfig,
    /// Large-radius, lenient pass for the iris boundary.
    pub iris: HoughCircleConfig,
}

impl Default for EyeDetectConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            pupil: HoughCircleConfig::pupil(),
            iris: HoughCircleConfig::iris(),
        }
    }
}

impl EyeDetectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.preprocess.validate()?;
        self.pupil
            .validate()
            .map_err(|e| prefix_invalid("pupil", e))?;
        self.iris.validate().map_err(|e| prefix_invalid("iris", e))?;
        Ok(())
    }
}

/// Session timing.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed tick interval in milliseconds.
    ///
    /// A full pass on a 640×480 frame takes roughly 300 ms in a release
    /// build, longer than the default interval. Deadlines that pass while a
    /// pass runs are dropped rather than queued (see [`crate::Ticker`]), so
    /// the effective rate on such frames is about three passes per second.
    /// Raise the interval or shrink the frames to get a steady cadence.
    pub tick_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        // Five passes per second when a pass fits in the interval.
        Self {
            tick_interval_ms: 200,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub detect: EyeDetectConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Parse and validate configuration JSON. Missing sections take defaults.
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detect.validate()?;
        self.session.validate()
    }
}

fn prefix_invalid(section: &str, e: ConfigError) -> ConfigError {
    match e {
        ConfigError::Invalid(msg) => ConfigError::Invalid(format!("{}.{}", section, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let cfg = Config::default();
        assert_eq!(cfg.detect.preprocess.median_kernel, 5);
        assert_eq!(cfg.detect.pupil.r_max, 40);
        assert_eq!((cfg.detect.iris.r_min, cfg.detect.iris.r_max), (50, 200));
        assert!(cfg.detect.pupil.min_coverage > cfg.detect.iris.min_coverage);
        assert_eq!(cfg.session.tick_interval(), Duration::from_millis(200));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_round_trip() {
        let mut cfg = Config::default();
        cfg.detect.iris.r_max = 180;
        cfg.session.tick_interval_ms = 100;
        let json = cfg.to_json_pretty().expect("serialize");
        let back = Config::from_json_str(&json).expect("parse");
        assert_eq!(back, cfg);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg = Config::from_json_str(r#"{"session": {"tick_interval_ms": 50}}"#).expect("parse");
        assert_eq!(cfg.detect, EyeDetectConfig::default());
        assert_eq!(cfg.session.tick_interval_ms, 50);
    }

    #[test]
    fn separation_variants_parse() {
        let json = r#"{
            "detect": {
                "pupil": {
                    "accumulator_ratio": 1.0,
                    "min_center_dist": {"pixels": 30.0},
                    "edge_threshold": 80.0,
                    "gradient_sigma": 1.0,
                    "min_coverage": 0.6,
                    "r_min": 4,
                    "r_max": 30
                }
            }
        }"#;
        let cfg = Config::from_json_str(json).expect("parse");
        assert_eq!(
            cfg.detect.pupil.min_center_dist,
            crate::circle::CenterSeparation::Pixels(30.0)
        );
        assert_eq!(cfg.detect.iris, HoughCircleConfig::iris());
    }

    #[test]
    fn invalid_values_are_reported_with_section() {
        let err = Config::from_json_str(r#"{"detect": {"preprocess": {"median_kernel": 4}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut cfg = Config::default();
        cfg.detect.iris.accumulator_ratio = 0.0;
        match cfg.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.starts_with("iris."), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Config::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_tick_interval_is_invalid() {
        let cfg = Config::from_json_str(r#"{"session": {"tick_interval_ms": 0}}"#);
        assert!(matches!(cfg, Err(ConfigError::Invalid(_))));
    }
}
