//! Conversion settings: built-in defaults, optional TOML file, CLI overrides

use export::{ExportFormat, Quality};
use frames::FrameRate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Config file layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub convert: ConvertConfig,
}

/// `[convert]` table
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_fps")]
    pub source_fps: u32,
    #[serde(default = "default_fps")]
    pub output_fps: u32,
}

fn default_format() -> String { "gif".to_string() }
fn default_quality() -> u8 { 100 }
fn default_fps() -> u32 { 30 }

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            width: None,
            height: None,
            quality: default_quality(),
            source_fps: default_fps(),
            output_fps: default_fps(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<ExportFormat>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub source_fps: Option<u32>,
    pub output_fps: Option<u32>,
}

/// Validated settings for one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub format: ExportFormat,
    /// Requested output size; `None` keeps the first frame's size
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Quality,
    pub source_fps: FrameRate,
    pub output_fps: FrameRate,
}

impl ConvertOptions {
    pub fn resolve(config: &ConvertConfig, overrides: &Overrides) -> Result<Self, ConfigError> {
        let format = match overrides.format {
            Some(format) => format,
            None => config
                .format
                .parse()
                .map_err(|message| ConfigError::Invalid { field: "format", message })?,
        };

        let quality = Quality::new(overrides.quality.unwrap_or(config.quality)).map_err(|e| {
            ConfigError::Invalid {
                field: "quality",
                message: e.to_string(),
            }
        })?;

        let source_fps = FrameRate::source(overrides.source_fps.unwrap_or(config.source_fps))
            .map_err(|e| ConfigError::Invalid {
                field: "source_fps",
                message: e.to_string(),
            })?;
        let output_fps = FrameRate::output(overrides.output_fps.unwrap_or(config.output_fps))
            .map_err(|e| ConfigError::Invalid {
                field: "output_fps",
                message: e.to_string(),
            })?;

        Ok(Self {
            format,
            width: overrides.width.or(config.width),
            height: overrides.height.or(config.height),
            quality,
            source_fps,
            output_fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let options = ConvertOptions::resolve(&ConvertConfig::default(), &Overrides::default())
            .unwrap();
        assert_eq!(options.format, ExportFormat::Gif);
        assert_eq!(options.quality, Quality::MAX);
        assert_eq!(options.source_fps.get(), 30);
        assert_eq!(options.output_fps.get(), 30);
        assert_eq!((options.width, options.height), (None, None));
    }

    #[test]
    fn file_values_fill_missing_flags() {
        let config = Config::parse(
            r#"
            [convert]
            format = "webp"
            width = 320
            quality = 75
            source_fps = 60
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            quality: Some(50),
            output_fps: Some(12),
            ..Default::default()
        };
        let options = ConvertOptions::resolve(&config.convert, &overrides).unwrap();
        assert_eq!(options.format, ExportFormat::WebP);
        assert_eq!(options.width, Some(320));
        assert_eq!(options.height, None);
        assert_eq!(options.quality.get(), 50);
        assert_eq!(options.source_fps.get(), 60);
        assert_eq!(options.output_fps.get(), 12);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.convert.format, "gif");
        assert_eq!(config.convert.output_fps, 30);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = ConvertConfig {
            output_fps: 51,
            ..Default::default()
        };
        match ConvertOptions::resolve(&config, &Overrides::default()) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "output_fps"),
            other => panic!("expected invalid output_fps, got {other:?}"),
        }

        let overrides = Overrides {
            quality: Some(0),
            ..Default::default()
        };
        assert!(ConvertOptions::resolve(&ConvertConfig::default(), &overrides).is_err());
    }

    #[test]
    fn unknown_format_in_file() {
        let config = ConvertConfig {
            format: "bmp".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConvertOptions::resolve(&config, &Overrides::default()),
            Err(ConfigError::Invalid { field: "format", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            Config::load(Path::new("target/does-not-exist.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
