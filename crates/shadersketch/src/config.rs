use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use renderer::{Antialiasing, BackendPreference, GpuPowerPreference, SketchConfig};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::cli::Cli;

/// File name looked up in the sketch directory when `--config` is absent.
pub const SKETCH_FILE: &str = "sketch.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `sketch.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SketchFile {
    pub title: Option<String>,
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub gpu: GpuSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GpuSection {
    #[serde(default, deserialize_with = "deserialize_parsed_opt")]
    pub backend: Option<BackendPreference>,
    #[serde(default, deserialize_with = "deserialize_parsed_opt")]
    pub power: Option<GpuPowerPreference>,
    #[serde(default, deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<Antialiasing>,
}

impl SketchFile {
    pub fn from_toml_str(input: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }
}

/// Reads the explicit `--config` file, or `sketch.toml` in the sketch
/// directory when one exists.
pub fn load_sketch_file(cli: &Cli) -> Result<Option<(PathBuf, SketchFile)>, ConfigError> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let candidate = cli.sketch_dir.join(SKETCH_FILE);
            if !candidate.is_file() {
                return Ok(None);
            }
            candidate
        }
    };
    let file = SketchFile::load(&path)?;
    Ok(Some((path, file)))
}

/// Layers built-in defaults, then the sketch file, then CLI flags.
pub fn resolve(cli: &Cli, file: Option<&SketchFile>) -> SketchConfig {
    let mut config = SketchConfig {
        sketch_dir: cli.sketch_dir.clone(),
        ..SketchConfig::default()
    };

    if let Some(file) = file {
        if let Some(title) = &file.title {
            config.title = title.clone();
        }
        if let Some(vertex) = &file.vertex {
            config.vertex_shader = vertex.clone();
        }
        if let Some(fragment) = &file.fragment {
            config.fragment_shader = fragment.clone();
        }
        if let Some(width) = file.window.width {
            config.window_size.0 = width.max(1);
        }
        if let Some(height) = file.window.height {
            config.window_size.1 = height.max(1);
        }
        if let Some(backend) = file.gpu.backend {
            config.backend = backend;
        }
        if let Some(power) = file.gpu.power {
            config.power = power;
        }
        if let Some(antialias) = file.gpu.antialias {
            config.antialiasing = antialias;
        }
    }

    if let Some(title) = &cli.title {
        config.title = title.clone();
    }
    if let Some(vertex) = &cli.vertex {
        config.vertex_shader = vertex.clone();
    }
    if let Some(fragment) = &cli.fragment {
        config.fragment_shader = fragment.clone();
    }
    if let Some(size) = cli.size {
        config.window_size = size;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(power) = cli.power {
        config.power = power;
    }
    if let Some(antialias) = cli.antialias {
        config.antialiasing = antialias;
    }

    config
}

fn deserialize_parsed_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr<Err = String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| value.parse().map_err(de::Error::custom))
        .transpose()
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<Antialiasing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let raw = match helper {
        None => return Ok(None),
        Some(Helper::Str(raw)) => raw,
        Some(Helper::Num(value)) if value < 0 => {
            return Err(de::Error::custom("antialias value must be non-negative"));
        }
        Some(Helper::Num(value)) => value.to_string(),
    };
    raw.parse().map(Some).map_err(de::Error::custom)
}
