//! Engine settings
//!
//! `defaults/mx.default.toml` is embedded into the crate so that the documented
//! defaults and runtime behavior stay in sync. Callers layer their own files and
//! overrides on top of it via [`Loader`] before deserializing into [`EngineConfig`].
//!
//! A configuration is immutable once an engine is built from it. Every check in
//! [`EngineConfig::validate`] runs before a single character is consumed.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/mx.default.toml");

pub const DEFAULT_ESCAPE: char = '\\';
pub const DEFAULT_QUOTE: char = '`';
pub const DEFAULT_GROUP_OPEN: char = '{';
pub const DEFAULT_GROUP_CLOSE: char = '}';

pub const DEFAULT_MACRO_BUFFER_CAPACITY: usize = 64 * 1024;
pub const DEFAULT_EXPANSION_BUFFER_CAPACITY: usize = 64 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Smallest macro buffer a configuration may ask for.
pub const MIN_MACRO_BUFFER_CAPACITY: usize = 64;
/// Smallest expansion buffer a configuration may ask for.
pub const MIN_EXPANSION_BUFFER_CAPACITY: usize = 64;

/// Everything an engine instance needs to know before expansion starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    pub characters: CharacterConfig,
    pub limits: LimitsConfig,
    #[serde(default)]
    pub include: IncludeConfig,
}

/// The four distinguished characters of the command syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CharacterConfig {
    pub escape: char,
    pub quote: char,
    pub group_open: char,
    pub group_close: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    pub macro_buffer_capacity: usize,
    pub expansion_buffer_capacity: usize,
    pub max_depth: usize,
}

/// Ordered include search path. No directory is searched implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncludeConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            escape: DEFAULT_ESCAPE,
            quote: DEFAULT_QUOTE,
            group_open: DEFAULT_GROUP_OPEN,
            group_close: DEFAULT_GROUP_CLOSE,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            macro_buffer_capacity: DEFAULT_MACRO_BUFFER_CAPACITY,
            expansion_buffer_capacity: DEFAULT_EXPANSION_BUFFER_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            characters: CharacterConfig::default(),
            limits: LimitsConfig::default(),
            include: IncludeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Append a directory to the end of the include search path.
    pub fn with_include_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include.paths.push(dir.into());
        self
    }

    pub fn with_characters(mut self, characters: CharacterConfig) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.characters;
        let named = [
            ("escape", c.escape),
            ("quote", c.quote),
            ("group-open", c.group_open),
            ("group-close", c.group_close),
        ];

        for (role, ch) in named {
            if ch.is_whitespace() || ch.is_alphanumeric() || ch == '_' {
                return Err(ConfigError::InvalidSpecialCharacter { role, ch });
            }
        }

        for (i, &(first, a)) in named.iter().enumerate() {
            if let Some(&(second, _)) = named[i + 1..].iter().find(|&&(_, b)| b == a) {
                return Err(ConfigError::DuplicateSpecialCharacter {
                    ch: a,
                    first,
                    second,
                });
            }
        }

        let limits = &self.limits;
        if limits.macro_buffer_capacity < MIN_MACRO_BUFFER_CAPACITY {
            return Err(ConfigError::BufferTooSmall {
                buffer: "macro",
                requested: limits.macro_buffer_capacity,
                minimum: MIN_MACRO_BUFFER_CAPACITY,
            });
        }
        if limits.expansion_buffer_capacity < MIN_EXPANSION_BUFFER_CAPACITY {
            return Err(ConfigError::BufferTooSmall {
                buffer: "expansion",
                requested: limits.expansion_buffer_capacity,
                minimum: MIN_EXPANSION_BUFFER_CAPACITY,
            });
        }
        if limits.max_depth == 0 {
            return Err(ConfigError::DepthTooSmall);
        }

        Ok(())
    }
}

/// Configuration problems, all reported before expansion begins.
#[derive(Debug)]
pub enum ConfigError {
    DuplicateSpecialCharacter {
        ch: char,
        first: &'static str,
        second: &'static str,
    },
    InvalidSpecialCharacter {
        role: &'static str,
        ch: char,
    },
    BufferTooSmall {
        buffer: &'static str,
        requested: usize,
        minimum: usize,
    },
    DepthTooSmall,
    Load(config::ConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DuplicateSpecialCharacter { ch, first, second } => write!(
                f,
                "'{}' is configured as both the {} and the {} character",
                ch, first, second
            ),
            ConfigError::InvalidSpecialCharacter { role, ch } => write!(
                f,
                "{:?} cannot be used as the {} character",
                ch, role
            ),
            ConfigError::BufferTooSmall {
                buffer,
                requested,
                minimum,
            } => write!(
                f,
                "{} buffer capacity {} is below the minimum of {}",
                buffer, requested, minimum
            ),
            ConfigError::DepthTooSmall => write!(f, "maximum expansion depth must be at least 1"),
            ConfigError::Load(e) => write!(f, "failed to load configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load(e) => Some(e),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e)
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for command-line flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize, deserialize and validate the configuration.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = self.builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<EngineConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_match_constants() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("characters.escape", "@")
            .expect("override to apply")
            .set_override("limits.max_depth", 8i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.characters.escape, '@');
        assert_eq!(config.limits.max_depth, 8);
    }

    #[test]
    fn rejects_duplicate_special_characters() {
        let config = EngineConfig::default().with_characters(CharacterConfig {
            quote: '{',
            ..CharacterConfig::default()
        });
        match config.validate() {
            Err(ConfigError::DuplicateSpecialCharacter { ch, first, second }) => {
                assert_eq!(ch, '{');
                assert_eq!(first, "quote");
                assert_eq!(second, "group-open");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_name_and_whitespace_characters() {
        for bad in ['a', '7', '_', ' ', '\n'] {
            let config = EngineConfig::default().with_characters(CharacterConfig {
                escape: bad,
                ..CharacterConfig::default()
            });
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSpecialCharacter { role: "escape", .. })
            ));
        }
    }

    #[test]
    fn rejects_buffers_below_minimum() {
        let config = EngineConfig::default().with_limits(LimitsConfig {
            expansion_buffer_capacity: MIN_EXPANSION_BUFFER_CAPACITY - 1,
            ..LimitsConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BufferTooSmall {
                buffer: "expansion",
                ..
            })
        ));

        let config = EngineConfig::default().with_limits(LimitsConfig {
            max_depth: 0,
            ..LimitsConfig::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::DepthTooSmall)));
    }

    #[test]
    fn build_validates_layered_values() {
        let result = Loader::new()
            .set_override("limits.macro_buffer_capacity", 1i64)
            .expect("override to apply")
            .build();
        assert!(matches!(result, Err(ConfigError::BufferTooSmall { .. })));
    }
}
