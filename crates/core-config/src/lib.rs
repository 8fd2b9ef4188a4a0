//! Editor settings: loading, defaults, and validation.
//!
//! Parses `stylus.toml` (or an override path provided by the binary). Every field is optional;
//! missing fields take the defaults below and unknown fields are ignored so older binaries can
//! read newer files. Runtime callbacks (overflow, key context, paste hooks) are not part of this
//! file; they are wired in code by the embedding host.

use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Sentinel for "no length cap".
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_length must be -1 (unlimited) or non-negative, got {0}")]
    InvalidMaxLength(i64),
    #[error("paragraph tag must not be empty")]
    EmptyParagraphTag,
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Editor operating mode. Restricts which structural transformations and chords apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Single line, formatting chords suppressed.
    Inline,
    /// Single line, formatting chords allowed.
    InlineRich,
    /// Multi-paragraph, formatting chords suppressed, no auto rules.
    Partial,
    #[default]
    FullBlock,
}

impl Mode {
    /// Modes in which only the paste chord may run.
    pub fn restricts_commands(&self) -> bool {
        matches!(self, Mode::Inline | Mode::Partial)
    }
    /// Modes where Enter may create structure.
    pub fn is_block(&self) -> bool {
        matches!(self, Mode::Partial | Mode::FullBlock)
    }
}

/// Which physical modifier turns a keystroke into a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandModifier {
    Ctrl,
    Cmd,
    /// Either ctrl or meta.
    #[default]
    Auto,
}

/// Structural tag names. Compared case-insensitively against element names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default = "Tags::default_paragraph")]
    pub paragraph: String,
    #[serde(default = "Tags::default_line_break")]
    pub line_break: Option<String>,
    #[serde(default = "Tags::default_horizontal_rule")]
    pub horizontal_rule: Option<String>,
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            paragraph: Self::default_paragraph(),
            line_break: Self::default_line_break(),
            horizontal_rule: Self::default_horizontal_rule(),
        }
    }
}

impl Tags {
    fn default_paragraph() -> String {
        "p".to_string()
    }
    fn default_line_break() -> Option<String> {
        Some("br".to_string())
    }
    fn default_horizontal_rule() -> Option<String> {
        Some("hr".to_string())
    }

    fn normalize(&mut self) {
        self.paragraph = self.paragraph.trim().to_ascii_lowercase();
        for tag in [&mut self.line_break, &mut self.horizontal_rule] {
            if let Some(t) = tag.as_mut() {
                *t = t.trim().to_ascii_lowercase();
            }
            if tag.as_deref() == Some("") {
                *tag = None;
            }
        }
    }
}

/// One entry of the command table: key code plus the named command it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBinding {
    pub key: u32,
    pub command: String,
}

impl CommandBinding {
    pub fn new(key: u32, command: impl Into<String>) -> Self {
        Self {
            key,
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "Settings::default_max_length")]
    pub max_length: i64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default = "Settings::default_true")]
    pub auto_hr: bool,
    #[serde(default = "Settings::default_true")]
    pub paste_as_text: bool,
    #[serde(default)]
    pub modifier: CommandModifier,
    #[serde(default = "Settings::default_commands")]
    pub commands: Vec<CommandBinding>,
    /// Delay before cleanup runs after a native (rich) paste.
    #[serde(default = "Settings::default_paste_settle_ms")]
    pub paste_settle_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            max_length: Self::default_max_length(),
            tags: Tags::default(),
            auto_hr: true,
            paste_as_text: true,
            modifier: CommandModifier::default(),
            commands: Self::default_commands(),
            paste_settle_ms: Self::default_paste_settle_ms(),
        }
    }
}

impl Settings {
    const fn default_max_length() -> i64 {
        UNLIMITED
    }
    const fn default_true() -> bool {
        true
    }
    const fn default_paste_settle_ms() -> u64 {
        20
    }
    fn default_commands() -> Vec<CommandBinding> {
        vec![
            CommandBinding::new(66, "bold"),
            CommandBinding::new(73, "italicize"),
            CommandBinding::new(85, "underline"),
            CommandBinding::new(86, "paste"),
        ]
    }

    /// `Some(cap)` when a length cap is configured.
    pub fn length_cap(&self) -> Option<usize> {
        if self.max_length == UNLIMITED {
            None
        } else {
            usize::try_from(self.max_length).ok()
        }
    }

    /// Normalize tag names and check invariants.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.max_length < UNLIMITED {
            return Err(ConfigError::InvalidMaxLength(self.max_length));
        }
        self.tags.normalize();
        if self.tags.paragraph.is_empty() {
            return Err(ConfigError::EmptyParagraphTag);
        }
        Ok(self)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Settings>(content)
    }
}

/// Best-effort config path: `./stylus.toml` first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("stylus.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("stylus").join("stylus.toml");
    }
    PathBuf::from("stylus.toml")
}

/// Load settings from `path` (or the discovered default). A missing file yields defaults; an
/// unreadable or malformed file is an error.
pub fn load_from(path: Option<PathBuf>) -> Result<Settings, ConfigError> {
    let path = path.unwrap_or_else(discover);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(target: "config", path = %path.display(), "config_missing_using_defaults");
            return Settings::default().validate();
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    let parsed = Settings::from_toml_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    let settings = parsed.validate()?;
    info!(
        target: "config",
        path = %path.display(),
        mode = ?settings.mode,
        max_length = settings.max_length,
        commands = settings.commands.len(),
        "config_loaded"
    );
    Ok(settings)
}
