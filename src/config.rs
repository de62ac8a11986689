//! Slack settings file parsing.
//!
//! The settings file keeps the section/key layout of the original
//! deployment tooling so existing files remain drop-in compatible:
//!
//! ```text
//! [SLACK_PROPERTIES]
//! SLACK_TOKEN = xoxb-...
//! SLACK_USERNAME = gcn-bot
//! SLACK_ICON_URL = https://example.org/icon.png
//! [GENERAL]
//! DEFAULT_CHANNEL = astro-alerts
//! [TOPIC_CHANNEL_MAPPING]
//! gcn.circular = astro-alerts
//! ```
//!
//! Keys accept `=` or `:` as delimiter, `#`/`;` start comments, and keys
//! and values are trimmed. A duplicated section is tolerated: it is
//! reported as a warning and the first occurrence of each key wins.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Errors raised while loading the Slack settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist or could not be opened for reading.
    #[error("Slack configuration file does not appear to exist: {0}")]
    FileNotFound(#[source] std::io::Error),

    /// A required section, or a required key within it, is absent or empty.
    #[error("a required section or key is missing: {0}")]
    MissingSection(String),

    /// The same section header appears more than once. Tolerated: the load
    /// continues and the first occurrence of each key wins.
    #[error("section `{0}` is defined more than once")]
    DuplicateSection(String),

    /// The file could not be tokenized into section/key/value structure.
    #[error("Slack configuration file parsing error at line {line}: {reason}")]
    MalformedFile { line: usize, reason: &'static str },

    /// Any other failure during parsing.
    #[error("error in Slack configuration file: {0}")]
    Other(String),
}

/// Immutable settings used when posting to Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackSettings {
    /// Bearer credential for the Slack API.
    pub token: String,
    /// Display name used when posting.
    pub username: String,
    /// Avatar URL used when posting.
    pub icon_url: String,
    /// Channel name (without the leading `#`) messages are posted to.
    pub default_channel: String,
    /// Topic-to-channel mapping, in file order. Parsed for compatibility
    /// with existing files; posting always targets `default_channel`.
    pub topic_channel_mapping: Vec<(String, String)>,
}

/// The result of a successful load: the settings plus any tolerated
/// errors (currently only [`ConfigError::DuplicateSection`]).
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: SlackSettings,
    pub warnings: Vec<ConfigError>,
}

#[derive(Debug)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl SlackSettings {
    /// Loads and parses the settings file at `path`.
    ///
    /// All error kinds abort the load except `DuplicateSection`, which is
    /// returned in [`LoadedSettings::warnings`]. The loader has no side
    /// effects; reporting tolerated errors is left to the caller.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedSettings, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::FileNotFound)?;
        Self::parse(&text)
    }

    /// Parses settings from file contents.
    pub fn parse(text: &str) -> Result<LoadedSettings, ConfigError> {
        let (sections, warnings) = tokenize(text)?;

        let settings = SlackSettings {
            token: required(&sections, "SLACK_PROPERTIES", "SLACK_TOKEN")?,
            username: required(&sections, "SLACK_PROPERTIES", "SLACK_USERNAME")?,
            icon_url: required(&sections, "SLACK_PROPERTIES", "SLACK_ICON_URL")?,
            default_channel: required(&sections, "GENERAL", "DEFAULT_CHANNEL")?,
            topic_channel_mapping: sections
                .iter()
                .find(|s| s.name == "TOPIC_CHANNEL_MAPPING")
                .map(|s| s.entries.clone())
                .unwrap_or_default(),
        };

        Ok(LoadedSettings { settings, warnings })
    }
}

/// Splits the file into sections of key/value entries, preserving order.
fn tokenize(text: &str) -> Result<(Vec<Section>, Vec<ConfigError>), ConfigError> {
    let mut sections: Vec<Section> = Vec::new();
    let mut warnings = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or(ConfigError::MalformedFile {
                    line: idx + 1,
                    reason: "unterminated section header",
                })?
                .trim();
            if let Some(pos) = sections.iter().position(|s| s.name == name) {
                warnings.push(ConfigError::DuplicateSection(name.to_string()));
                current = Some(pos);
            } else {
                sections.push(Section {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                current = Some(sections.len() - 1);
            }
            continue;
        }

        let Some(section) = current else {
            return Err(ConfigError::MalformedFile {
                line: idx + 1,
                reason: "key/value pair before any section header",
            });
        };
        let Some(delim) = line.find(['=', ':']) else {
            return Err(ConfigError::MalformedFile {
                line: idx + 1,
                reason: "missing `=` or `:` delimiter",
            });
        };
        let key = line[..delim].trim().to_string();
        let value = line[delim + 1..].trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::MalformedFile {
                line: idx + 1,
                reason: "empty key",
            });
        }

        // First occurrence wins, so a duplicated section cannot overwrite
        // values that were already parsed.
        let entries = &mut sections[section].entries;
        if !entries.iter().any(|(k, _)| *k == key) {
            entries.push((key, value));
        }
    }

    Ok((sections, warnings))
}

fn required(sections: &[Section], section: &str, key: &str) -> Result<String, ConfigError> {
    let found = sections
        .iter()
        .find(|s| s.name == section)
        .ok_or_else(|| ConfigError::MissingSection(format!("[{section}]")))?;
    let value = found
        .entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| ConfigError::MissingSection(format!("{key} in [{section}]")))?;
    if value.is_empty() {
        return Err(ConfigError::MissingSection(format!(
            "{key} in [{section}] is empty"
        )));
    }
    Ok(value.to_string())
}
