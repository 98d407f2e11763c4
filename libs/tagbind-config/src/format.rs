use crate::error::ConfigError;

/// Parses the content of a config file into a generic value tree, which is
/// then deserialized into the target type.
pub trait FormatParser: Send + Sync {
    /// File extensions handled by this parser, lowercase and without the dot.
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<serde_json::Value, ConfigError>;
}

pub struct TomlParser;

impl FormatParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Config(e.to_string()))
    }
}

pub struct JsonParser;

impl FormatParser for JsonParser {
    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Config(e.to_string()))
    }
}
