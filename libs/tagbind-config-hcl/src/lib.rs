use tagbind_config::{ConfigError, FormatParser};

pub struct HclParser;

impl FormatParser for HclParser {
    fn extensions(&self) -> &[&str] {
        &["hcl"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, ConfigError> {
        hcl::from_str(content).map_err(|e| ConfigError::Config(e.to_string()))
    }
}
