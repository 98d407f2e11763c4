#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no parser for file extension '{0}'")]
    UnsupportedFormat(String),

    #[error("layer '{layer}': {source}")]
    Layer {
        layer: String,
        #[source]
        source: tagbind::Error,
    },
}

impl ConfigError {
    /// Add context to the error.
    ///
    /// For `Config`, context is prepended to the message. Other variants
    /// already name what failed and are returned unchanged.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            ConfigError::Config(msg) => ConfigError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// The decode error of a failed layer, if any.
    pub fn decode_error(&self) -> Option<&tagbind::Error> {
        match self {
            ConfigError::Layer { source, .. } => Some(source),
            _ => None,
        }
    }
}
