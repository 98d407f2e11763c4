use std::any::type_name;
use std::path::Path;

use serde::de::DeserializeOwned;
use tagbind::{Bindable, Decoder, Source};
use tagbind_env::Loader;

use crate::error::ConfigError;
use crate::format::{FormatParser, JsonParser, TomlParser};

struct Layer {
    name: String,
    decoder: Decoder,
    source: Box<dyn Source + Send + Sync>,
}

/// Reads configuration from a file and then applies ordered override
/// layers, each a decoder paired with the source it reads.
///
/// ```ignore
/// let reader = ConfigReader::new()
///     .with_env(Loader::new().with_prefix("APP_"))
///     .with_layer("query", Decoder::new("query"), Query::parse(raw));
///
/// let mut config = AppConfig::default();
/// reader.read_file("app.toml", &mut config)?;
/// ```
pub struct ConfigReader {
    layers: Vec<Layer>,
    parsers: Vec<Box<dyn FormatParser>>,
}

impl ConfigReader {
    /// A reader with no layers that understands `.toml` and `.json` files.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            parsers: vec![
                Box::new(TomlParser) as Box<dyn FormatParser>,
                Box::new(JsonParser),
            ],
        }
    }

    /// Appends a layer. Layers run in the order they were added, so later
    /// layers override earlier ones.
    pub fn with_layer(
        mut self,
        name: impl Into<String>,
        decoder: Decoder,
        source: impl Source + Send + Sync + 'static,
    ) -> Self {
        self.layers.push(Layer {
            name: name.into(),
            decoder,
            source: Box::new(source),
        });
        self
    }

    /// Appends the environment as a layer named `env`.
    pub fn with_env(self, loader: Loader) -> Self {
        let decoder = loader.decoder().clone();
        self.with_layer(tagbind_env::TAG, decoder, loader)
    }

    /// Registers a parser. It takes precedence over earlier parsers for the
    /// same extensions.
    pub fn with_parser(mut self, parser: impl FormatParser + 'static) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    pub fn layers(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }

    /// Applies every layer to `target`.
    ///
    /// A layer whose tag matches none of the fields of `T` is skipped. Any
    /// other decode error stops the read.
    pub fn read<T: Bindable>(&self, target: &mut T) -> Result<(), ConfigError> {
        for layer in &self.layers {
            match layer.decoder.decode(&*layer.source, target) {
                Ok(()) => {
                    tracing::trace!(
                        layer = %layer.name,
                        target_type = type_name::<T>(),
                        "applied layer"
                    );
                }
                Err(e) if e.is_no_fields() => {
                    tracing::debug!(
                        layer = %layer.name,
                        target_type = type_name::<T>(),
                        "layer has no fields for type, skipping"
                    );
                }
                Err(source) => {
                    return Err(ConfigError::Layer {
                        layer: layer.name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Replaces `target` with the content of `path`, then applies the layers.
    ///
    /// The parser is chosen by file extension, case-insensitively.
    pub fn read_file<T>(&self, path: impl AsRef<Path>, target: &mut T) -> Result<(), ConfigError>
    where
        T: Bindable + DeserializeOwned,
    {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Config(format!("{}: {e}", path.display())))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let parser = self
            .parser_for(&extension)
            .ok_or_else(|| ConfigError::UnsupportedFormat(extension.clone()))?;

        let value = parser
            .parse(&content)
            .map_err(|e| e.with_context(path.display()))?;
        *target = serde_json::from_value(value)
            .map_err(|e| ConfigError::Config(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), format = %extension, "read config file");
        self.read(target)
    }

    fn parser_for(&self, extension: &str) -> Option<&dyn FormatParser> {
        self.parsers
            .iter()
            .rev()
            .find(|parser| parser.extensions().contains(&extension))
            .map(|parser| &**parser)
    }
}

impl Default for ConfigReader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let extensions: Vec<&str> = self
            .parsers
            .iter()
            .flat_map(|parser| parser.extensions().iter().copied())
            .collect();
        f.debug_struct("ConfigReader")
            .field("layers", &self.layers().collect::<Vec<_>>())
            .field("extensions", &extensions)
            .finish()
    }
}
