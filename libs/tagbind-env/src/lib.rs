//! Loads structs from environment variables.
//!
//! Fields are read with the `env` tag. Untagged fields map to their
//! `UPPER_SNAKE` name, so most structs need no annotations at all:
//!
//! ```ignore
//! #[derive(tagbind::Decode, Default)]
//! struct Database {
//!     host: String,                  // APP_HOST
//!     #[bind(env = "DB_PORT")]
//!     port: u16,                     // APP_DB_PORT
//!     #[bind(env = ",secret")]
//!     password: String,              // APP_PASSWORD, never logged
//!     #[bind(env = "-")]
//!     pool: Option<u32>,             // not read
//! }
//!
//! let mut db = Database::default();
//! tagbind_env::Loader::new().with_prefix("APP_").load(&mut db)?;
//! ```

use std::any::type_name;
use std::borrow::Cow;
use std::sync::Arc;

use tagbind::source::{FnSource, Prefixed};
use tagbind::{Bindable, Decoder, DecoderConfig, KeyNaming, PlanCache, Source, TagValue};

/// Tag read by a default [`Loader`].
pub const TAG: &str = "env";

/// Looks up one variable by its full (prefixed) name.
pub type LookupFn = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("env{}: {source}", prefix_suffix(.prefix))]
    Load {
        prefix: String,
        #[source]
        source: tagbind::Error,
    },
}

fn prefix_suffix(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!(" ({prefix}*)")
    }
}

impl EnvError {
    pub fn is_no_fields(&self) -> bool {
        match self {
            EnvError::Load { source, .. } => source.is_no_fields(),
        }
    }

    /// The full variable name whose value failed to convert.
    pub fn variable(&self) -> Option<String> {
        match self {
            EnvError::Load { prefix, source } => source.key().map(|key| format!("{prefix}{key}")),
        }
    }

    pub fn into_inner(self) -> tagbind::Error {
        match self {
            EnvError::Load { source, .. } => source,
        }
    }
}

/// Environment loader with an optional variable prefix and a replaceable
/// lookup function.
pub struct Loader {
    source: Prefixed<FnSource<LookupFn>>,
    decoder: Decoder,
}

impl Loader {
    /// A loader over the process environment with no prefix.
    pub fn new() -> Self {
        let lookup: LookupFn = Box::new(|name: &str| std::env::var(name).ok());
        Self {
            source: Prefixed::new("", FnSource(lookup)),
            decoder: Decoder::from_config(config_for(TAG)),
        }
    }

    /// Prepends `prefix` to every variable name.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let lookup = self.source.into_inner();
        self.source = Prefixed::new(prefix, lookup);
        self
    }

    /// Reads variables through `lookup` instead of the process environment.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let prefix = self.source.prefix().to_owned();
        self.source = Prefixed::new(prefix, FnSource(Box::new(lookup) as LookupFn));
        self
    }

    /// Reads `#[bind(<tag> = "...")]` instead of `env`.
    pub fn with_tag(mut self, tag: &str) -> Self {
        let cache = Arc::clone(self.decoder.cache());
        self.decoder = Decoder::from_config(config_for(tag)).with_cache(cache);
        self
    }

    pub fn with_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.decoder = self.decoder.with_cache(cache);
        self
    }

    pub fn prefix(&self) -> &str {
        self.source.prefix()
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Fills `target` from the environment. Variables that are unset or
    /// empty leave their fields untouched.
    pub fn load<T: Bindable>(&self, target: &mut T) -> Result<(), EnvError> {
        self.decoder
            .decode(&self.source, target)
            .map_err(|source| self.error(source))?;
        tracing::debug!(
            target_type = type_name::<T>(),
            prefix = self.prefix(),
            "loaded environment"
        );
        Ok(())
    }

    /// Full variable names `load::<T>` reads, in order.
    pub fn variables<T: Bindable>(&self) -> Result<Vec<String>, EnvError> {
        let plan = self.decoder.plan::<T>().map_err(|source| self.error(source))?;
        Ok(plan
            .keys()
            .into_iter()
            .map(|key| format!("{}{key}", self.prefix()))
            .collect())
    }

    fn error(&self, source: tagbind::Error) -> EnvError {
        EnvError::Load {
            prefix: self.prefix().to_owned(),
            source,
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("prefix", &self.prefix())
            .field("decoder", &self.decoder)
            .finish()
    }
}

/// A loader is also a source: keys are looked up under its prefix.
impl Source for Loader {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.source.get(key)
    }
}

fn config_for(tag: &str) -> DecoderConfig {
    DecoderConfig::new(tag).naming(KeyNaming::UpperSnake)
}

/// The variable name (without prefix) and secret flag for a field named
/// `field` annotated with `tag`.
pub fn name_for(field: &str, tag: &str) -> (String, bool) {
    let tag = TagValue::parse(tag);
    let name = if tag.key.is_empty() {
        KeyNaming::UpperSnake.key_for(field)
    } else {
        tag.key.to_owned()
    };
    (name, tag.secret)
}
