use std::sync::Arc;

use crate::cache::PlanCache;
use crate::error::Error;
use crate::introspect::KeyNaming;
use crate::plan::CompiledPlan;
use crate::shape::Bindable;
use crate::source::Source;

/// Which annotations a decoder reads and how it names untagged fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecoderConfig {
    pub tag: Arc<str>,
    pub naming: KeyNaming,
}

impl DecoderConfig {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self {
            tag: tag.into(),
            naming: KeyNaming::Tagged,
        }
    }

    pub fn naming(mut self, naming: KeyNaming) -> Self {
        self.naming = naming;
        self
    }
}

/// Decodes any bindable struct, compiling plans on first use and caching
/// them.
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecoderConfig,
    cache: Arc<PlanCache>,
}

impl Decoder {
    /// A decoder reading `#[bind(<tag> = "...")]` annotations with its own
    /// plan cache.
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self::from_config(DecoderConfig::new(tag))
    }

    pub fn from_config(config: DecoderConfig) -> Self {
        Self {
            config,
            cache: Arc::new(PlanCache::new()),
        }
    }

    pub fn with_naming(mut self, naming: KeyNaming) -> Self {
        self.config.naming = naming;
        self
    }

    /// Shares `cache` with other decoders. Entries are keyed by tag and
    /// naming, so decoders with different configurations do not collide.
    pub fn with_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<PlanCache> {
        &self.cache
    }

    /// Decodes `source` into `target`.
    ///
    /// Rules run in field declaration order and stop at the first error;
    /// fields decoded before the failure keep their new values. Keys missing
    /// from `source` leave their fields untouched.
    ///
    /// A type with no fields for this decoder's tag is an error
    /// ([`Error::NoDecodableFields`]), not a silent no-op. The outcome is
    /// cached, so repeated calls stay cheap; callers that aggregate several
    /// decoders can ignore it through [`Error::is_no_fields`].
    pub fn decode<T: Bindable>(&self, source: &dyn Source, target: &mut T) -> Result<(), Error> {
        self.plan::<T>()?.execute(source, target)
    }

    /// The cached plan for `T`, compiled on first request.
    pub fn plan<T: Bindable>(&self) -> Result<Arc<CompiledPlan<T>>, Error> {
        self.cache.get_or_compile::<T>(&self.config)
    }

    /// A decoder bound to `T` that skips the cache lookup on every call.
    pub fn typed<T: Bindable>(&self) -> Result<TypedDecoder<T>, Error> {
        Ok(TypedDecoder {
            plan: self.plan::<T>()?,
        })
    }
}

/// A decoder with a pre-compiled plan for one type.
pub struct TypedDecoder<T> {
    plan: Arc<CompiledPlan<T>>,
}

impl<T: Bindable> TypedDecoder<T> {
    /// Compiles the plan for `T` without going through a cache. A type with
    /// no fields for the tag is an error here.
    pub fn new(config: &DecoderConfig) -> Result<Self, Error> {
        Ok(Self {
            plan: Arc::new(CompiledPlan::compile(config)?),
        })
    }

    /// Decodes into `target`, which may be a field of a larger value that
    /// is already allocated.
    pub fn decode(&self, source: &dyn Source, target: &mut T) -> Result<(), Error> {
        self.plan.execute(source, target)
    }

    pub fn plan(&self) -> &CompiledPlan<T> {
        &self.plan
    }
}

impl<T> Clone for TypedDecoder<T> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
        }
    }
}

impl<T> std::fmt::Debug for TypedDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedDecoder")
            .field("plan", &self.plan)
            .finish()
    }
}
