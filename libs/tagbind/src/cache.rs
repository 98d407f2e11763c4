use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::decoder::DecoderConfig;
use crate::error::Error;
use crate::plan::CompiledPlan;
use crate::shape::Bindable;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanKey {
    type_id: TypeId,
    config: DecoderConfig,
}

#[derive(Clone)]
enum Entry {
    Plan(Arc<dyn Any + Send + Sync>),
    /// The type has nothing to decode for this tag.
    NoFields { type_name: &'static str },
}

/// Snapshot of cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Compiled plans keyed by target type and decoder configuration.
///
/// Lookups and inserts are safe from any number of threads. Two threads
/// missing on the same key both compile and the last insert wins; plans are
/// pure functions of their key, so either result is correct.
#[derive(Default)]
pub struct PlanCache {
    entries: DashMap<PlanKey, Entry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached plan for `T`, compiling and storing it on a miss.
    ///
    /// Compile errors are not stored, except the no-fields condition which is
    /// remembered and reported again on every later lookup.
    pub fn get_or_compile<T: Bindable>(
        &self,
        config: &DecoderConfig,
    ) -> Result<Arc<CompiledPlan<T>>, Error> {
        let key = PlanKey {
            type_id: TypeId::of::<T>(),
            config: config.clone(),
        };

        let cached = self.entries.get(&key).map(|entry| entry.value().clone());
        match cached {
            Some(Entry::Plan(plan)) => {
                if let Ok(plan) = plan.downcast::<CompiledPlan<T>>() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(plan);
                }
            }
            Some(Entry::NoFields { type_name }) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Err(Error::NoDecodableFields {
                    type_name,
                    tag: config.tag.to_string(),
                });
            }
            None => {}
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match CompiledPlan::<T>::compile(config) {
            Ok(plan) => {
                let plan = Arc::new(plan);
                self.entries.insert(key, Entry::Plan(plan.clone()));
                Ok(plan)
            }
            Err(err @ Error::NoDecodableFields { type_name, .. }) => {
                tracing::debug!(
                    target_type = type_name,
                    tag = %config.tag,
                    "no decodable fields, caching sentinel"
                );
                self.entries.insert(key, Entry::NoFields { type_name });
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// True if a plan or sentinel is stored for `T` under `config`.
    pub fn contains<T: Bindable>(&self, config: &DecoderConfig) -> bool {
        self.entries.contains_key(&PlanKey {
            type_id: TypeId::of::<T>(),
            config: config.clone(),
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{Decode, FieldDef};
    use crate::shape::Shape;

    struct Tagged {
        port: u16,
    }

    impl Decode for Tagged {
        fn fields() -> Vec<FieldDef<Self>> {
            vec![FieldDef::new::<u16>("port", &[("env", "PORT")], |s| &mut s.port)]
        }
    }

    impl Bindable for Tagged {
        fn shape() -> Shape<Self> {
            Shape::structure()
        }
    }

    #[test]
    fn hit_after_first_compile() {
        let cache = PlanCache::new();
        let config = DecoderConfig::new("env");

        let first = cache.get_or_compile::<Tagged>(&config).unwrap();
        let second = cache.get_or_compile::<Tagged>(&config).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn tags_are_cached_separately() {
        let cache = PlanCache::new();
        let env = DecoderConfig::new("env");
        let query = DecoderConfig::new("query");

        assert!(cache.get_or_compile::<Tagged>(&env).is_ok());
        let err = cache.get_or_compile::<Tagged>(&query).unwrap_err();
        assert!(err.is_no_fields());

        assert!(cache.contains::<Tagged>(&env));
        assert!(cache.contains::<Tagged>(&query));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn structure_errors_are_not_cached() {
        let cache = PlanCache::new();
        let config = DecoderConfig::new("env");

        for _ in 0..2 {
            let err = cache.get_or_compile::<u32>(&config).unwrap_err();
            assert!(matches!(err, Error::Structure { .. }));
        }
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }
}
