//! Compiled decode plans.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use crate::decoder::DecoderConfig;
use crate::error::Error;
use crate::introspect::{self, Classified, Decode};
use crate::shape::{Bindable, Kind, Repr, WriteFn};
use crate::source::Source;

/// Runs one rule (or a whole nested plan) against a target. Returns whether
/// anything was written.
pub(crate) type Exec<T> = Box<dyn Fn(&mut T, &dyn Source) -> Result<bool, Error> + Send + Sync>;

/// Description of one compiled field rule.
#[derive(Debug)]
pub struct FieldRule {
    field: &'static str,
    key: Option<String>,
    kind: Kind,
    secret: bool,
    nested: Option<Arc<Outline>>,
}

impl FieldRule {
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The source key; `None` for nested struct rules.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn nested(&self) -> Option<&Outline> {
        self.nested.as_deref()
    }
}

/// The rules of one struct type, in execution order.
#[derive(Debug)]
pub struct Outline {
    type_name: &'static str,
    rules: Vec<FieldRule>,
}

impl Outline {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a FieldRule>) {
        for rule in &self.rules {
            match &rule.nested {
                Some(nested) => nested.collect_values(out),
                None => out.push(rule),
            }
        }
    }
}

/// Rules for one struct type paired with their executors.
pub(crate) struct Plan<T> {
    outline: Arc<Outline>,
    steps: Vec<Exec<T>>,
}

impl<T: Decode> Plan<T> {
    /// Compiles the rules of `T`. `compiling` holds the enclosing struct
    /// types; a field that leads back to one of them is rejected.
    pub(crate) fn compile(
        config: &DecoderConfig,
        compiling: &mut Vec<TypeId>,
    ) -> Result<Self, Error> {
        compiling.push(TypeId::of::<T>());
        let plan = Self::compile_fields(config, compiling);
        compiling.pop();
        plan
    }

    fn compile_fields(
        config: &DecoderConfig,
        compiling: &mut Vec<TypeId>,
    ) -> Result<Self, Error> {
        let owner = type_name::<T>();
        let mut rules = Vec::new();
        let mut steps = Vec::new();

        for field in T::fields() {
            let name = field.name();
            let field_type = field.type_name();

            match introspect::classify(field, config) {
                Classified::Skip => {}
                Classified::Value {
                    key,
                    secret,
                    kind,
                    write,
                } => {
                    steps.push(value_step(owner, name, key.clone(), secret, write));
                    rules.push(FieldRule {
                        field: name,
                        key: Some(key),
                        kind,
                        secret,
                        nested: None,
                    });
                }
                Classified::Nested(shape) if compiling.contains(&shape.type_id) => {
                    return Err(Error::RecursiveField {
                        type_name: owner,
                        field: name,
                        field_type,
                    });
                }
                Classified::Nested(shape) => match (shape.compile)(config, compiling) {
                    Ok(compiled) => {
                        steps.push(compiled.exec);
                        rules.push(FieldRule {
                            field: name,
                            key: None,
                            kind: Kind::Struct,
                            secret: false,
                            nested: Some(compiled.outline),
                        });
                    }
                    // A nested struct with nothing to decode contributes no rule.
                    Err(err) if err.is_no_fields() => {
                        tracing::trace!(
                            owner,
                            field = name,
                            nested = shape.type_name,
                            "nested struct has no fields for tag"
                        );
                    }
                    Err(err) => return Err(err),
                },
                Classified::Unsupported => {
                    return Err(Error::UnsupportedField {
                        type_name: owner,
                        field: name,
                        field_type,
                    });
                }
            }
        }

        if rules.is_empty() {
            return Err(Error::NoDecodableFields {
                type_name: owner,
                tag: config.tag.to_string(),
            });
        }

        Ok(Plan {
            outline: Arc::new(Outline {
                type_name: owner,
                rules,
            }),
            steps,
        })
    }
}

impl<T> Plan<T> {
    fn execute(&self, target: &mut T, source: &dyn Source) -> Result<bool, Error> {
        let mut written = false;
        for step in &self.steps {
            written |= step(target, source)?;
        }
        Ok(written)
    }
}

fn value_step<T: 'static>(
    owner: &'static str,
    field: &'static str,
    key: String,
    secret: bool,
    write: WriteFn<T>,
) -> Exec<T> {
    Box::new(move |target: &mut T, source: &dyn Source| {
        let Some(text) = source.get(&key).filter(|text| !text.is_empty()) else {
            return Ok(false);
        };
        write(target, &text).map_err(|err| Error::Coercion {
            type_name: owner,
            field,
            key: key.clone(),
            source: err,
        })?;
        if secret {
            tracing::trace!(owner, field, key = %key, "decoded secret field");
        } else {
            tracing::trace!(owner, field, key = %key, value = %text, "decoded field");
        }
        Ok(true)
    })
}

/// A struct plan re-targeted at some value that contains the struct.
pub(crate) struct Compiled<V> {
    pub(crate) outline: Arc<Outline>,
    pub(crate) exec: Exec<V>,
}

impl<V: 'static> Compiled<V> {
    pub(crate) fn direct(plan: Plan<V>) -> Self {
        Compiled {
            outline: Arc::clone(&plan.outline),
            exec: Box::new(move |target, source| plan.execute(target, source)),
        }
    }

    pub(crate) fn project<T: 'static>(self, project: fn(&mut T) -> &mut V) -> Compiled<T> {
        let exec = self.exec;
        Compiled {
            outline: self.outline,
            exec: Box::new(move |target, source| exec(project(target), source)),
        }
    }

    /// Allocates the pointee only when a nested rule writes. If a rule fails
    /// after an earlier one wrote, the partial value is kept.
    pub(crate) fn optional(self) -> Compiled<Option<V>>
    where
        V: Default,
    {
        let exec = self.exec;
        Compiled {
            outline: self.outline,
            exec: Box::new(move |slot: &mut Option<V>, source: &dyn Source| {
                if let Some(value) = slot.as_mut() {
                    return exec(value, source);
                }
                let mut value = V::default();
                let result = exec(&mut value, source);
                if !matches!(result, Ok(false)) {
                    *slot = Some(value);
                }
                result
            }),
        }
    }
}

/// The executable plan for a decode target type `T`, shared through the
/// plan cache. `T` is a derived struct or a pointer wrapper around one.
pub struct CompiledPlan<T> {
    tag: Arc<str>,
    pointer: bool,
    outline: Arc<Outline>,
    exec: Exec<T>,
}

impl<T: Bindable> CompiledPlan<T> {
    pub(crate) fn compile(config: &DecoderConfig) -> Result<Self, Error> {
        let Repr::Struct(shape) = T::shape().0 else {
            return Err(Error::Structure {
                type_name: type_name::<T>(),
                reason: "decode target must be a struct",
            });
        };
        let Compiled { outline, exec } = (shape.compile)(config, &mut Vec::new())?;
        tracing::debug!(
            target_type = type_name::<T>(),
            tag = %config.tag,
            rules = outline.rules.len(),
            "compiled decode plan"
        );
        Ok(CompiledPlan {
            tag: config.tag.clone(),
            pointer: shape.pointer,
            outline,
            exec,
        })
    }
}

impl<T> CompiledPlan<T> {
    /// Runs every rule in declaration order, stopping at the first error.
    /// Fields written before the failing rule keep their new values.
    pub fn execute(&self, source: &dyn Source, target: &mut T) -> Result<(), Error> {
        (self.exec)(target, source).map(|_| ())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// True if the root struct sits behind an `Option` that is allocated on
    /// first write.
    pub fn is_pointer(&self) -> bool {
        self.pointer
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Top-level rules, nested structs included as single entries.
    pub fn rules(&self) -> &[FieldRule] {
        &self.outline.rules
    }

    /// Every value rule, depth-first through nested structs.
    pub fn value_rules(&self) -> Vec<&FieldRule> {
        let mut out = Vec::new();
        self.outline.collect_values(&mut out);
        out
    }

    /// Every key the plan reads, in execution order.
    pub fn keys(&self) -> Vec<&str> {
        self.value_rules()
            .into_iter()
            .filter_map(FieldRule::key)
            .collect()
    }
}

impl<T> std::fmt::Debug for CompiledPlan<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPlan")
            .field("tag", &self.tag)
            .field("pointer", &self.pointer)
            .field("outline", &self.outline)
            .finish()
    }
}
