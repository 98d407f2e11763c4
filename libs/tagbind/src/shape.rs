//! How a field type is written from text.
//!
//! Every type usable as a field implements [`Bindable`] and reports its
//! [`Shape`]: a built-in value kind with a writer, a nested struct with a plan
//! compiler, or unsupported. `Option` and `Box` wrap the shape of their inner
//! type, so the hook and nested structs work through pointer wrappers too.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::mpsc;

use crate::coerce::{self, BoxError, CoerceError, ParseText};
use crate::decoder::DecoderConfig;
use crate::error::Error;
use crate::introspect::Decode;
use crate::plan::{Compiled, Plan};

/// Bit width of a numeric kind. `Native` is `isize`/`usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
    Native,
}

/// Classification of a compiled field rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Str,
    Int(Width),
    Uint(Width),
    Float(Width),
    Bool,
    Bytes,
    /// The type parses itself ([`ParseText`] or `FromStr`).
    Text,
    Struct,
}

pub(crate) type WriteFn<V> = Box<dyn Fn(&mut V, &str) -> Result<(), CoerceError> + Send + Sync>;

/// Compiles a nested plan. The slice holds the struct types whose plans are
/// being compiled further up, outermost first.
pub(crate) type CompileFn<V> =
    Box<dyn Fn(&DecoderConfig, &mut Vec<TypeId>) -> Result<Compiled<V>, Error> + Send + Sync>;

/// A type that can be the target of a field rule.
pub trait Bindable: Sized + 'static {
    fn shape() -> Shape<Self>;
}

/// Describes how values of `V` are decoded. Built through the constructors
/// below and consumed when a plan is compiled.
pub struct Shape<V>(pub(crate) Repr<V>);

pub(crate) enum Repr<V> {
    Value { kind: Kind, write: WriteFn<V> },
    Struct(StructShape<V>),
    Unsupported,
}

pub(crate) struct StructShape<V> {
    pub(crate) type_name: &'static str,
    pub(crate) type_id: TypeId,
    /// The struct sits behind an `Option` and is allocated on first write.
    pub(crate) pointer: bool,
    pub(crate) compile: CompileFn<V>,
}

impl<V: 'static> Shape<V> {
    pub(crate) fn value<F>(kind: Kind, write: F) -> Self
    where
        F: Fn(&mut V, &str) -> Result<(), CoerceError> + Send + Sync + 'static,
    {
        Shape(Repr::Value {
            kind,
            write: Box::new(write),
        })
    }

    /// Fields of this type fail plan compilation when tagged.
    pub fn unsupported() -> Self {
        Shape(Repr::Unsupported)
    }

    /// Decode through the type's own [`ParseText`] implementation.
    pub fn text() -> Self
    where
        V: ParseText,
    {
        Self::value(Kind::Text, |slot: &mut V, text: &str| {
            slot.parse_text(text.as_bytes())
                .map_err(|e| CoerceError::Text {
                    value: text.to_owned(),
                    source: e.into(),
                })
        })
    }

    /// Decode through the type's `FromStr` implementation.
    pub fn parsed() -> Self
    where
        V: FromStr,
        V::Err: Into<BoxError>,
    {
        Self::value(Kind::Text, |slot: &mut V, text: &str| {
            *slot = coerce::parse_from_str(text)?;
            Ok(())
        })
    }

    /// Decode as a nested struct using its derived field list.
    pub fn structure() -> Self
    where
        V: Decode,
    {
        Shape(Repr::Struct(StructShape {
            type_name: type_name::<V>(),
            type_id: TypeId::of::<V>(),
            pointer: false,
            compile: Box::new(|config, compiling| {
                Plan::<V>::compile(config, compiling).map(Compiled::direct)
            }),
        }))
    }

    /// The value kind, or `None` for nested and unsupported shapes.
    pub fn kind(&self) -> Option<Kind> {
        match &self.0 {
            Repr::Value { kind, .. } => Some(*kind),
            Repr::Struct(_) => Some(Kind::Struct),
            Repr::Unsupported => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.0, Repr::Struct(_))
    }

    /// Re-targets the shape at a field of `T` reached through `project`.
    pub(crate) fn project<T: 'static>(self, project: fn(&mut T) -> &mut V) -> Shape<T> {
        Shape(match self.0 {
            Repr::Value { kind, write } => Repr::Value {
                kind,
                write: Box::new(move |target: &mut T, text: &str| write(project(target), text)),
            },
            Repr::Struct(inner) => Repr::Struct(StructShape {
                type_name: inner.type_name,
                type_id: inner.type_id,
                pointer: inner.pointer,
                compile: Box::new(move |config, compiling| {
                    (inner.compile)(config, compiling).map(|compiled| compiled.project(project))
                }),
            }),
            Repr::Unsupported => Repr::Unsupported,
        })
    }

    fn optional(self) -> Shape<Option<V>>
    where
        V: Default,
    {
        Shape(match self.0 {
            Repr::Value { kind, write } => Repr::Value {
                kind,
                write: Box::new(move |slot: &mut Option<V>, text: &str| match slot {
                    Some(value) => write(value, text),
                    None => {
                        let mut value = V::default();
                        write(&mut value, text)?;
                        *slot = Some(value);
                        Ok(())
                    }
                }),
            },
            Repr::Struct(inner) => Repr::Struct(StructShape {
                type_name: inner.type_name,
                type_id: inner.type_id,
                pointer: true,
                compile: Box::new(move |config, compiling| {
                    (inner.compile)(config, compiling).map(Compiled::optional)
                }),
            }),
            Repr::Unsupported => Repr::Unsupported,
        })
    }

    fn boxed(self) -> Shape<Box<V>> {
        self.project::<Box<V>>(|slot| &mut **slot)
    }
}

impl Bindable for String {
    fn shape() -> Shape<Self> {
        Shape::value(Kind::Str, |slot: &mut String, text: &str| {
            text.clone_into(slot);
            Ok(())
        })
    }
}

macro_rules! bind_int {
    ($variant:ident: $($ty:ty => $width:ident),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn shape() -> Shape<Self> {
                    Shape::value(Kind::$variant(Width::$width), |slot: &mut $ty, text: &str| {
                        *slot = coerce::parse_int(text)?;
                        Ok(())
                    })
                }
            }
        )*
    };
}

bind_int!(Int: i8 => W8, i16 => W16, i32 => W32, i64 => W64, isize => Native);
bind_int!(Uint: u8 => W8, u16 => W16, u32 => W32, u64 => W64, usize => Native);

impl Bindable for f32 {
    fn shape() -> Shape<Self> {
        Shape::value(Kind::Float(Width::W32), |slot: &mut f32, text: &str| {
            *slot = coerce::parse_f32(text)?;
            Ok(())
        })
    }
}

impl Bindable for f64 {
    fn shape() -> Shape<Self> {
        Shape::value(Kind::Float(Width::W64), |slot: &mut f64, text: &str| {
            *slot = coerce::parse_f64(text)?;
            Ok(())
        })
    }
}

impl Bindable for bool {
    fn shape() -> Shape<Self> {
        Shape::value(Kind::Bool, |slot: &mut bool, text: &str| {
            *slot = coerce::parse_bool(text)?;
            Ok(())
        })
    }
}

// Only `Vec<u8>` is decodable; other element types need the text hook.
impl<T: 'static> Bindable for Vec<T> {
    fn shape() -> Shape<Self> {
        if TypeId::of::<T>() != TypeId::of::<u8>() {
            return Shape::unsupported();
        }
        Shape::value(Kind::Bytes, |slot: &mut Vec<T>, text: &str| {
            if let Some(bytes) = (slot as &mut dyn Any).downcast_mut::<Vec<u8>>() {
                *bytes = text.as_bytes().to_vec();
            }
            Ok(())
        })
    }
}

impl<V: Bindable + Default> Bindable for Option<V> {
    fn shape() -> Shape<Self> {
        V::shape().optional()
    }
}

impl<V: Bindable> Bindable for Box<V> {
    fn shape() -> Shape<Self> {
        V::shape().boxed()
    }
}

macro_rules! bind_parsed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn shape() -> Shape<Self> {
                    Shape::parsed()
                }
            }
        )*
    };
}

bind_parsed!(char, PathBuf, IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr);

macro_rules! bind_unsupported {
    ($($ty:ty => [$($param:ident),*]),* $(,)?) => {
        $(
            impl<$($param: 'static),*> Bindable for $ty {
                fn shape() -> Shape<Self> {
                    Shape::unsupported()
                }
            }
        )*
    };
}

bind_unsupported!(
    HashMap<K, V, S> => [K, V, S],
    BTreeMap<K, V> => [K, V],
    HashSet<T, S> => [T, S],
    BTreeSet<T> => [T],
    VecDeque<T> => [T],
    mpsc::Sender<T> => [T],
    mpsc::Receiver<T> => [T],
);
