//! Field descriptors and their classification for one tag.

use std::any::type_name;

use crate::decoder::DecoderConfig;
use crate::shape::{Bindable, Kind, Repr, Shape, StructShape, WriteFn};

/// Tag value that excludes a field.
pub const SKIP: &str = "-";

/// A struct whose fields can be decoded. Usually derived:
///
/// ```ignore
/// #[derive(tagbind::Decode)]
/// struct Server {
///     #[bind(env = "HOST", query = "host")]
///     host: String,
///     #[bind(env = "PORT")]
///     port: u16,
/// }
/// ```
pub trait Decode: Sized + 'static {
    /// Field descriptors in declaration order.
    fn fields() -> Vec<FieldDef<Self>>;
}

/// One field of a [`Decode`] struct: its name, its annotation per tag name,
/// and the shape of its type projected onto the owning struct.
pub struct FieldDef<T> {
    name: &'static str,
    tags: &'static [(&'static str, &'static str)],
    type_name: &'static str,
    shape: Shape<T>,
}

impl<T: 'static> FieldDef<T> {
    pub fn new<V: Bindable>(
        name: &'static str,
        tags: &'static [(&'static str, &'static str)],
        project: fn(&mut T) -> &mut V,
    ) -> Self {
        Self {
            name,
            tags,
            type_name: type_name::<V>(),
            shape: V::shape().project(project),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The raw annotation for `tag`, options included.
    pub fn tag(&self, tag: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, value)| *value)
    }
}

impl<T> std::fmt::Debug for FieldDef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// How keys are chosen for fields that carry no explicit key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyNaming {
    /// Untagged fields are skipped; an empty tag uses the field name as is.
    #[default]
    Tagged,
    /// Untagged fields use `UPPER_SNAKE` names (`max_conns` -> `MAX_CONNS`).
    UpperSnake,
    /// Untagged fields use `lower_snake` names (`MaxConns` -> `max_conns`).
    LowerSnake,
}

impl KeyNaming {
    /// The key derived from a field identifier.
    pub fn key_for(self, ident: &str) -> String {
        match self {
            KeyNaming::Tagged => ident.to_owned(),
            KeyNaming::UpperSnake => split_words(ident).to_uppercase(),
            KeyNaming::LowerSnake => split_words(ident).to_lowercase(),
        }
    }

    fn derives(self) -> bool {
        self != KeyNaming::Tagged
    }
}

// Inserts `_` between a character that is not an uppercase letter or `_` and
// a following uppercase letter.
fn split_words(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev: Option<char> = None;
    for c in ident.chars() {
        if c.is_uppercase() && prev.is_some_and(|p| !p.is_uppercase() && p != '_') {
            out.push('_');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// A parsed tag value: `KEY[,secret]`. Everything before a trailing
/// `,secret` is the key, commas included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagValue<'a> {
    pub key: &'a str,
    pub secret: bool,
}

impl<'a> TagValue<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.strip_suffix(",secret") {
            Some(key) => Self { key, secret: true },
            None => Self {
                key: raw,
                secret: false,
            },
        }
    }

    pub fn is_skip(&self) -> bool {
        self.key == SKIP
    }
}

pub(crate) enum Classified<T> {
    Skip,
    Value {
        key: String,
        secret: bool,
        kind: Kind,
        write: WriteFn<T>,
    },
    Nested(StructShape<T>),
    Unsupported,
}

/// Decides what to do with `field` under `config`.
pub(crate) fn classify<T: 'static>(field: FieldDef<T>, config: &DecoderConfig) -> Classified<T> {
    let tag = field.tag(&config.tag).map(TagValue::parse);
    if tag.is_some_and(|tag| tag.is_skip()) {
        return Classified::Skip;
    }

    match field.shape.0 {
        // Nested structs share the parent's key space; a tag only matters
        // for exclusion.
        Repr::Struct(shape) => Classified::Nested(shape),
        Repr::Value { kind, write } => {
            let (key, secret) = match tag {
                Some(tag) if !tag.key.is_empty() => (tag.key.to_owned(), tag.secret),
                Some(tag) => (config.naming.key_for(field.name), tag.secret),
                None if config.naming.derives() => (config.naming.key_for(field.name), false),
                None => return Classified::Skip,
            };
            Classified::Value {
                key,
                secret,
                kind,
                write,
            }
        }
        Repr::Unsupported if tag.is_none() => Classified::Skip,
        Repr::Unsupported => Classified::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_is_deterministic() {
        let cases = [
            ("Name", "NAME", "name"),
            ("NameName", "NAME_NAME", "name_name"),
            ("max_conns", "MAX_CONNS", "max_conns"),
            ("HTTPServer", "HTTPSERVER", "httpserver"),
            ("httpServer", "HTTP_SERVER", "http_server"),
            ("port2Http", "PORT2_HTTP", "port2_http"),
            ("already_Split", "ALREADY_SPLIT", "already_split"),
        ];
        for (ident, upper, lower) in cases {
            assert_eq!(KeyNaming::UpperSnake.key_for(ident), upper, "{ident}");
            assert_eq!(KeyNaming::LowerSnake.key_for(ident), lower, "{ident}");
            assert_eq!(KeyNaming::Tagged.key_for(ident), ident);
        }
    }

    #[test]
    fn tag_value_options() {
        assert_eq!(
            TagValue::parse("HOST"),
            TagValue {
                key: "HOST",
                secret: false
            }
        );
        assert_eq!(
            TagValue::parse("PASS,secret"),
            TagValue {
                key: "PASS",
                secret: true
            }
        );
        assert_eq!(
            TagValue::parse(",secret"),
            TagValue {
                key: "",
                secret: true
            }
        );
        assert_eq!(
            TagValue::parse("Name,Comma"),
            TagValue {
                key: "Name,Comma",
                secret: false
            }
        );
        assert_eq!(
            TagValue::parse("Name,Comma,secret"),
            TagValue {
                key: "Name,Comma",
                secret: true
            }
        );
        assert_eq!(
            TagValue::parse("PASS,secret,x"),
            TagValue {
                key: "PASS,secret,x",
                secret: false
            }
        );
        assert!(TagValue::parse("-").is_skip());
        assert!(!TagValue::parse("-x").is_skip());
    }

    struct Row {
        id: u32,
        blob: Vec<String>,
    }

    fn id_field() -> FieldDef<Row> {
        FieldDef::new::<u32>("id", &[("db", "ID"), ("q", "")], |row| &mut row.id)
    }

    fn blob_field() -> FieldDef<Row> {
        FieldDef::new::<Vec<String>>("blob", &[("db", "BLOB")], |row| &mut row.blob)
    }

    fn key_of(classified: Classified<Row>) -> Option<String> {
        match classified {
            Classified::Value { key, .. } => Some(key),
            _ => None,
        }
    }

    #[test]
    fn classify_by_tag_and_naming() {
        let db = DecoderConfig::new("db");
        assert_eq!(key_of(classify(id_field(), &db)).as_deref(), Some("ID"));

        let q = DecoderConfig::new("q").naming(KeyNaming::UpperSnake);
        assert_eq!(key_of(classify(id_field(), &q)).as_deref(), Some("ID"));

        let other = DecoderConfig::new("other");
        assert!(matches!(classify(id_field(), &other), Classified::Skip));

        let derived = DecoderConfig::new("other").naming(KeyNaming::LowerSnake);
        assert_eq!(key_of(classify(id_field(), &derived)).as_deref(), Some("id"));
    }

    #[test]
    fn unsupported_only_when_tagged() {
        let db = DecoderConfig::new("db");
        assert!(matches!(classify(blob_field(), &db), Classified::Unsupported));

        let derived = DecoderConfig::new("env").naming(KeyNaming::UpperSnake);
        assert!(matches!(classify(blob_field(), &derived), Classified::Skip));
    }

    #[test]
    fn field_def_reports_type() {
        let field = blob_field();
        assert_eq!(field.name(), "blob");
        assert_eq!(field.tag("db"), Some("BLOB"));
        assert_eq!(field.tag("env"), None);
        assert!(field.type_name().contains("Vec<alloc::string::String>"));
    }
}
