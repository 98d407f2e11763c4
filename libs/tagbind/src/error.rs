use crate::coerce::CoerceError;

/// Error returned by plan compilation and decoding.
///
/// `Structure`, `UnsupportedField`, `RecursiveField` and `NoDecodableFields`
/// are raised while a plan is compiled; `Coercion` is raised while a plan
/// runs and aborts the remaining rules of that decode.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{type_name}: {reason}")]
    Structure {
        type_name: &'static str,
        reason: &'static str,
    },

    #[error("{type_name}.{field}: unsupported field type `{field_type}`")]
    UnsupportedField {
        type_name: &'static str,
        field: &'static str,
        field_type: &'static str,
    },

    /// The field's type contains, directly or through `Option`/`Box`, a
    /// struct whose plan is already being compiled.
    #[error("{type_name}.{field}: recursive field type `{field_type}`")]
    RecursiveField {
        type_name: &'static str,
        field: &'static str,
        field_type: &'static str,
    },

    #[error("{type_name}: no fields for tag `{tag}`")]
    NoDecodableFields { type_name: &'static str, tag: String },

    #[error("{type_name}.{field} (key `{key}`): {source}")]
    Coercion {
        type_name: &'static str,
        field: &'static str,
        key: String,
        #[source]
        source: CoerceError,
    },
}

impl Error {
    /// True for the empty-plan condition that aggregating readers may ignore.
    pub fn is_no_fields(&self) -> bool {
        matches!(self, Error::NoDecodableFields { .. })
    }

    /// True if the error was raised while a plan was compiled.
    pub fn is_compile(&self) -> bool {
        !matches!(self, Error::Coercion { .. })
    }

    /// The key whose value failed to coerce, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Error::Coercion { key, .. } => Some(key),
            _ => None,
        }
    }
}
