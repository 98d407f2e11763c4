//! String to value conversions used by the built-in field kinds.

use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Spellings accepted as `true`.
pub const TRUE_LITERALS: [&str; 6] = ["1", "t", "T", "TRUE", "true", "True"];
/// Spellings accepted as `false`.
pub const FALSE_LITERALS: [&str; 6] = ["0", "f", "F", "FALSE", "false", "False"];

/// A field value that could not be converted to the field's type.
#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    #[error("invalid integer {value:?}: {source}")]
    Int {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid float {value:?}: {source}")]
    Float {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("float {value:?} out of range for f{bits}")]
    FloatRange { value: String, bits: u32 },

    #[error("invalid boolean {value:?}")]
    Bool { value: String },

    #[error("invalid value {value:?}: {source}")]
    Text {
        value: String,
        #[source]
        source: BoxError,
    },
}

/// Extension hook: a type that parses itself from raw text.
///
/// A field whose type binds through this hook never goes through the
/// built-in conversions, even if it wraps a primitive.
///
/// Implementing the trait is not enough on its own: the type must also bind
/// through it, either with `#[derive(Decode)]` plus the container attribute
/// `#[bind(text)]` or with a manual `Bindable` impl returning
/// [`Shape::text`](crate::Shape::text). A struct that derives `Decode`
/// without `#[bind(text)]` is decoded field by field as a nested struct,
/// whether or not it implements `ParseText`.
pub trait ParseText {
    type Error: Into<BoxError>;

    fn parse_text(&mut self, text: &[u8]) -> Result<(), Self::Error>;
}

/// Base-10 integer parse at the exact width of `T`.
pub fn parse_int<T>(value: &str) -> Result<T, CoerceError>
where
    T: FromStr<Err = ParseIntError>,
{
    value.parse().map_err(|source| CoerceError::Int {
        value: value.to_owned(),
        source,
    })
}

pub fn parse_f32(value: &str) -> Result<f32, CoerceError> {
    let parsed: f32 = value.parse().map_err(|source| CoerceError::Float {
        value: value.to_owned(),
        source,
    })?;
    check_range(value, parsed.is_infinite(), 32)?;
    Ok(parsed)
}

pub fn parse_f64(value: &str) -> Result<f64, CoerceError> {
    let parsed: f64 = value.parse().map_err(|source| CoerceError::Float {
        value: value.to_owned(),
        source,
    })?;
    check_range(value, parsed.is_infinite(), 64)?;
    Ok(parsed)
}

// A finite literal that rounds to infinity overflowed the target width.
fn check_range(value: &str, infinite: bool, bits: u32) -> Result<(), CoerceError> {
    if infinite && !value.to_ascii_lowercase().contains("inf") {
        return Err(CoerceError::FloatRange {
            value: value.to_owned(),
            bits,
        });
    }
    Ok(())
}

pub fn parse_bool(value: &str) -> Result<bool, CoerceError> {
    if TRUE_LITERALS.contains(&value) {
        Ok(true)
    } else if FALSE_LITERALS.contains(&value) {
        Ok(false)
    } else {
        Err(CoerceError::Bool {
            value: value.to_owned(),
        })
    }
}

/// Runs a `FromStr` parse and reports failures as [`CoerceError::Text`].
pub fn parse_from_str<T>(value: &str) -> Result<T, CoerceError>
where
    T: FromStr,
    T::Err: Into<BoxError>,
{
    value.parse().map_err(|e: T::Err| CoerceError::Text {
        value: value.to_owned(),
        source: e.into(),
    })
}
