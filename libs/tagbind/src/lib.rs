//! Tag-driven struct decoding.
//!
//! A struct derives [`Decode`] and annotates its fields with per-tag keys.
//! A [`Decoder`] configured for one tag compiles the struct's field list into
//! a plan once, caches it, and then fills instances from any [`Source`] by
//! looking up each field's key and converting the text to the field type.
//!
//! ```ignore
//! use tagbind::{Decode, Decoder};
//!
//! #[derive(Decode, Default)]
//! struct Server {
//!     #[bind(env = "HOST")]
//!     host: String,
//!     #[bind(env = "PORT")]
//!     port: u16,
//!     #[bind(env = "DEBUG")]
//!     debug: bool,
//! }
//!
//! let source = [("HOST", "localhost"), ("PORT", "8080"), ("DEBUG", "TRUE")];
//! let mut server = Server::default();
//! Decoder::new("env").decode(&source, &mut server)?;
//! ```

mod cache;
pub mod coerce;
mod decoder;
mod error;
mod introspect;
mod plan;
mod shape;
pub mod source;

pub use cache::{CacheStats, PlanCache};
pub use coerce::{CoerceError, ParseText};
pub use decoder::{Decoder, DecoderConfig, TypedDecoder};
pub use error::Error;
pub use introspect::{Decode, FieldDef, KeyNaming, SKIP, TagValue};
pub use plan::{CompiledPlan, FieldRule, Outline};
pub use shape::{Bindable, Kind, Shape, Width};
pub use source::Source;

pub use tagbind_derive::Decode;
