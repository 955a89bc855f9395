//! # cfdecode — Grammar-driven CF configuration-object decoder
//!
//! Decodes the CF binary "configuration object" format, whose layout is not
//! fixed in code but described by an external grammar: a catalogue of record
//! classes, each an ordered list of typed attributes, some of which are
//! pointers into the same buffer, some conditionally present based on a
//! per-record extension mask, some dynamic arrays of pointers.
//!
//! ## Pieces
//!
//! - **Grammar**: XML class catalogue loaded into a [`TypeRegistry`]
//!   ([`parse_grammar`]); classes reference each other lazily by name, so no
//!   load order is required and self-referential types work.
//! - **Data model**: [`Class`] / [`Attrib`] definitions with
//!   ancestor-flattening ([`Class::flat_attributes`]) producing the exact
//!   leaf-level wire layout, and fixed-size computation.
//! - **Decoder**: [`Deserializer::decode`] walks a class's flat attributes
//!   at a 32-bit-aligned offset of a caller-supplied buffer and produces a
//!   typed [`Record`] with pointer-aware properties.
//! - **Lazy pointers**: [`IntegerPointer`], [`ObjectPointer`], and
//!   [`DataPointer`] dereference on demand against the same buffer;
//!   record graphs are traversed one explicit, independently-failable call
//!   at a time, never eagerly.
//! - **Specialized records**: class ids can map to richer views
//!   ([`StringRecord`], [`ArrayRecord`]); ids 100 and 101 are pre-registered.
//!
//! ## Usage
//!
//! ```no_run
//! use cfdecode::{parse_grammar, Deserializer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = parse_grammar(&std::fs::read_to_string("grammar.xml")?)?;
//! let data = std::fs::read("config.cf")?;
//! let deserializer = Deserializer::new(&registry);
//! let root = deserializer.parse(&data)?;
//! for property in &root.record().properties {
//!     println!("{} @ {:#010x}", property.attrib.name, property.location);
//! }
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod error;
pub mod grammar;
pub mod model;
pub mod record;
pub mod registry;
pub mod special;

pub use decode::{Deserializer, RecordHeader, ARRAY_CLASS_ID, STRING_CLASS_ID};
pub use error::{CfError, GrammarError};
pub use grammar::{parse_grammar, parse_grammar_into};
pub use model::{Attrib, AttribType, Class, ClassRef, Mask, TypeRef};
pub use record::{
    ArrayItem, DataPointer, IntegerPointer, ObjectPointer, Pointer, PointerArray, Property,
    PropertyValue, Record,
};
pub use registry::TypeRegistry;
pub use special::{ArrayRecord, DecodedRecord, SpecialKind, StringRecord};
