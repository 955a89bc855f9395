//! Error types: grammar loading failures and decode/dereference failures.
//!
//! Every decode or dereference call either fully succeeds or fails with one
//! of these; there is no partial result and no global error state.

/// Failure while turning grammar XML into a type registry.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected a <grammar> root element")]
    MissingRoot,
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },
    #[error("<{element}> attribute '{attribute}' is not a number: '{value}'")]
    BadNumber {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("array attribute '{0}' must have a pointer target")]
    ArrayWithoutTarget(String),
    #[error("array attribute '{0}' must be of type Pointer")]
    ArrayNotPointer(String),
    #[error("array attribute '{0}' cannot be an ancestor")]
    ArrayAncestor(String),
}

/// Failure while decoding a record or dereferencing a pointer.
///
/// All variants are fatal to the call that raised them; corrupt input is
/// fatal for the affected subtree, never patched over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CfError {
    /// Records are 32-bit aligned; an unaligned offset is never rounded.
    #[error("offset {offset:#010x} is not 32-bit aligned")]
    Misaligned { offset: u32 },
    #[error("class not found: id {0}")]
    ClassIdNotFound(u16),
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("unexpected end of buffer at offset {offset:#010x}")]
    UnexpectedEnd { offset: usize },
    #[error("cannot dereference null pointer at {location:#010x}")]
    NullPointer { location: u32 },
    /// Asking for the size of an array attribute or a variable-length class.
    #[error("'{0}' has dynamic size")]
    DynamicSize(String),
    /// A composite attribute where a scalar was required.
    #[error("attribute '{0}' is a composite, expected a scalar")]
    CompositeScalar(String),
    /// A typed-pointer attribute with no declared pointer target.
    #[error("pointer attribute '{0}' has no pointer target")]
    MissingPointerTarget(String),
    #[error("record of class '{class}' is missing property '{property}'")]
    MissingProperty { class: String, property: String },
    #[error("property '{property}' of class '{class}' has an unexpected kind")]
    PropertyKind { class: String, property: String },
    /// Bulk dereference over data pointers: element length is not self-describing.
    #[error("cannot dereference an array of data pointers")]
    DataPointerItems,
}
