//! Grammar data model: primitive attribute types, class definitions, and the
//! ancestor-flattening that yields a class's wire layout.

use crate::error::CfError;
use crate::registry::TypeRegistry;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::sync::OnceLock;

/// Primitive scalar kinds. Every kind has a fixed wire size; pointer kinds
/// are always 4 bytes regardless of what they point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    DataLenU16,
    DataLenU32,
    ColorRef,
    Gid,
    IrDuration,
    Position,
    Dimension,
    Pointer,
    DataPointer,
}

impl AttribType {
    /// Wire size in bytes.
    pub fn size(self) -> u32 {
        match self {
            AttribType::U8 | AttribType::S8 => 1,
            AttribType::U16
            | AttribType::S16
            | AttribType::DataLenU16
            | AttribType::Gid
            | AttribType::IrDuration => 2,
            AttribType::U32
            | AttribType::S32
            | AttribType::DataLenU32
            | AttribType::ColorRef
            | AttribType::Position
            | AttribType::Dimension
            | AttribType::Pointer
            | AttribType::DataPointer => 4,
        }
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, AttribType::Pointer | AttribType::DataPointer)
    }

    /// The grammar's spelling of this kind.
    pub fn name(self) -> &'static str {
        match self {
            AttribType::U8 => "U8",
            AttribType::S8 => "S8",
            AttribType::U16 => "U16",
            AttribType::S16 => "S16",
            AttribType::U32 => "U32",
            AttribType::S32 => "S32",
            AttribType::DataLenU16 => "DataLenU16",
            AttribType::DataLenU32 => "DataLenU32",
            AttribType::ColorRef => "T_ColorRef",
            AttribType::Gid => "T_Gid",
            AttribType::IrDuration => "T_IrDuration",
            AttribType::Position => "T_Position",
            AttribType::Dimension => "T_Dimension",
            AttribType::Pointer => "Pointer",
            AttribType::DataPointer => "DataPointer",
        }
    }

    /// Parse a grammar type spelling; `None` means "not a primitive" (a class name).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "U8" => AttribType::U8,
            "S8" => AttribType::S8,
            "U16" => AttribType::U16,
            "S16" => AttribType::S16,
            "U32" => AttribType::U32,
            "S32" => AttribType::S32,
            "DataLenU16" => AttribType::DataLenU16,
            "DataLenU32" => AttribType::DataLenU32,
            "T_ColorRef" => AttribType::ColorRef,
            "T_Gid" => AttribType::Gid,
            "T_IrDuration" => AttribType::IrDuration,
            "T_Position" => AttribType::Position,
            "T_Dimension" => AttribType::Dimension,
            "Pointer" => AttribType::Pointer,
            "DataPointer" => AttribType::DataPointer,
            _ => return None,
        })
    }

    /// Decode one scalar of this kind at `offset`, little-endian. Signed
    /// kinds sign-extend; pointer kinds read as unsigned 32-bit addresses.
    pub fn decode(self, data: &[u8], offset: usize) -> Result<i64, CfError> {
        let bytes = data
            .get(offset..offset + self.size() as usize)
            .ok_or(CfError::UnexpectedEnd { offset })?;
        Ok(match self {
            AttribType::U8 => bytes[0] as i64,
            AttribType::S8 => bytes[0] as i8 as i64,
            AttribType::U16
            | AttribType::DataLenU16
            | AttribType::Gid
            | AttribType::IrDuration => LittleEndian::read_u16(bytes) as i64,
            AttribType::S16 => LittleEndian::read_i16(bytes) as i64,
            AttribType::U32
            | AttribType::DataLenU32
            | AttribType::ColorRef
            | AttribType::Position
            | AttribType::Dimension
            | AttribType::Pointer
            | AttribType::DataPointer => LittleEndian::read_u32(bytes) as i64,
            AttribType::S32 => LittleEndian::read_i32(bytes) as i64,
        })
    }
}

impl fmt::Display for AttribType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of an attribute enumeration (documentation only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub value: i64,
    pub name: Option<String>,
}

/// Named values an attribute may take (documentation only).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enum {
    pub prefix: Option<String>,
    pub entries: Vec<EnumEntry>,
}

/// A single named bit of a bitmask attribute (documentation only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bit {
    pub index: u32,
    pub name: String,
}

/// A named contiguous bit range of a bitmask attribute (documentation only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bits {
    pub from: u32,
    pub to: u32,
    pub name: String,
    pub enumeration: Option<Enum>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmaskEntry {
    Bit(Bit),
    Bits(Bits),
}

/// Bit-level documentation for an attribute's value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmask {
    pub entries: Vec<BitmaskEntry>,
}

/// A named extension-mask value a class documents (documentation only; the
/// decoder uses the per-attribute `mask` field, not these).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub name: String,
    pub value: u8,
}

/// Deferred reference to a class by name, resolved lazily against a
/// [`TypeRegistry`] and memoized. Classes may reference each other (or
/// themselves) before all classes are loaded, so resolution cannot require
/// a load order.
#[derive(Debug, Clone)]
pub struct ClassRef {
    name: String,
    resolved: OnceLock<usize>,
}

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        ClassRef {
            name: name.into(),
            resolved: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look the class up by name, caching the registry slot on first success.
    pub fn resolve<'r>(&self, registry: &'r TypeRegistry) -> Result<&'r Class, CfError> {
        let slot = match self.resolved.get() {
            Some(&slot) => slot,
            None => {
                let slot = registry
                    .slot_of_name(&self.name)
                    .ok_or_else(|| CfError::ClassNotFound(self.name.clone()))?;
                *self.resolved.get_or_init(|| slot)
            }
        };
        registry
            .class_at(slot)
            .ok_or_else(|| CfError::ClassNotFound(self.name.clone()))
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassRef {}

/// An attribute's declared type or pointer target: a primitive scalar kind
/// or a reference to another class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(AttribType),
    Class(ClassRef),
}

impl TypeRef {
    /// Parse a grammar `type`/`ptrtgt` spelling.
    pub fn parse(spelling: &str) -> Self {
        match AttribType::from_name(spelling) {
            Some(t) => TypeRef::Scalar(t),
            None => TypeRef::Class(ClassRef::new(spelling)),
        }
    }

    pub fn as_scalar(&self) -> Option<AttribType> {
        match self {
            TypeRef::Scalar(t) => Some(*t),
            TypeRef::Class(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Scalar(t) => f.write_str(t.name()),
            TypeRef::Class(r) => write!(f, "<ClassRef {}>", r.name()),
        }
    }
}

/// One field of a class.
///
/// `mask == 0` means always present; nonzero means the field is physically
/// present only when the record header's extension mask has all of these
/// bits set. `count > 1` turns a scalar into a fixed-length inline array.
#[derive(Debug, Clone, PartialEq)]
pub struct Attrib {
    pub name: String,
    pub ty: TypeRef,
    pub ancestor: bool,
    pub array: bool,
    pub padding: u32,
    pub pointer_target: Option<TypeRef>,
    pub mask: u8,
    pub count: u32,
    pub enumeration: Option<Enum>,
    pub bitmask: Option<Bitmask>,
}

impl Attrib {
    /// A plain scalar or composite attribute with no flags set.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Attrib {
            name: name.into(),
            ty,
            ancestor: false,
            array: false,
            padding: 0,
            pointer_target: None,
            mask: 0,
            count: 1,
            enumeration: None,
            bitmask: None,
        }
    }

    /// Construction invariants: an array attribute must have a pointer
    /// target, must itself be of type `Pointer`, and cannot be an ancestor.
    pub fn validate(&self) -> Result<(), crate::error::GrammarError> {
        use crate::error::GrammarError;
        if self.array {
            if self.pointer_target.is_none() {
                return Err(GrammarError::ArrayWithoutTarget(self.name.clone()));
            }
            if self.ty != TypeRef::Scalar(AttribType::Pointer) {
                return Err(GrammarError::ArrayNotPointer(self.name.clone()));
            }
            if self.ancestor {
                return Err(GrammarError::ArrayAncestor(self.name.clone()));
            }
        }
        Ok(())
    }

    /// Wire size in bytes of one occurrence. Array attributes have dynamic
    /// size (known only after the record is read) and always error here.
    pub fn size(&self, registry: &TypeRegistry) -> Result<u32, CfError> {
        if self.array {
            return Err(CfError::DynamicSize(self.name.clone()));
        }
        match &self.ty {
            TypeRef::Scalar(t) => Ok(t.size()),
            TypeRef::Class(r) => r.resolve(registry)?.size(registry),
        }
    }
}

/// A grammar-declared record type: numeric id, name, ordered attributes,
/// plus documentation-only mask definitions.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub id: u16,
    pub attributes: Vec<Attrib>,
    pub masks: Vec<Mask>,
    flat: OnceLock<Vec<Attrib>>,
    size: OnceLock<u32>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        id: u16,
        attributes: Vec<Attrib>,
        masks: Vec<Mask>,
    ) -> Self {
        Class {
            name: name.into(),
            id,
            attributes,
            masks,
            flat: OnceLock::new(),
            size: OnceLock::new(),
        }
    }

    /// The leaf-level, ordered field list defining this class's wire layout:
    /// class-typed attributes are replaced recursively by the referenced
    /// class's own flat attributes; array attributes are kept as-is (their
    /// size is dynamic).
    ///
    /// Memoized: flattening recurses through potentially shared ancestor
    /// classes and runs once per decode otherwise.
    pub fn flat_attributes(&self, registry: &TypeRegistry) -> Result<&[Attrib], CfError> {
        if let Some(flat) = self.flat.get() {
            return Ok(flat);
        }
        let flat = self.compute_flat(registry)?;
        Ok(self.flat.get_or_init(|| flat))
    }

    fn compute_flat(&self, registry: &TypeRegistry) -> Result<Vec<Attrib>, CfError> {
        let mut flat = Vec::with_capacity(self.attributes.len());
        for attrib in &self.attributes {
            if attrib.array {
                flat.push(attrib.clone());
                continue;
            }
            match &attrib.ty {
                TypeRef::Class(r) => {
                    let class = r.resolve(registry)?;
                    flat.extend_from_slice(class.flat_attributes(registry)?);
                }
                TypeRef::Scalar(_) => flat.push(attrib.clone()),
            }
        }
        Ok(flat)
    }

    /// Total wire size of a fixed-size class: the sum of its flat attribute
    /// sizes. Errors with [`CfError::DynamicSize`] if any flat attribute is
    /// an array; callers know from the grammar which classes are fixed-size.
    pub fn size(&self, registry: &TypeRegistry) -> Result<u32, CfError> {
        if let Some(&size) = self.size.get() {
            return Ok(size);
        }
        let mut total = 0u32;
        for attrib in self.flat_attributes(registry)? {
            total += attrib.size(registry)?;
        }
        Ok(*self.size.get_or_init(|| total))
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Class#{} \"{}\">", self.id, self.name)
    }
}
