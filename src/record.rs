//! Decoded records, properties, and lazy pointers.
//!
//! Everything here borrows the grammar (lifetime `'g`) and nothing owns the
//! backing buffer: addresses are absolute offsets into whatever buffer the
//! caller hands to each decode or dereference call, so the caller must keep
//! that buffer alive while pointers derived from it are still in use.

use crate::decode::Deserializer;
use crate::error::CfError;
use crate::model::{Attrib, AttribType, Class};
use crate::special::DecodedRecord;

/// A pointer to a primitive scalar. Dereferencing re-decodes one scalar of
/// `ty` at the absolute target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerPointer {
    /// Offset of the pointer bytes themselves.
    pub location: u32,
    pub ty: AttribType,
    /// Absolute target offset; zero means null.
    pub address: u32,
}

impl IntegerPointer {
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    pub fn dereference(&self, data: &[u8]) -> Result<i64, CfError> {
        if self.is_null() {
            return Err(CfError::NullPointer {
                location: self.location,
            });
        }
        self.ty.decode(data, self.address as usize)
    }
}

/// A pointer to a full record of a known class. Dereferencing decodes a new
/// record at the target address; multi-record graphs (lists, trees, string
/// tables) are traversed this way, one record at a time, on demand.
#[derive(Debug, Clone, Copy)]
pub struct ObjectPointer<'g> {
    pub location: u32,
    pub class: &'g Class,
    pub address: u32,
}

impl<'g> ObjectPointer<'g> {
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    pub fn dereference(
        &self,
        deserializer: &Deserializer<'g>,
        data: &[u8],
    ) -> Result<DecodedRecord<'g>, CfError> {
        if self.is_null() {
            return Err(CfError::NullPointer {
                location: self.location,
            });
        }
        deserializer.decode(data, self.address)
    }
}

impl PartialEq for ObjectPointer<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
            && self.address == other.address
            && self.class.id == other.class.id
    }
}

impl Eq for ObjectPointer<'_> {}

/// A pointer to an untyped byte range. The range length is not
/// self-describing; the caller supplies it at dereference time, typically
/// from a sibling scalar property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPointer {
    pub location: u32,
    pub address: u32,
}

impl DataPointer {
    pub fn is_null(&self) -> bool {
        self.address == 0
    }

    /// The borrowed byte range `[address, address + length)`.
    pub fn dereference<'b>(&self, data: &'b [u8], length: u32) -> Result<&'b [u8], CfError> {
        if self.is_null() {
            return Err(CfError::NullPointer {
                location: self.location,
            });
        }
        let start = self.address as usize;
        data.get(start..start + length as usize)
            .ok_or(CfError::UnexpectedEnd { offset: start })
    }
}

/// Any decoded pointer. A pointer whose stored address is zero is null and
/// never dereferences to a silent empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum Pointer<'g> {
    Integer(IntegerPointer),
    Object(ObjectPointer<'g>),
    Data(DataPointer),
}

impl Pointer<'_> {
    pub fn location(&self) -> u32 {
        match self {
            Pointer::Integer(p) => p.location,
            Pointer::Object(p) => p.location,
            Pointer::Data(p) => p.location,
        }
    }

    pub fn address(&self) -> u32 {
        match self {
            Pointer::Integer(p) => p.address,
            Pointer::Object(p) => p.address,
            Pointer::Data(p) => p.address,
        }
    }

    pub fn is_null(&self) -> bool {
        self.address() == 0
    }
}

/// One dereferenced element of a pointer array.
#[derive(Debug, PartialEq)]
pub enum ArrayItem<'g> {
    Integer(i64),
    Record(DecodedRecord<'g>),
}

/// A dynamic array of pointers: the wire element-type tag plus the decoded
/// element pointers. The element target class comes from the grammar's
/// declared pointer target; the tag is retained but not used for lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerArray<'g> {
    pub location: u32,
    pub type_tag: u16,
    pub items: Vec<Pointer<'g>>,
}

impl<'g> PointerArray<'g> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dereference every element. Fails as a whole on the first null or
    /// unreadable element, and up front if the element kind is the untyped
    /// data-pointer kind (no per-element length to read with).
    pub fn dereference_items(
        &self,
        deserializer: &Deserializer<'g>,
        data: &[u8],
    ) -> Result<Vec<ArrayItem<'g>>, CfError> {
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                Pointer::Integer(p) if p.ty == AttribType::DataPointer => {
                    return Err(CfError::DataPointerItems)
                }
                Pointer::Data(_) => return Err(CfError::DataPointerItems),
                Pointer::Integer(p) => out.push(ArrayItem::Integer(p.dereference(data)?)),
                Pointer::Object(p) => {
                    out.push(ArrayItem::Record(p.dereference(deserializer, data)?))
                }
            }
        }
        Ok(out)
    }
}

/// The decoded value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue<'g> {
    Integer(i64),
    /// Fixed-length inline scalar array (`count > 1`).
    IntegerArray(Vec<i64>),
    Pointer(Pointer<'g>),
    PointerArray(PointerArray<'g>),
}

impl<'g> PropertyValue<'g> {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer_array(&self) -> Option<&[i64]> {
        match self {
            PropertyValue::IntegerArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer<'g>> {
        match self {
            PropertyValue::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pointer_array(&self) -> Option<&PointerArray<'g>> {
        match self {
            PropertyValue::PointerArray(a) => Some(a),
            _ => None,
        }
    }
}

/// One decoded attribute: the grammar attribute that produced it, the
/// offset it was read from, and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property<'g> {
    pub attrib: &'g Attrib,
    pub location: u32,
    pub value: PropertyValue<'g>,
}

/// A generically decoded record: its class, the absolute offset it was read
/// from, and its decoded properties in declared order.
#[derive(Debug, Clone)]
pub struct Record<'g> {
    pub class: &'g Class,
    pub offset: u32,
    pub properties: Vec<Property<'g>>,
}

impl<'g> Record<'g> {
    /// First property produced by an attribute of this name.
    pub fn property(&self, name: &str) -> Option<&Property<'g>> {
        self.properties.iter().find(|p| p.attrib.name == name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.property(name).and_then(|p| p.value.as_integer())
    }

    pub fn pointer(&self, name: &str) -> Option<&Pointer<'g>> {
        self.property(name).and_then(|p| p.value.as_pointer())
    }

    pub fn pointer_array(&self, name: &str) -> Option<&PointerArray<'g>> {
        self.property(name).and_then(|p| p.value.as_pointer_array())
    }
}

impl PartialEq for Record<'_> {
    /// Equal when class (by id), offset, and properties all match.
    fn eq(&self, other: &Self) -> bool {
        self.class.id == other.class.id
            && self.offset == other.offset
            && self.properties == other.properties
    }
}
