//! Buffer-oriented record decoder.
//!
//! A [`Deserializer`] is built against a populated [`TypeRegistry`] and then
//! repeatedly asked to decode a record at a given offset of a caller-supplied
//! buffer. Decoding walks the class's flat attributes with a cursor, skipping
//! attributes whose presence mask is not satisfied by the record header's
//! extension mask. Pointers are decoded but never followed; traversal is
//! caller-driven through the pointer types in [`crate::record`].

use crate::error::CfError;
use crate::model::{Attrib, AttribType, TypeRef};
use crate::record::{
    DataPointer, IntegerPointer, ObjectPointer, Pointer, PointerArray, Property, PropertyValue,
    Record,
};
use crate::registry::TypeRegistry;
use crate::special::{ArrayRecord, DecodedRecord, SpecialKind, StringRecord};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;

/// Class id conventionally carrying string records.
pub const STRING_CLASS_ID: u16 = 100;
/// Class id conventionally carrying array records.
pub const ARRAY_CLASS_ID: u16 = 101;

/// The 4-byte header every record starts with.
///
/// The root-type tag is part of the wire layout but decoding does not
/// consult it beyond reading it. The header bytes are not consumed
/// separately: grammars inline the header class as the first ancestor, so
/// the attribute walk re-reads them as ordinary scalar properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub class_id: u16,
    pub extension_mask: u8,
    pub root_type: u8,
}

impl RecordHeader {
    /// Read the header at `offset` without consuming anything.
    pub fn peek(data: &[u8], offset: usize) -> Result<Self, CfError> {
        let bytes = data
            .get(offset..offset + 4)
            .ok_or(CfError::UnexpectedEnd { offset })?;
        Ok(RecordHeader {
            class_id: LittleEndian::read_u16(&bytes[0..2]),
            extension_mask: bytes[2],
            root_type: bytes[3],
        })
    }
}

/// Little-endian read cursor over the shared backing buffer.
struct Reader<'b> {
    data: &'b [u8],
    pos: usize,
}

impl<'b> Reader<'b> {
    fn new(data: &'b [u8], pos: usize) -> Self {
        Reader { data, pos }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'b [u8], CfError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(CfError::UnexpectedEnd { offset: self.pos })?;
        self.pos += n;
        Ok(bytes)
    }

    fn read_u16(&mut self) -> Result<u16, CfError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn read_u32(&mut self) -> Result<u32, CfError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn read_scalar(&mut self, ty: AttribType) -> Result<i64, CfError> {
        let value = ty.decode(self.data, self.pos)?;
        self.pos += ty.size() as usize;
        Ok(value)
    }
}

/// Grammar-driven record decoder over a byte buffer.
pub struct Deserializer<'g> {
    registry: &'g TypeRegistry,
    object_types: HashMap<u16, SpecialKind>,
}

impl<'g> Deserializer<'g> {
    /// Build a decoder with the conventional string and array class ids
    /// pre-registered as specialized records.
    pub fn new(registry: &'g TypeRegistry) -> Self {
        let mut deserializer = Deserializer {
            registry,
            object_types: HashMap::new(),
        };
        deserializer.register_object_type(STRING_CLASS_ID, SpecialKind::String);
        deserializer.register_object_type(ARRAY_CLASS_ID, SpecialKind::Array);
        deserializer
    }

    pub fn registry(&self) -> &'g TypeRegistry {
        self.registry
    }

    /// Map a class id to a specialized record constructor.
    pub fn register_object_type(&mut self, class_id: u16, kind: SpecialKind) {
        self.object_types.insert(class_id, kind);
    }

    /// Drop a specialization; records of this class id decode generically again.
    pub fn unregister_object_type(&mut self, class_id: u16) -> Option<SpecialKind> {
        self.object_types.remove(&class_id)
    }

    /// Decode the root record at offset 0.
    pub fn parse(&self, data: &[u8]) -> Result<DecodedRecord<'g>, CfError> {
        self.decode(data, 0)
    }

    /// Decode one record at an absolute, 32-bit-aligned offset.
    ///
    /// Either returns a complete record or fails atomically; no partially
    /// decoded record is ever exposed.
    pub fn decode(&self, data: &[u8], offset: u32) -> Result<DecodedRecord<'g>, CfError> {
        if offset % 4 != 0 {
            return Err(CfError::Misaligned { offset });
        }
        let header = RecordHeader::peek(data, offset as usize)?;
        let class = self
            .registry
            .find_by_id(header.class_id)
            .ok_or(CfError::ClassIdNotFound(header.class_id))?;

        let mut reader = Reader::new(data, offset as usize);
        let mut properties = Vec::new();
        for attrib in class.flat_attributes(self.registry)? {
            // A masked attribute whose bits are not all set in the header's
            // extension mask is absent from the wire, not zero-valued.
            if attrib.mask != 0 && (attrib.mask & header.extension_mask) != attrib.mask {
                continue;
            }
            properties.push(self.read_property(&mut reader, attrib)?);
        }

        let record = Record {
            class,
            offset,
            properties,
        };
        match self.object_types.get(&header.class_id) {
            None => Ok(DecodedRecord::Generic(record)),
            Some(SpecialKind::String) => Ok(DecodedRecord::String(StringRecord::new(record))),
            Some(SpecialKind::Array) => Ok(DecodedRecord::Array(ArrayRecord::new(record)?)),
        }
    }

    fn read_property(
        &self,
        reader: &mut Reader<'_>,
        attrib: &'g Attrib,
    ) -> Result<Property<'g>, CfError> {
        let location = reader.position() as u32;
        let value = match &attrib.ty {
            TypeRef::Scalar(ty) if ty.is_pointer() => {
                if attrib.array {
                    PropertyValue::PointerArray(self.read_pointer_array(reader, attrib)?)
                } else {
                    PropertyValue::Pointer(self.read_pointer(reader, attrib, *ty, location)?)
                }
            }
            TypeRef::Scalar(ty) => {
                if attrib.count > 1 {
                    let mut values = Vec::with_capacity(attrib.count as usize);
                    for _ in 0..attrib.count {
                        values.push(reader.read_scalar(*ty)?);
                    }
                    PropertyValue::IntegerArray(values)
                } else {
                    PropertyValue::Integer(reader.read_scalar(*ty)?)
                }
            }
            // Flattening inlines composites; one surviving here is a
            // grammar/usage error.
            TypeRef::Class(_) => return Err(CfError::CompositeScalar(attrib.name.clone())),
        };
        Ok(Property {
            attrib,
            location,
            value,
        })
    }

    fn read_pointer(
        &self,
        reader: &mut Reader<'_>,
        attrib: &'g Attrib,
        kind: AttribType,
        location: u32,
    ) -> Result<Pointer<'g>, CfError> {
        if kind == AttribType::DataPointer {
            let address = reader.read_u32()?;
            return Ok(Pointer::Data(DataPointer { location, address }));
        }
        let target = attrib
            .pointer_target
            .as_ref()
            .ok_or_else(|| CfError::MissingPointerTarget(attrib.name.clone()))?;
        let address = reader.read_u32()?;
        match target {
            TypeRef::Scalar(ty) => Ok(Pointer::Integer(IntegerPointer {
                location,
                ty: *ty,
                address,
            })),
            TypeRef::Class(class_ref) => Ok(Pointer::Object(ObjectPointer {
                location,
                class: class_ref.resolve(self.registry)?,
                address,
            })),
        }
    }

    /// Wire shape: u16 element-type tag, u16 element count, then count
    /// 4-byte addresses. The element class is the grammar-declared pointer
    /// target; the tag is carried on the result but not used for lookup.
    fn read_pointer_array(
        &self,
        reader: &mut Reader<'_>,
        attrib: &'g Attrib,
    ) -> Result<PointerArray<'g>, CfError> {
        let location = reader.position() as u32;
        let type_tag = reader.read_u16()?;
        let count = reader.read_u16()?;
        let target = attrib
            .pointer_target
            .as_ref()
            .ok_or_else(|| CfError::MissingPointerTarget(attrib.name.clone()))?;

        let mut items = Vec::with_capacity(count as usize);
        match target {
            TypeRef::Scalar(ty) => {
                for _ in 0..count {
                    let location = reader.position() as u32;
                    let address = reader.read_u32()?;
                    items.push(Pointer::Integer(IntegerPointer {
                        location,
                        ty: *ty,
                        address,
                    }));
                }
            }
            TypeRef::Class(class_ref) => {
                let class = class_ref.resolve(self.registry)?;
                for _ in 0..count {
                    let location = reader.position() as u32;
                    let address = reader.read_u32()?;
                    items.push(Pointer::Object(ObjectPointer {
                        location,
                        class,
                        address,
                    }));
                }
            }
        }
        Ok(PointerArray {
            location,
            type_tag,
            items,
        })
    }
}
