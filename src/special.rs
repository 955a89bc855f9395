//! Specialized records: richer, convention-based reinterpretations of
//! generic records for specific class ids.
//!
//! A specialization is constructed from the already-decoded generic record
//! and derives everything from properties the generic decode produced (by
//! conventional attribute names); it never re-reads bytes the generic
//! decode did not consume, with the one documented exception of the array
//! record's trailing element addresses.

use crate::decode::Deserializer;
use crate::error::CfError;
use crate::record::{ObjectPointer, Pointer, PropertyValue, Record};
use crate::registry::TypeRegistry;
use byteorder::{ByteOrder, LittleEndian};

const SIZE_PROPERTY: &str = "Size";
const DATA_PROPERTY: &str = "cfData";
const LENGTH_PROPERTY: &str = "NrOfElements";
const ITEM_CLASS_PROPERTY: &str = "TypeOfData";

/// Which specialized constructor a class id maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    String,
    Array,
}

/// A decoded record: the generic default, or one of the registered
/// specializations wrapping it.
#[derive(Debug, Clone)]
pub enum DecodedRecord<'g> {
    Generic(Record<'g>),
    String(StringRecord<'g>),
    Array(ArrayRecord<'g>),
}

impl<'g> DecodedRecord<'g> {
    /// The generic view every variant carries.
    pub fn record(&self) -> &Record<'g> {
        match self {
            DecodedRecord::Generic(r) => r,
            DecodedRecord::String(s) => s.record(),
            DecodedRecord::Array(a) => a.record(),
        }
    }

    pub fn into_record(self) -> Record<'g> {
        match self {
            DecodedRecord::Generic(r) => r,
            DecodedRecord::String(s) => s.into_record(),
            DecodedRecord::Array(a) => a.into_record(),
        }
    }

    pub fn as_string(&self) -> Option<&StringRecord<'g>> {
        match self {
            DecodedRecord::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRecord<'g>> {
        match self {
            DecodedRecord::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl PartialEq for DecodedRecord<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.record() == other.record()
    }
}

/// A string record: a `Size` scalar plus a `cfData` data pointer to the
/// text bytes.
#[derive(Debug, Clone)]
pub struct StringRecord<'g> {
    record: Record<'g>,
}

impl<'g> StringRecord<'g> {
    pub fn new(record: Record<'g>) -> Self {
        StringRecord { record }
    }

    pub fn record(&self) -> &Record<'g> {
        &self.record
    }

    pub fn into_record(self) -> Record<'g> {
        self.record
    }

    /// Dereference the data pointer with the size property and decode the
    /// bytes as UTF-8, lossily.
    pub fn contents(&self, data: &[u8]) -> Result<String, CfError> {
        let size = self
            .record
            .integer(SIZE_PROPERTY)
            .ok_or_else(|| self.missing(SIZE_PROPERTY))?;
        let size = u32::try_from(size).map_err(|_| self.kind_mismatch(SIZE_PROPERTY))?;
        let property = self
            .record
            .property(DATA_PROPERTY)
            .ok_or_else(|| self.missing(DATA_PROPERTY))?;
        let pointer = match &property.value {
            PropertyValue::Pointer(Pointer::Data(p)) => p,
            _ => return Err(self.kind_mismatch(DATA_PROPERTY)),
        };
        let bytes = pointer.dereference(data, size)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn missing(&self, property: &str) -> CfError {
        CfError::MissingProperty {
            class: self.record.class.name.clone(),
            property: property.to_string(),
        }
    }

    fn kind_mismatch(&self, property: &str) -> CfError {
        CfError::PropertyKind {
            class: self.record.class.name.clone(),
            property: property.to_string(),
        }
    }
}

/// An array record: `NrOfElements` and `TypeOfData` scalars, with the
/// element addresses laid out immediately after the record's fixed-size
/// header as consecutive 4-byte pointers.
#[derive(Debug, Clone)]
pub struct ArrayRecord<'g> {
    record: Record<'g>,
    length: u32,
    item_class_id: u16,
}

impl<'g> ArrayRecord<'g> {
    /// Requires the conventional length and element-class-id properties.
    pub fn new(record: Record<'g>) -> Result<Self, CfError> {
        let length = require_integer(&record, LENGTH_PROPERTY)?;
        let length = u32::try_from(length).map_err(|_| kind_mismatch(&record, LENGTH_PROPERTY))?;
        let item_class_id = require_integer(&record, ITEM_CLASS_PROPERTY)?;
        let item_class_id =
            u16::try_from(item_class_id).map_err(|_| kind_mismatch(&record, ITEM_CLASS_PROPERTY))?;
        Ok(ArrayRecord {
            record,
            length,
            item_class_id,
        })
    }

    pub fn record(&self) -> &Record<'g> {
        &self.record
    }

    pub fn into_record(self) -> Record<'g> {
        self.record
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn item_class_id(&self) -> u16 {
        self.item_class_id
    }

    /// Resolve the element class declared by `TypeOfData`.
    pub fn item_class(&self, registry: &'g TypeRegistry) -> Result<&'g crate::model::Class, CfError> {
        registry
            .find_by_id(self.item_class_id)
            .ok_or(CfError::ClassIdNotFound(self.item_class_id))
    }

    /// Object pointers to the elements, read from the addresses following
    /// the record's own fixed-size layout. Elements are not decoded here;
    /// each pointer dereferences on demand.
    pub fn item_pointers(
        &self,
        registry: &'g TypeRegistry,
        data: &[u8],
    ) -> Result<Vec<ObjectPointer<'g>>, CfError> {
        let class = self.item_class(registry)?;
        let base = self.record.offset + self.record.class.size(registry)?;
        let mut pointers = Vec::with_capacity(self.length as usize);
        for index in 0..self.length {
            let location = base + 4 * index;
            let bytes = data
                .get(location as usize..location as usize + 4)
                .ok_or(CfError::UnexpectedEnd {
                    offset: location as usize,
                })?;
            pointers.push(ObjectPointer {
                location,
                class,
                address: LittleEndian::read_u32(bytes),
            });
        }
        Ok(pointers)
    }

    /// Decode every element record.
    pub fn dereference_items(
        &self,
        deserializer: &Deserializer<'g>,
        data: &[u8],
    ) -> Result<Vec<DecodedRecord<'g>>, CfError> {
        let mut items = Vec::with_capacity(self.length as usize);
        for pointer in self.item_pointers(deserializer.registry(), data)? {
            items.push(pointer.dereference(deserializer, data)?);
        }
        Ok(items)
    }
}

fn require_integer(record: &Record<'_>, property: &str) -> Result<i64, CfError> {
    record
        .integer(property)
        .ok_or_else(|| CfError::MissingProperty {
            class: record.class.name.clone(),
            property: property.to_string(),
        })
}

fn kind_mismatch(record: &Record<'_>, property: &str) -> CfError {
    CfError::PropertyKind {
        class: record.class.name.clone(),
        property: property.to_string(),
    }
}
