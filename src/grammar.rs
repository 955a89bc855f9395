//! Load grammar XML into a type registry.
//!
//! The grammar is a `<grammar>` document whose element children each define
//! one class: a `name`, an optional numeric `classid`, an ordered list of
//! `<attrib>` fields, and documentation-only `<masks>` entries. Attributes
//! carry the wire layout flags (`ancestor`, `array`, `ptrtgt`, `mask`,
//! `count`) plus optional `<enum>`/`<bitmask>` documentation.

use crate::error::GrammarError;
use crate::model::{
    Attrib, Bit, Bitmask, BitmaskEntry, Bits, Class, Enum, EnumEntry, Mask, TypeRef,
};
use crate::registry::TypeRegistry;
use roxmltree::{Document, Node};

/// Classes without a `classid` attribute get this id (they are referenced
/// by name only and never appear in a record header).
const UNNUMBERED_CLASS_ID: u16 = 999;

/// Parse grammar XML into a fresh registry.
pub fn parse_grammar(xml: &str) -> Result<TypeRegistry, GrammarError> {
    let mut registry = TypeRegistry::new();
    parse_grammar_into(xml, &mut registry)?;
    Ok(registry)
}

/// Parse grammar XML into an existing registry. Grammars are commonly split
/// over several files merged into one registry; later definitions of a
/// duplicate id/name win.
pub fn parse_grammar_into(xml: &str, registry: &mut TypeRegistry) -> Result<(), GrammarError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let grammar = if root.has_tag_name("grammar") {
        root
    } else {
        root.descendants()
            .find(|n| n.has_tag_name("grammar"))
            .ok_or(GrammarError::MissingRoot)?
    };
    for class_def in grammar.children().filter(|n| n.is_element()) {
        registry.add(parse_class(&class_def)?);
    }
    Ok(())
}

fn parse_class(node: &Node) -> Result<Class, GrammarError> {
    let name = require_attr(node, "name")?.to_string();
    let id = match node.attribute("classid") {
        Some(v) => number_u16(node, "classid", v)?,
        None => UNNUMBERED_CLASS_ID,
    };
    let mut attributes = Vec::new();
    let mut masks = Vec::new();
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attrib" => attributes.push(parse_attrib(&child)?),
            "masks" => masks.push(parse_mask(&child)?),
            _ => {}
        }
    }
    Ok(Class::new(name, id, attributes, masks))
}

fn parse_attrib(node: &Node) -> Result<Attrib, GrammarError> {
    let mut attrib = Attrib::new(
        require_attr(node, "name")?,
        TypeRef::parse(require_attr(node, "type")?),
    );
    attrib.ancestor = node.attribute("ancestor") == Some("1");
    attrib.array = node.attribute("array") == Some("1");
    if let Some(v) = node.attribute("padding") {
        attrib.padding = number_u32(node, "padding", v)?;
    }
    attrib.pointer_target = node.attribute("ptrtgt").map(TypeRef::parse);
    if let Some(v) = node.attribute("mask") {
        attrib.mask = number_u8(node, "mask", v)?;
    }
    if let Some(v) = node.attribute("count") {
        attrib.count = number_u32(node, "count", v)?;
    }
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "enum" if attrib.enumeration.is_none() => {
                attrib.enumeration = Some(parse_enum(&child)?);
            }
            "bitmask" if attrib.bitmask.is_none() => {
                attrib.bitmask = Some(parse_bitmask(&child)?);
            }
            _ => {}
        }
    }
    attrib.validate()?;
    Ok(attrib)
}

fn parse_mask(node: &Node) -> Result<Mask, GrammarError> {
    Ok(Mask {
        name: require_attr(node, "name")?.to_string(),
        value: number_u8(node, "value", require_attr(node, "value")?)?,
    })
}

fn parse_enum(node: &Node) -> Result<Enum, GrammarError> {
    let mut entries = Vec::new();
    for entry in node.children().filter(|n| n.has_tag_name("entry")) {
        entries.push(EnumEntry {
            value: number_i64(&entry, "value", require_attr(&entry, "value")?)?,
            name: entry.attribute("name").map(str::to_string),
        });
    }
    Ok(Enum {
        prefix: node.attribute("prefix").map(str::to_string),
        entries,
    })
}

fn parse_bitmask(node: &Node) -> Result<Bitmask, GrammarError> {
    let mut entries = Vec::new();
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "bit" => entries.push(BitmaskEntry::Bit(Bit {
                index: number_u32(&child, "index", require_attr(&child, "index")?)?,
                name: require_attr(&child, "name")?.to_string(),
            })),
            "bits" => {
                let enumeration = child
                    .children()
                    .find(|n| n.has_tag_name("enum"))
                    .map(|e| parse_enum(&e))
                    .transpose()?;
                entries.push(BitmaskEntry::Bits(Bits {
                    from: number_u32(&child, "from", require_attr(&child, "from")?)?,
                    to: number_u32(&child, "to", require_attr(&child, "to")?)?,
                    name: require_attr(&child, "name")?.to_string(),
                    enumeration,
                }));
            }
            _ => {}
        }
    }
    Ok(Bitmask { entries })
}

fn require_attr<'a>(node: &Node<'a, '_>, name: &str) -> Result<&'a str, GrammarError> {
    node.attribute(name)
        .ok_or_else(|| GrammarError::MissingAttribute {
            element: node.tag_name().name().to_string(),
            attribute: name.to_string(),
        })
}

fn bad_number(node: &Node, attribute: &str, value: &str) -> GrammarError {
    GrammarError::BadNumber {
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// Grammar numbers are decimal or `0x`-prefixed hex.
fn number_i64(node: &Node, attribute: &str, value: &str) -> Result<i64, GrammarError> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => v.parse(),
    };
    parsed.map_err(|_| bad_number(node, attribute, value))
}

fn number_u32(node: &Node, attribute: &str, value: &str) -> Result<u32, GrammarError> {
    u32::try_from(number_i64(node, attribute, value)?)
        .map_err(|_| bad_number(node, attribute, value))
}

fn number_u16(node: &Node, attribute: &str, value: &str) -> Result<u16, GrammarError> {
    u16::try_from(number_i64(node, attribute, value)?)
        .map_err(|_| bad_number(node, attribute, value))
}

fn number_u8(node: &Node, attribute: &str, value: &str) -> Result<u8, GrammarError> {
    u8::try_from(number_i64(node, attribute, value)?)
        .map_err(|_| bad_number(node, attribute, value))
}
