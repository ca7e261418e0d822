//! RTPC v01 property containers.
//!
//! A container is a tree of nodes. Each node holds typed properties keyed by
//! the lookup3 hash of their name; small values are stored inline and larger
//! ones at an absolute offset into the file.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::{
    format::{DecodeError, DecodeResult},
    util::{hash::name_hash, reader::ByteCursor},
};

pub const RTPC_MAGIC: [u8; 4] = *b"RTPC";
pub const RTPC_VERSION: u32 = 1;
pub const MAX_NODE_DEPTH: usize = 64;

const NODE_HEADER_SIZE: usize = 12;
const PROPERTY_SIZE: usize = 9;

pub const K_PROP_CLASS: u32 = name_hash("_class");
pub const K_PROP_CLASS_HASH: u32 = name_hash("_class_hash");

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Unassigned,
    U32(u32),
    F32(f32),
    String(String),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3x3([f32; 9]),
    Mat4x4([f32; 16]),
    U32Array(Vec<u32>),
    F32Array(Vec<f32>),
    Bytes(Vec<u8>),
    Deprecated(u32),
    ObjectId(u64),
    Events(Vec<(u32, u32)>),
}

impl PropertyValue {
    pub fn type_id(&self) -> u8 {
        match self {
            PropertyValue::Unassigned => 0,
            PropertyValue::U32(_) => 1,
            PropertyValue::F32(_) => 2,
            PropertyValue::String(_) => 3,
            PropertyValue::Vec2(_) => 4,
            PropertyValue::Vec3(_) => 5,
            PropertyValue::Vec4(_) => 6,
            PropertyValue::Mat3x3(_) => 7,
            PropertyValue::Mat4x4(_) => 8,
            PropertyValue::U32Array(_) => 9,
            PropertyValue::F32Array(_) => 10,
            PropertyValue::Bytes(_) => 11,
            PropertyValue::Deprecated(_) => 12,
            PropertyValue::ObjectId(_) => 13,
            PropertyValue::Events(_) => 14,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            PropertyValue::U32(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric value of a u32 or f32 property.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            PropertyValue::F32(v) => Some(v),
            PropertyValue::U32(v) => Some(v as f32),
            _ => None,
        }
    }

    /// Flags are stored as either integer or float.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PropertyValue::U32(v) => Some(v != 0),
            PropertyValue::F32(v) => Some(v != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match *self {
            PropertyValue::Vec3(v) => Some(v),
            PropertyValue::Vec4([x, y, z, _]) => Some([x, y, z]),
            _ => None,
        }
    }

    pub fn as_mat4(&self) -> Option<[f32; 16]> {
        match *self {
            PropertyValue::Mat4x4(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Property {
    pub name_hash: u32,
    pub value: PropertyValue,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RtpcNode {
    pub name_hash: u32,
    pub properties: Vec<Property>,
    pub children: Vec<RtpcNode>,
}

impl RtpcNode {
    pub fn get_hash(&self, hash: u32) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name_hash == hash).map(|p| &p.value)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> { self.get_hash(name_hash(name)) }

    pub fn get_str(&self, name: &str) -> Option<&str> { self.get(name).and_then(PropertyValue::as_str) }

    pub fn get_f32(&self, name: &str) -> Option<f32> { self.get(name).and_then(PropertyValue::as_f32) }

    pub fn get_bool(&self, name: &str) -> Option<bool> { self.get(name).and_then(PropertyValue::as_bool) }

    /// Whether the node's `_class` or `_class_hash` names `class`.
    pub fn is_class(&self, class: &str) -> bool {
        if let Some(name) = self.get_hash(K_PROP_CLASS).and_then(PropertyValue::as_str) {
            return name == class;
        }
        self.get_hash(K_PROP_CLASS_HASH).and_then(PropertyValue::as_u32) == Some(name_hash(class))
    }

    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &RtpcNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RtpcContainer {
    pub version: u32,
    pub root: RtpcNode,
}

struct NodeHeader {
    name_hash: u32,
    data_offset: u32,
    property_count: u16,
    child_count: u16,
}

fn read_node_header(r: &mut ByteCursor) -> DecodeResult<NodeHeader> {
    r.require(NODE_HEADER_SIZE)?;
    Ok(NodeHeader {
        name_hash: r.read_u32()?,
        data_offset: r.read_u32()?,
        property_count: r.read_u16()?,
        child_count: r.read_u16()?,
    })
}

#[inline]
fn align4(v: u64) -> u64 { (v + 3) & !3 }

fn read_u32_array(r: &mut ByteCursor) -> DecodeResult<Vec<u32>> {
    let count = r.read_u32()? as usize;
    r.require(count.saturating_mul(4))?;
    (0..count).map(|_| r.read_u32()).collect()
}

fn read_value(r: &mut ByteCursor, kind: u8, raw: u32, entry_offset: u64) -> DecodeResult<PropertyValue> {
    let value = match kind {
        0 => return Ok(PropertyValue::Unassigned),
        1 => return Ok(PropertyValue::U32(raw)),
        2 => return Ok(PropertyValue::F32(f32::from_bits(raw))),
        12 => return Ok(PropertyValue::Deprecated(raw)),
        3..=11 | 13 | 14 => {
            r.seek(raw as u64)?;
            match kind {
                3 => PropertyValue::String(r.read_cstring()?),
                4 => PropertyValue::Vec2(r.read_f32_array()?),
                5 => PropertyValue::Vec3(r.read_f32_array()?),
                6 => PropertyValue::Vec4(r.read_f32_array()?),
                7 => PropertyValue::Mat3x3(r.read_f32_array()?),
                8 => PropertyValue::Mat4x4(r.read_f32_array()?),
                9 => PropertyValue::U32Array(read_u32_array(r)?),
                10 => {
                    let count = r.read_u32()? as usize;
                    PropertyValue::F32Array(r.read_f32_vec(count)?)
                }
                11 => {
                    let count = r.read_u32()? as usize;
                    PropertyValue::Bytes(r.read_bytes(count)?.to_vec())
                }
                13 => PropertyValue::ObjectId(r.read_u64()?),
                _ => {
                    let count = r.read_u32()? as usize;
                    r.require(count.saturating_mul(8))?;
                    let mut events = Vec::with_capacity(count);
                    for _ in 0..count {
                        events.push((r.read_u32()?, r.read_u32()?));
                    }
                    PropertyValue::Events(events)
                }
            }
        }
        kind => return Err(DecodeError::UnknownPropertyType { kind, offset: entry_offset }),
    };
    Ok(value)
}

/// Node data offsets already decoded. Each node may be referenced once.
type Visited = HashSet<u32>;

fn read_node(
    r: &mut ByteCursor,
    header: NodeHeader,
    depth: usize,
    visited: &mut Visited,
) -> DecodeResult<RtpcNode> {
    if depth > MAX_NODE_DEPTH {
        return Err(DecodeError::MalformedContainer(format!(
            "nodes nested deeper than {} levels",
            MAX_NODE_DEPTH
        )));
    }
    if !visited.insert(header.data_offset) {
        return Err(DecodeError::MalformedContainer(format!(
            "node data at {:#X} referenced more than once",
            header.data_offset
        )));
    }
    let data_offset = header.data_offset as u64;
    r.seek(data_offset)?;
    let property_count = header.property_count as usize;
    r.require(property_count * PROPERTY_SIZE)?;
    let mut raw_properties = Vec::with_capacity(property_count);
    for _ in 0..property_count {
        let entry_offset = r.position();
        raw_properties.push((entry_offset, r.read_u32()?, r.read_u32()?, r.read_u8()?));
    }

    r.seek(align4(data_offset + (property_count * PROPERTY_SIZE) as u64))?;
    let child_count = header.child_count as usize;
    r.require(child_count * NODE_HEADER_SIZE)?;
    let mut child_headers = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        child_headers.push(read_node_header(r)?);
    }

    let mut properties = Vec::with_capacity(property_count);
    for (entry_offset, name_hash, raw, kind) in raw_properties {
        let value = read_value(r, kind, raw, entry_offset)?;
        properties.push(Property { name_hash, value });
    }

    let mut children = Vec::with_capacity(child_count);
    for child in child_headers {
        children.push(read_node(r, child, depth + 1, visited)?);
    }
    Ok(RtpcNode { name_hash: header.name_hash, properties, children })
}

/// Decodes an RTPC v01 container.
pub fn decode(data: &[u8]) -> DecodeResult<RtpcContainer> {
    let mut r = ByteCursor::new(data);
    let magic = r.read_bytes(4)?;
    if magic != RTPC_MAGIC {
        return Err(DecodeError::BadMagic {
            expected: "RTPC".to_string(),
            found: String::from_utf8_lossy(magic).into_owned(),
        });
    }
    let version = r.read_u32()?;
    if version != RTPC_VERSION {
        return Err(DecodeError::UnsupportedVersion { version, expected: RTPC_VERSION });
    }
    let root_header = read_node_header(&mut r)?;
    let root = read_node(&mut r, root_header, 0, &mut Visited::new())?;
    debug!("RTPC: {} nodes", root.walk().count());
    Ok(RtpcContainer { version, root })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::fixtures::{rtpc, Buf, TestNode};

    fn sample() -> TestNode {
        TestNode::new(name_hash("root")).child(
            TestNode::new(0x1111)
                .prop("_class", PropertyValue::String("CRigidObject".into()))
                .prop("filename", PropertyValue::String("models/crate_lod1.rbm".into()))
                .prop("scale", PropertyValue::F32(2.5))
                .prop("flags", PropertyValue::U32(7))
                .prop("ids", PropertyValue::U32Array(vec![1, 2, 3]))
                .prop("weights", PropertyValue::F32Array(vec![0.5]))
                .prop("blob", PropertyValue::Bytes(vec![9, 8, 7]))
                .prop("object", PropertyValue::ObjectId(0x0102_0304_0506_0708))
                .prop("events", PropertyValue::Events(vec![(1, 2)]))
                .prop("offset", PropertyValue::Vec2([1.0, 2.0]))
                .prop("color", PropertyValue::Vec3([1.0, 2.0, 3.0]))
                .prop("basis", PropertyValue::Mat3x3([0.0; 9]))
                .child(TestNode::new(0x2222).prop("_class_hash", PropertyValue::U32(name_hash("CRigidObject")))),
        )
    }

    #[test]
    fn decodes_tree() {
        let container = decode(&rtpc(&sample())).unwrap();
        assert_eq!(container.version, 1);
        let root = &container.root;
        assert_eq!(root.name_hash, name_hash("root"));
        assert_eq!(root.children.len(), 1);
        let object = &root.children[0];
        assert_eq!(object.name_hash, 0x1111);
        assert_eq!(object.get_str("filename"), Some("models/crate_lod1.rbm"));
        assert_eq!(object.get_f32("scale"), Some(2.5));
        assert_eq!(object.get("flags"), Some(&PropertyValue::U32(7)));
        assert_eq!(object.get("ids"), Some(&PropertyValue::U32Array(vec![1, 2, 3])));
        assert_eq!(object.get("weights"), Some(&PropertyValue::F32Array(vec![0.5])));
        assert_eq!(object.get("blob"), Some(&PropertyValue::Bytes(vec![9, 8, 7])));
        assert_eq!(object.get("object"), Some(&PropertyValue::ObjectId(0x0102_0304_0506_0708)));
        assert_eq!(object.get("events"), Some(&PropertyValue::Events(vec![(1, 2)])));
        assert_eq!(object.get("offset"), Some(&PropertyValue::Vec2([1.0, 2.0])));
        assert_eq!(object.get("color").and_then(PropertyValue::as_vec3), Some([1.0, 2.0, 3.0]));
        assert!(object.get("missing").is_none());
        assert_eq!(root.walk().count(), 3);
    }

    #[test]
    fn class_detection() {
        let container = decode(&rtpc(&sample())).unwrap();
        let object = &container.root.children[0];
        assert!(object.is_class("CRigidObject"));
        assert!(!object.is_class("CStaticDecalObject"));
        assert!(object.children[0].is_class("CRigidObject"));
        assert!(!container.root.is_class("CRigidObject"));
    }

    #[test]
    fn bad_header() {
        let mut data = rtpc(&sample());
        data[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(decode(&data), Err(DecodeError::UnsupportedVersion { version: 2, .. })));
        data[0] = b'X';
        assert!(matches!(decode(&data), Err(DecodeError::BadMagic { .. })));
    }

    #[test]
    fn unknown_property_type() {
        let node = TestNode::new(0).prop("flags", PropertyValue::U32(1));
        let mut data = rtpc(&node);
        // root data starts at 20; type byte is the ninth byte of the entry
        data[28] = 42;
        assert!(matches!(
            decode(&data),
            Err(DecodeError::UnknownPropertyType { kind: 42, offset: 20 })
        ));
    }

    #[test]
    fn self_referencing_child_is_rejected() {
        let node = TestNode::new(0).child(TestNode::new(1));
        let mut data = rtpc(&node);
        // point the child header back at the root data (offset 20, one child)
        let child_header = 20;
        data[child_header + 4..child_header + 8].copy_from_slice(&20u32.to_le_bytes());
        data[child_header + 10..child_header + 12].copy_from_slice(&1u16.to_le_bytes());
        assert!(matches!(decode(&data), Err(DecodeError::MalformedContainer(_))));
    }

    #[test]
    fn shared_child_is_rejected() {
        let node = TestNode::new(0).child(TestNode::new(1)).child(TestNode::new(2));
        let mut data = rtpc(&node);
        // root data at 20 holds two child headers; aim the second at the first's data
        let first = data[24..28].to_vec();
        data[36..40].copy_from_slice(&first);
        assert!(matches!(decode(&data), Err(DecodeError::MalformedContainer(_))));
    }

    #[test]
    fn diamond_chain_fails_fast() {
        const LEVELS: u32 = 40;
        let node_offset = |level: u32| 20 + 24 * level;
        let mut b = Buf::new();
        b.bytes(b"RTPC").u32(1);
        b.u32(0).u32(node_offset(0)).u16(0).u16(2);
        for level in 0..LEVELS {
            let (next, children) = if level + 1 < LEVELS { (node_offset(level + 1), 2) } else { (0, 0) };
            for _ in 0..2 {
                b.u32(level).u32(next).u16(0).u16(children);
            }
        }
        assert!(matches!(decode(&b.0), Err(DecodeError::MalformedContainer(_))));
    }

    #[test]
    fn truncated_value() {
        let node = TestNode::new(0).prop("name", PropertyValue::String("abc".into()));
        let data = rtpc(&node);
        assert!(matches!(decode(&data[..data.len() - 2]), Err(DecodeError::TruncatedInput { .. })));
    }
}
