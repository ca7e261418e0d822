//! Builders for synthetic test buffers.

use crate::{
    format::{
        render_block::{
            layout::{K_TAG_LANDMARK, K_TAG_WATER_HULL},
            K_BLOCK_END_MARKER,
        },
        rtpc::PropertyValue,
    },
    util::hash::name_hash,
};

#[derive(Default)]
pub struct Buf(pub Vec<u8>);

impl Buf {
    pub fn new() -> Self { Self::default() }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self { self.bytes(&v.to_le_bytes()) }

    pub fn i16(&mut self, v: i16) -> &mut Self { self.bytes(&v.to_le_bytes()) }

    pub fn u32(&mut self, v: u32) -> &mut Self { self.bytes(&v.to_le_bytes()) }

    pub fn u64(&mut self, v: u64) -> &mut Self { self.bytes(&v.to_le_bytes()) }

    pub fn f32(&mut self, v: f32) -> &mut Self { self.bytes(&v.to_le_bytes()) }

    pub fn f32s(&mut self, v: &[f32]) -> &mut Self {
        for &f in v {
            self.f32(f);
        }
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.0.extend_from_slice(v);
        self
    }

    pub fn zeros(&mut self, n: usize) -> &mut Self {
        self.0.resize(self.0.len() + n, 0);
        self
    }

    /// u32 length followed by the bytes.
    pub fn string(&mut self, s: &str) -> &mut Self { self.u32(s.len() as u32).bytes(s.as_bytes()) }

    pub fn cstring(&mut self, s: &str) -> &mut Self { self.bytes(s.as_bytes()).u8(0) }

    pub fn pad_to(&mut self, align: usize) -> &mut Self {
        while self.0.len() % align != 0 {
            self.0.push(0);
        }
        self
    }
}

fn indices(b: &mut Buf, list: &[u16]) {
    b.u32(list.len() as u32);
    for &i in list {
        b.u16(i);
    }
    b.u32(K_BLOCK_END_MARKER);
}

pub fn water_hull(positions: &[[f32; 3]], faces: &[u16]) -> Vec<u8> {
    let mut b = Buf::new();
    b.u32(K_TAG_WATER_HULL.0).zeros(21).u32(positions.len() as u32);
    for p in positions {
        b.f32s(p);
    }
    indices(&mut b, faces);
    b.0
}

pub struct SnormVertex {
    pub position: [i16; 3],
    pub bone: u16,
    pub uv: [u16; 2],
    pub color: f32,
}

pub fn landmark(paths: &[&str], vertices: &[SnormVertex], faces: &[u16]) -> Vec<u8> {
    let mut b = Buf::new();
    b.u32(K_TAG_LANDMARK.0).zeros(89).u32(paths.len() as u32);
    for path in paths {
        b.string(path);
    }
    b.zeros(16).u32(vertices.len() as u32);
    for v in vertices {
        b.i16(v.position[0]).i16(v.position[1]).i16(v.position[2]).u16(v.bone);
    }
    b.u32(vertices.len() as u32);
    for v in vertices {
        b.u16(v.uv[0]).u16(v.uv[1]).f32(v.color);
    }
    indices(&mut b, faces);
    b.0
}

/// RBM container around already encoded blocks.
pub fn rbm(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut b = Buf::new();
    b.u32(5).bytes(b"RBMDL").u32(1).u32(16).u32(29);
    b.f32s(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
    b.u32(blocks.len() as u32).zeros(4);
    for block in blocks {
        b.bytes(block);
    }
    b.0
}

pub struct TestNode {
    pub name_hash: u32,
    pub properties: Vec<(u32, PropertyValue)>,
    pub children: Vec<TestNode>,
}

impl TestNode {
    pub fn new(name_hash: u32) -> Self { Self { name_hash, properties: vec![], children: vec![] } }

    pub fn prop(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.push((name_hash(name), value));
        self
    }

    pub fn child(mut self, child: TestNode) -> Self {
        self.children.push(child);
        self
    }
}

fn patch_u32(b: &mut Buf, at: usize, v: u32) { b.0[at..at + 4].copy_from_slice(&v.to_le_bytes()); }

fn write_node_header(b: &mut Buf, at: usize, node: &TestNode, data_offset: usize) {
    patch_u32(b, at, node.name_hash);
    patch_u32(b, at + 4, data_offset as u32);
    b.0[at + 8..at + 10].copy_from_slice(&(node.properties.len() as u16).to_le_bytes());
    b.0[at + 10..at + 12].copy_from_slice(&(node.children.len() as u16).to_le_bytes());
}

fn write_value(b: &mut Buf, value: &PropertyValue) -> u32 {
    match value {
        PropertyValue::Unassigned => return 0,
        PropertyValue::U32(v) | PropertyValue::Deprecated(v) => return *v,
        PropertyValue::F32(v) => return v.to_bits(),
        _ => {}
    }
    b.pad_to(4);
    let offset = b.0.len() as u32;
    match value {
        PropertyValue::String(s) => {
            b.cstring(s);
        }
        PropertyValue::Vec2(v) => {
            b.f32s(v);
        }
        PropertyValue::Vec3(v) => {
            b.f32s(v);
        }
        PropertyValue::Vec4(v) => {
            b.f32s(v);
        }
        PropertyValue::Mat3x3(v) => {
            b.f32s(v);
        }
        PropertyValue::Mat4x4(v) => {
            b.f32s(v);
        }
        PropertyValue::U32Array(v) => {
            b.u32(v.len() as u32);
            for &x in v {
                b.u32(x);
            }
        }
        PropertyValue::F32Array(v) => {
            b.u32(v.len() as u32).f32s(v);
        }
        PropertyValue::Bytes(v) => {
            b.u32(v.len() as u32).bytes(v);
        }
        PropertyValue::ObjectId(v) => {
            b.u64(*v);
        }
        PropertyValue::Events(v) => {
            b.u32(v.len() as u32);
            for &(x, y) in v {
                b.u32(x).u32(y);
            }
        }
        _ => unreachable!(),
    }
    offset
}

fn write_node(b: &mut Buf, node: &TestNode) -> usize {
    b.pad_to(4);
    let data_offset = b.0.len();
    let table = data_offset;
    b.zeros(node.properties.len() * 9).pad_to(4);
    let children = b.0.len();
    b.zeros(node.children.len() * 12);
    for (i, (hash, value)) in node.properties.iter().enumerate() {
        let raw = write_value(b, value);
        let at = table + i * 9;
        patch_u32(b, at, *hash);
        patch_u32(b, at + 4, raw);
        b.0[at + 8] = value.type_id();
    }
    for (i, child) in node.children.iter().enumerate() {
        let child_offset = write_node(b, child);
        write_node_header(b, children + i * 12, child, child_offset);
    }
    data_offset
}

/// RTPC v01 container with `root` as its root node.
pub fn rtpc(root: &TestNode) -> Vec<u8> {
    let mut b = Buf::new();
    b.bytes(b"RTPC").u32(1).zeros(12);
    let data_offset = write_node(&mut b, root);
    write_node_header(&mut b, 8, root, data_offset);
    b.0
}
