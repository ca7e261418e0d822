pub mod codec;
pub mod layout;

use log::{debug, warn};
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use self::{
    codec::{decompress_normal, snorm16x3, transform_uv, unorm16x2, VSign},
    layout::{BlockLayout, Element, HeaderOp, MaterialNaming},
};
use crate::{
    format::{material::MaterialIdentity, DecodeError, DecodeResult},
    util::reader::ByteCursor,
};

/// Expected value of the u32 that closes every render block.
pub const K_BLOCK_END_MARKER: u32 = 0x89ABCDEF;

pub const MAX_UV_CHANNELS: usize = 3;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub unorm_v_sign: VSign,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [Option<[f32; 2]>; MAX_UV_CHANNELS],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tangent: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bone_index: Option<u16>,
}

/// One decoded render block: a mesh with a single material.
#[derive(Clone, Debug, Serialize)]
pub struct GeometryRecord {
    pub model_name: String,
    #[serde(serialize_with = "serialize_layout")]
    pub block: &'static BlockLayout,
    pub material: MaterialIdentity,
    pub flags: Option<u32>,
    pub material_floats: Vec<f32>,
    pub filepaths: Vec<String>,
    pub vertices: Vec<Vertex>,
    pub faces: Vec<[u16; 3]>,
}

impl GeometryRecord {
    /// UV channels carried by at least one vertex.
    pub fn uv_channels(&self) -> Vec<usize> {
        (0..MAX_UV_CHANNELS).filter(|&ch| self.vertices.iter().any(|v| v.uv[ch].is_some())).collect()
    }
}

fn serialize_layout<S: Serializer>(
    layout: &&'static BlockLayout,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut s = serializer.serialize_struct("Block", 2)?;
    s.serialize_field("name", layout.name)?;
    s.serialize_field("tag", &layout.tag)?;
    s.end()
}

#[derive(Debug, Default)]
struct BlockHeader {
    scale: Option<f32>,
    uv_extents: [Option<[f32; 2]>; MAX_UV_CHANNELS],
    flags: Option<u32>,
    material_floats: Vec<f32>,
    filepaths: Vec<String>,
}

fn read_header(r: &mut ByteCursor, layout: &BlockLayout) -> DecodeResult<BlockHeader> {
    let mut header = BlockHeader::default();
    for op in layout.prelude {
        match *op {
            HeaderOp::Skip(n) => r.skip(n)?,
            HeaderOp::Scale => header.scale = Some(r.read_f32()?),
            HeaderOp::UvExtent(ch) => header.uv_extents[ch] = Some(r.read_f32_array::<2>()?),
            HeaderOp::Flags => header.flags = Some(r.read_u32()?),
            HeaderOp::MaterialFloats(n) => header.material_floats = r.read_f32_vec(n)?,
            HeaderOp::Filepaths => {
                let count = r.read_u32()? as usize;
                // Each entry needs at least its length prefix.
                let mut paths = Vec::with_capacity(count.min(r.remaining() / 4));
                for _ in 0..count {
                    paths.push(r.read_prefixed_string()?);
                }
                header.filepaths = paths;
            }
        }
    }
    Ok(header)
}

fn read_element(
    r: &mut ByteCursor,
    element: Element,
    vertex: &mut Vertex,
    header: &BlockHeader,
    options: DecodeOptions,
) -> DecodeResult<()> {
    match element {
        Element::PositionF32 => vertex.position = r.read_f32_array::<3>()?,
        Element::PositionSnorm16 => {
            let raw = [r.read_i16()?, r.read_i16()?, r.read_i16()?];
            let scale = header.scale.unwrap_or(1.0);
            vertex.position = snorm16x3(raw).map(|c| c * scale);
        }
        Element::BoneIndex => vertex.bone_index = Some(r.read_u16()?),
        Element::UvF32(ch) => vertex.uv[ch] = Some(r.read_f32_array::<2>()?),
        Element::UvF32FlipV(ch) => {
            let [u, v] = r.read_f32_array::<2>()?;
            vertex.uv[ch] = Some([u, -v]);
        }
        Element::UvUnorm16(ch) => {
            let raw = [r.read_u16()?, r.read_u16()?];
            vertex.uv[ch] = Some(unorm16x2(raw, options.unorm_v_sign));
        }
        Element::Normal => vertex.normal = Some(decompress_normal(r.read_u32()?)),
        Element::Tangent => vertex.tangent = Some(decompress_normal(r.read_u32()?)),
        Element::Color => vertex.color = Some(r.read_f32()?),
        Element::Skip(n) => r.skip(n)?,
        Element::SkipIfFlags { mask, bytes } => {
            if header.flags.unwrap_or(0) & mask != 0 {
                r.skip(bytes)?;
            }
        }
    }
    Ok(())
}

fn malformed(layout: &BlockLayout, reason: String) -> DecodeError {
    DecodeError::MalformedGeometry { block: layout.name, reason }
}

/// Decodes one render block. `r` must be positioned just after the tag.
pub fn decode_block(
    r: &mut ByteCursor,
    layout: &'static BlockLayout,
    model_name: &str,
    options: DecodeOptions,
) -> DecodeResult<GeometryRecord> {
    if !layout.supported {
        return Err(DecodeError::UnsupportedBlock { name: layout.name, tag: layout.tag });
    }
    let header = read_header(r, layout)?;

    let mut vertices: Vec<Vertex> = Vec::new();
    for (index, stream) in layout.streams.iter().enumerate() {
        let count = r.read_u32()? as usize;
        if index == 0 {
            let flags = header.flags.unwrap_or(0);
            let stride = stream.iter().map(|e| e.size(flags)).sum::<usize>().max(1);
            vertices.resize_with(count.min(r.remaining() / stride), Vertex::default);
            if vertices.len() < count {
                return Err(DecodeError::TruncatedInput {
                    offset: r.position(),
                    available: r.remaining(),
                });
            }
        } else if count != vertices.len() {
            return Err(malformed(
                layout,
                format!("stream {} has {} vertices, expected {}", index, count, vertices.len()),
            ));
        }
        for vertex in &mut vertices {
            for &element in *stream {
                read_element(r, element, vertex, &header, options)?;
            }
        }
    }

    if let Some(layered) = layout.layered_uv {
        if header.flags.unwrap_or(0) & layered.mask != 0 {
            let count = r.read_u32()? as usize;
            if count != vertices.len() {
                return Err(malformed(
                    layout,
                    format!("layered UV count {} does not match {} vertices", count, vertices.len()),
                ));
            }
            for vertex in &mut vertices {
                vertex.uv[layered.channel] = Some(r.read_f32_array::<2>()?);
            }
        }
    }

    for (ch, extent) in header.uv_extents.iter().enumerate() {
        let Some(extent) = *extent else { continue };
        for vertex in &mut vertices {
            if let Some(uv) = &mut vertex.uv[ch] {
                *uv = transform_uv(*uv, extent);
            }
        }
    }

    let index_count = r.read_u32()? as usize;
    if index_count % 3 != 0 {
        return Err(malformed(layout, format!("index count {} is not a multiple of 3", index_count)));
    }
    if index_count.saturating_mul(2) > r.remaining() {
        return Err(DecodeError::TruncatedInput { offset: r.position(), available: r.remaining() });
    }
    let mut faces = Vec::with_capacity(index_count / 3);
    for _ in 0..index_count / 3 {
        let face = [r.read_u16()?, r.read_u16()?, r.read_u16()?];
        if let Some(&bad) = face.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(malformed(
                layout,
                format!("index {} out of range for {} vertices", bad, vertices.len()),
            ));
        }
        faces.push(face);
    }

    let end = r.read_u32()?;
    if end != K_BLOCK_END_MARKER {
        warn!("{}: unexpected end marker {:#010X} in {}", model_name, end, layout.name);
    }

    let material = match layout.naming {
        MaterialNaming::Fixed(name) => MaterialIdentity::fixed(name),
        MaterialNaming::Textures => {
            MaterialIdentity::from_textures(&header.filepaths, layout.name, layout.layered_slots)
        }
    };
    debug!(
        "{}: {} with {} vertices, {} faces, material '{}'",
        model_name,
        layout.name,
        vertices.len(),
        faces.len(),
        material
    );
    Ok(GeometryRecord {
        model_name: model_name.to_string(),
        block: layout,
        material,
        flags: header.flags,
        material_floats: header.material_floats,
        filepaths: header.filepaths,
        vertices,
        faces,
    })
}
