use binrw::binread;
use log::{debug, warn};
use serde::Serialize;

use crate::{
    format::{
        render_block::{decode_block, layout::find_layout, DecodeOptions, GeometryRecord},
        BlockTag, CAABox, DecodeError, DecodeResult,
    },
    util::reader::ByteCursor,
};

pub const RBM_MAGIC: [u8; 5] = *b"RBMDL";
// Magic, versions, bounds, block count and padding
pub const RBM_HEADER_SIZE: usize = 53;

#[binread]
#[derive(Clone, Debug)]
pub struct RbmHeader {
    pub magic_len: u32,
    pub magic: [u8; 5],
    pub version: [u32; 3],
    pub bounds: CAABox,
    #[br(pad_after = 4)]
    pub block_count: u32,
}

/// A fully decoded RBM file.
#[derive(Clone, Debug, Serialize)]
pub struct RbmModel {
    pub model_name: String,
    pub bounds: CAABox,
    pub records: Vec<GeometryRecord>,
}

/// Outcome of decoding an RBM file.
///
/// Blocks carry no length, so the first failure ends the file. Records
/// decoded before it are kept here for reporting.
#[derive(Debug)]
pub struct RbmDecode {
    pub model_name: String,
    pub header: Option<RbmHeader>,
    pub records: Vec<GeometryRecord>,
    pub failure: Option<DecodeError>,
}

impl RbmDecode {
    pub fn is_complete(&self) -> bool { self.failure.is_none() }

    /// Returns the model only if every block decoded.
    pub fn into_model(self) -> DecodeResult<RbmModel> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        let bounds = self.header.map(|h| h.bounds).unwrap_or_default();
        Ok(RbmModel { model_name: self.model_name, bounds, records: self.records })
    }
}

fn read_header(r: &mut ByteCursor) -> DecodeResult<RbmHeader> {
    r.require(RBM_HEADER_SIZE)?;
    let header: RbmHeader = r.read_type()?;
    if header.magic_len as usize != RBM_MAGIC.len() || header.magic != RBM_MAGIC {
        return Err(DecodeError::BadMagic {
            expected: "RBMDL".to_string(),
            found: String::from_utf8_lossy(&header.magic).into_owned(),
        });
    }
    Ok(header)
}

fn decode_blocks(
    r: &mut ByteCursor,
    header: &RbmHeader,
    model_name: &str,
    options: DecodeOptions,
    records: &mut Vec<GeometryRecord>,
) -> DecodeResult<()> {
    for index in 0..header.block_count {
        let offset = r.position();
        let tag = BlockTag(r.read_u32()?);
        let Some(layout) = find_layout(tag) else {
            warn!("{}: unknown render block {} at {:#X}", model_name, tag, offset);
            return Err(DecodeError::UnknownBlockTag { tag, offset });
        };
        debug!("{}: block {}/{} {} at {:#X}", model_name, index + 1, header.block_count, layout.name, offset);
        records.push(decode_block(r, layout, model_name, options)?);
    }
    if r.remaining() != 0 {
        debug!("{}: {} trailing bytes", model_name, r.remaining());
    }
    Ok(())
}

/// Decodes an RBM file held in memory.
pub fn decode(data: &[u8], model_name: &str, options: DecodeOptions) -> RbmDecode {
    let mut r = ByteCursor::new(data);
    let mut result =
        RbmDecode { model_name: model_name.to_string(), header: None, records: vec![], failure: None };
    let header = match read_header(&mut r) {
        Ok(header) => header,
        Err(e) => {
            result.failure = Some(e);
            return result;
        }
    };
    debug!("{}: version {:?}, {} blocks", model_name, header.version, header.block_count);
    if let Err(e) = decode_blocks(&mut r, &header, model_name, options, &mut result.records) {
        result.failure = Some(e);
    }
    result.header = Some(header);
    result
}
