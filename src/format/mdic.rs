use std::path::Path;

use binrw::binread;
use log::debug;

use crate::{
    format::{DecodeError, DecodeResult, PlacementEntry},
    util::reader::ByteCursor,
};

pub const MDIC_MAGIC: u32 = 4801613;
pub const MDIC_VERSION: u32 = 12;
pub const MDIC_HEADER_SIZE: usize = 32;

#[binread]
#[derive(Clone, Debug)]
pub struct MdicHeader {
    pub magic: u32,
    pub version: u32,
    pub path_count: u32,
    pub matrix_count: u32,
    pub path_blob_len: u32,
    pub reserved: [u32; 3],
}

fn read_paths(blob: &[u8], count: u32) -> DecodeResult<Vec<String>> {
    let mut r = ByteCursor::new(blob);
    let mut paths = Vec::with_capacity((count as usize).min(blob.len()));
    for _ in 0..count {
        match r.read_cstring() {
            Ok(path) => paths.push(path),
            Err(DecodeError::TruncatedInput { .. }) => {
                return Err(DecodeError::MalformedPlacement(format!(
                    "path blob holds {} of {} paths",
                    paths.len(),
                    count
                )));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(paths)
}

/// Instances are named after the referenced file, without directory or extension.
fn instance_name(path: &str) -> String {
    match Path::new(path).file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Decodes an MDIC instancing file.
pub fn decode(data: &[u8]) -> DecodeResult<Vec<PlacementEntry>> {
    let mut r = ByteCursor::new(data);
    r.require(MDIC_HEADER_SIZE)?;
    let header: MdicHeader = r.read_type()?;
    if header.magic != MDIC_MAGIC {
        return Err(DecodeError::BadMagic {
            expected: MDIC_MAGIC.to_string(),
            found: header.magic.to_string(),
        });
    }
    if header.version != MDIC_VERSION {
        return Err(DecodeError::UnsupportedVersion { version: header.version, expected: MDIC_VERSION });
    }

    let blob = r.read_bytes(header.path_blob_len as usize)?;
    let paths = read_paths(blob, header.path_count)?;

    let matrix_count = header.matrix_count as usize;
    r.require(matrix_count.saturating_mul(64 + 2))?;
    let mut matrices = Vec::with_capacity(matrix_count);
    for _ in 0..matrix_count {
        matrices.push(r.read_f32_array::<16>()?);
    }

    let mut entries = Vec::with_capacity(matrix_count);
    for world_matrix in matrices {
        let index = r.read_u16()? as usize;
        let Some(path) = paths.get(index) else {
            return Err(DecodeError::MalformedPlacement(format!(
                "path index {} out of range for {} paths",
                index,
                paths.len()
            )));
        };
        let mut entry = PlacementEntry::new(path.clone(), world_matrix);
        entry.name = Some(instance_name(path));
        entries.push(entry);
    }
    debug!("MDIC: {} paths, {} instances", paths.len(), entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::fixtures::Buf;

    const IDENTITY: [f32; 16] =
        [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

    fn mdic(magic: u32, version: u32, paths: &[&str], instances: &[([f32; 16], u16)]) -> Vec<u8> {
        let blob: Vec<u8> = paths.iter().flat_map(|p| p.bytes().chain([0])).collect();
        let mut b = Buf::new();
        b.u32(magic).u32(version).u32(paths.len() as u32).u32(instances.len() as u32);
        b.u32(blob.len() as u32).zeros(12).bytes(&blob);
        for (m, _) in instances {
            b.f32s(m);
        }
        for (_, index) in instances {
            b.u16(*index);
        }
        b.0
    }

    #[test]
    fn single_instance() {
        let data = mdic(MDIC_MAGIC, MDIC_VERSION, &["foo.rbm"], &[(IDENTITY, 0)]);
        let entries = decode(&data).unwrap();
        let mut expected = PlacementEntry::new("foo.rbm".to_string(), IDENTITY);
        expected.name = Some("foo".to_string());
        assert_eq!(entries, vec![expected]);
    }

    #[test]
    fn indices_select_paths() {
        let mut moved = IDENTITY;
        moved[12] = 5.0;
        let data = mdic(MDIC_MAGIC, MDIC_VERSION, &["a.rbm", "b.rbm"], &[(IDENTITY, 1), (moved, 0), (moved, 1)]);
        let entries = decode(&data).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.referenced_path.as_str()).collect();
        assert_eq!(paths, vec!["b.rbm", "a.rbm", "b.rbm"]);
        assert_eq!(entries[1].world_matrix[12], 5.0);
    }

    #[test]
    fn instances_named_after_file_stem() {
        let data = mdic(MDIC_MAGIC, MDIC_VERSION, &["editor/props/barrel_01.lod"], &[(IDENTITY, 0)]);
        let entries = decode(&data).unwrap();
        assert_eq!(entries[0].name.as_deref(), Some("barrel_01"));
    }

    #[test]
    fn wrong_magic() {
        let data = mdic(0x1234, MDIC_VERSION, &["foo.rbm"], &[(IDENTITY, 0)]);
        assert!(matches!(decode(&data), Err(DecodeError::BadMagic { .. })));
    }

    #[test]
    fn wrong_version() {
        let data = mdic(MDIC_MAGIC, 11, &["foo.rbm"], &[(IDENTITY, 0)]);
        assert!(matches!(
            decode(&data),
            Err(DecodeError::UnsupportedVersion { version: 11, expected: MDIC_VERSION })
        ));
    }

    #[test]
    fn index_out_of_range() {
        let data = mdic(MDIC_MAGIC, MDIC_VERSION, &["foo.rbm"], &[(IDENTITY, 1)]);
        assert!(matches!(decode(&data), Err(DecodeError::MalformedPlacement(_))));
    }

    #[test]
    fn short_path_blob() {
        let mut data = mdic(MDIC_MAGIC, MDIC_VERSION, &["foo.rbm"], &[(IDENTITY, 0)]);
        // claim two paths
        data[8..12].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(decode(&data), Err(DecodeError::MalformedPlacement(_))));
    }

    #[test]
    fn truncated_matrices() {
        let data = mdic(MDIC_MAGIC, MDIC_VERSION, &["foo.rbm"], &[(IDENTITY, 0)]);
        assert!(matches!(decode(&data[..data.len() - 8]), Err(DecodeError::TruncatedInput { .. })));
    }
}
