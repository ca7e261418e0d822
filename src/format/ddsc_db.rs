//! Texture colour space table (`ddsc.db`).
//!
//! The file is a sequence of `{path} {u16 flags} ` records with ASCII paths
//! and little-endian flags.

use std::{collections::HashMap, path::Path};

use log::{debug, warn};
use serde::Serialize;

use crate::util::file::map_file;

pub const DDSC_FLAG_SRGB: u16 = 0x8;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColourSpace {
    Srgb,
    NonColor,
}

impl ColourSpace {
    pub fn from_flags(flags: u16) -> Self {
        if flags & DDSC_FLAG_SRGB != 0 {
            ColourSpace::Srgb
        } else {
            ColourSpace::NonColor
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DdscDatabase {
    flags: HashMap<String, u16>,
}

impl DdscDatabase {
    /// Parses the table, stopping at the first malformed record.
    pub fn parse(data: &[u8]) -> Self {
        let mut flags = HashMap::new();
        let mut rest = data;
        loop {
            let Some(space) = rest.iter().position(|&b| b == b' ') else {
                break;
            };
            let path = String::from_utf8_lossy(&rest[..space]).into_owned();
            rest = &rest[space + 1..];
            let [lo, hi, sep, ..] = *rest else {
                if rest.len() == 2 {
                    warn!("ddsc.db: missing separator after flags of '{}'", path);
                } else {
                    warn!("ddsc.db: truncated flags for '{}'", path);
                }
                break;
            };
            if sep != b' ' {
                warn!("ddsc.db: unexpected byte {:#04X} after flags of '{}'", sep, path);
                break;
            }
            flags.insert(path, u16::from_le_bytes([lo, hi]));
            rest = &rest[3..];
        }
        Self { flags }
    }

    /// Loads the table from disk. A missing or unreadable file yields an empty table.
    pub fn load(path: &Path) -> Self {
        match map_file(path) {
            Ok(data) => {
                let db = Self::parse(&data);
                debug!("Loaded {} entries from {}", db.len(), path.display());
                db
            }
            Err(e) => {
                warn!("Failed to read {}: {:?}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize { self.flags.len() }

    pub fn is_empty(&self) -> bool { self.flags.is_empty() }

    pub fn flags(&self, path: &str) -> Option<u16> { self.flags.get(path).copied() }

    /// Colour space for a texture, looked up under its `.ddsc` name.
    pub fn colour_space(&self, texture_path: &str) -> Option<ColourSpace> {
        let key = match texture_path.rsplit_once('.') {
            Some((stem, _)) => format!("{stem}.ddsc"),
            None => format!("{texture_path}.ddsc"),
        };
        self.flags(&key).map(ColourSpace::from_flags)
    }
}
