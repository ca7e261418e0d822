use std::{
    fmt::{Display, Formatter},
    path::Path,
};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Texture placeholder that marks an unused layered slot.
pub const DUMMY_LAYERED: &str = "dummy_layered_dif";

/// Stable material name used to deduplicate materials across blocks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterialIdentity {
    pub base: String,
    pub hash: Option<String>,
}

impl MaterialIdentity {
    pub fn fixed(name: &str) -> Self { Self { base: name.to_string(), hash: None } }

    /// Builds the identity from a block's texture table.
    ///
    /// The base name comes from slot 0 plus any `layered_slots` that do not
    /// name the placeholder texture. The hash covers every path after slot 0
    /// and the block type name.
    pub fn from_textures(filepaths: &[String], block_name: &str, layered_slots: &[usize]) -> Self {
        let Some(first) = filepaths.first() else {
            return Self { base: block_name.to_string(), hash: Some(short_hash([block_name])) };
        };
        let mut base = clean_texture_name(first);
        for &slot in layered_slots {
            match filepaths.get(slot) {
                Some(path) if !path.is_empty() && !path.contains(DUMMY_LAYERED) => {
                    base.push_str(" - ");
                    base.push_str(&clean_texture_name(path));
                }
                _ => {}
            }
        }
        let parts = filepaths[1..].iter().map(String::as_str).chain([block_name]);
        Self { base, hash: Some(short_hash(parts)) }
    }

    pub fn name(&self) -> String { self.to_string() }
}

impl Display for MaterialIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{} - id:{}", self.base, hash),
            None => f.write_str(&self.base),
        }
    }
}

impl Serialize for MaterialIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// First 8 hex digits of the SHA-256 of the concatenated parts.
pub fn short_hash<'a, I>(parts: I) -> String
where I: IntoIterator<Item = &'a str> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(8);
    hex
}

/// Basename without extension or trailing `_dif`.
pub fn clean_texture_name(path: &str) -> String {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    stem.strip_suffix("_dif").unwrap_or(stem).to_string()
}

/// Model name shared by every LOD of a file: the stem up to `_lod`.
pub fn model_name(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    match stem.split_once("_lod") {
        Some((name, _)) => name.to_string(),
        None => stem.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn paths(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn clean_names() {
        assert_eq!(clean_texture_name("textures/car_body_dif.ddsc"), "car_body");
        assert_eq!(clean_texture_name("textures\\rock_nrm.ddsc"), "rock_nrm");
        assert_eq!(clean_texture_name("plain"), "plain");
        assert_eq!(clean_texture_name("a/dif_detail_dif.dds"), "dif_detail");
    }

    #[test]
    fn hash_distinguishes_secondary_textures() {
        let a = MaterialIdentity::from_textures(
            &paths(&["textures/car_body_dif.ddsc", "textures/car_body_nrm.ddsc"]),
            "General6",
            &[],
        );
        let b = MaterialIdentity::from_textures(
            &paths(&["textures/car_body_dif.ddsc", "textures/car_trim_nrm.ddsc"]),
            "General6",
            &[],
        );
        assert_eq!(a.base, "car_body");
        assert_eq!(b.base, "car_body");
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.hash.as_ref().map(String::len), Some(8));
        assert!(a.name().starts_with("car_body - id:"));
    }

    #[test]
    fn hash_covers_block_type() {
        let list = paths(&["a_dif.ddsc", "b.ddsc"]);
        let a = MaterialIdentity::from_textures(&list, "General6", &[]);
        let b = MaterialIdentity::from_textures(&list, "Landmark", &[]);
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.hash.as_deref(), Some(short_hash(["b.ddsc", "General6"]).as_str()));
    }

    #[test]
    fn known_digest() {
        // sha256("abc")
        assert_eq!(short_hash(["a", "bc"]), "ba7816bf");
    }

    #[test]
    fn layered_slots_skip_placeholders() {
        let mut list = vec![String::new(); 12];
        list[0] = "car/paint_dif.ddsc".into();
        list[10] = "car/dummy_layered_dif.ddsc".into();
        list[11] = "car/stripes_dif.ddsc".into();
        let id = MaterialIdentity::from_textures(&list, "CarPaint14", &[10, 11]);
        assert_eq!(id.base, "paint - stripes");
    }

    #[test]
    fn empty_table_falls_back_to_block_name() {
        let id = MaterialIdentity::from_textures(&[], "Landmark", &[]);
        assert_eq!(id.base, "Landmark");
        assert!(id.hash.is_some());
    }

    #[test]
    fn fixed_names_have_no_hash() {
        assert_eq!(MaterialIdentity::fixed("waterhull").name(), "waterhull");
    }

    #[test]
    fn model_names() {
        assert_eq!(model_name(Path::new("models/car_body_lod1.rbm")), "car_body");
        assert_eq!(model_name(Path::new("rock.rbm")), "rock");
    }
}
