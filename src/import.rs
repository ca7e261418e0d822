//! Import session: settings, model path resolution, the per-session model
//! cache and texture resolution for decoded records.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use glam::Mat4;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    format::{
        ddsc_db::{ColourSpace, DdscDatabase},
        material::model_name,
        rbm::{self, RbmModel},
        render_block::{DecodeOptions, GeometryRecord},
        DecodeError, PlacementEntry,
    },
    util::{
        file::map_file,
        transform::{to_host, TransformOptions},
    },
};

/// Filename fragments marking destroyed-state variants.
pub const DEBRIS_MARKERS: [&str; 6] = ["debris", "dest", "dst", "dmg", "deformed", "chaos"];

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Missing file '{}'", path.display())]
    MissingCollaborator { path: PathBuf },
    #[error("Failed to read '{}': {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("'{}' failed to load earlier in this session", path.display())]
    PreviouslyFailed { path: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub extraction_base_path: PathBuf,
    /// Replaces `.ddsc` in texture references.
    pub texture_extension: String,
    pub recursive: bool,
    pub include_debris: bool,
    pub unorm_v_sign: crate::format::render_block::codec::VSign,
    pub child_x_correction: bool,
    pub ddsc_db: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            extraction_base_path: PathBuf::new(),
            texture_extension: ".png".to_string(),
            recursive: false,
            include_debris: true,
            unorm_v_sign: Default::default(),
            child_x_correction: false,
            ddsc_db: None,
        }
    }
}

impl ImportSettings {
    pub fn decode_options(&self) -> DecodeOptions { DecodeOptions { unorm_v_sign: self.unorm_v_sign } }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions { child_x_correction: self.child_x_correction }
    }
}

pub fn is_debris(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    DEBRIS_MARKERS.iter().any(|m| lower.contains(m))
}

fn read_model(path: &Path, options: DecodeOptions) -> Result<RbmModel, ImportError> {
    if !path.is_file() {
        return Err(ImportError::MissingCollaborator { path: path.to_path_buf() });
    }
    let data = map_file(path)
        .map_err(|e| ImportError::Read { path: path.to_path_buf(), message: format!("{e:#}") })?;
    rbm::decode(&data, &model_name(path), options)
        .into_model()
        .map_err(|source| ImportError::Decode { path: path.to_path_buf(), source })
}

/// Decoded models keyed by resolved path. Failed loads are remembered so
/// each file is read at most once per session.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: HashMap<PathBuf, Option<RbmModel>>,
    loads: usize,
}

impl ModelCache {
    pub fn new() -> Self { Self::default() }

    /// Number of files actually read.
    pub fn loads(&self) -> usize { self.loads }

    pub fn len(&self) -> usize { self.models.len() }

    pub fn is_empty(&self) -> bool { self.models.is_empty() }

    pub fn get(&self, path: &Path) -> Option<&RbmModel> { self.models.get(path).and_then(Option::as_ref) }

    pub fn load(&mut self, path: &Path, options: DecodeOptions) -> Result<&RbmModel, ImportError> {
        if !self.models.contains_key(path) {
            self.loads += 1;
            match read_model(path, options) {
                Ok(model) => {
                    info!("Loaded {} ({} blocks)", path.display(), model.records.len());
                    self.models.insert(path.to_path_buf(), Some(model));
                }
                Err(e) => {
                    self.models.insert(path.to_path_buf(), None);
                    return Err(e);
                }
            }
        }
        self.get(path).ok_or_else(|| ImportError::PreviouslyFailed { path: path.to_path_buf() })
    }
}

/// One placed copy of a cached model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instance {
    pub name: Option<String>,
    /// Key into the session's [`ModelCache`].
    pub model_path: PathBuf,
    pub world: Mat4,
    /// Index into the returned instance list.
    pub parent: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextureBinding {
    pub slot: usize,
    pub path: PathBuf,
    pub colour_space: ColourSpace,
    pub uv_channel: usize,
}

#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: Result<RbmModel, ImportError>,
}

pub struct ImportSession {
    pub settings: ImportSettings,
    pub cache: ModelCache,
    ddsc: DdscDatabase,
}

impl ImportSession {
    pub fn new(settings: ImportSettings) -> Self {
        let ddsc = match &settings.ddsc_db {
            Some(path) => DdscDatabase::load(path),
            None => DdscDatabase::default(),
        };
        Self { settings, cache: ModelCache::new(), ddsc }
    }

    pub fn with_ddsc_db(settings: ImportSettings, ddsc: DdscDatabase) -> Self {
        Self { settings, cache: ModelCache::new(), ddsc }
    }

    /// Maps a placement reference to the RBM file holding its first LOD.
    pub fn resolve_model_path(&self, reference: &str) -> PathBuf {
        let path = self.settings.extraction_base_path.join(reference.replace(".lod", "_lod1.rbm"));
        path.canonicalize().unwrap_or(path)
    }

    /// Decodes each file on its own. A failing file contributes no records
    /// and does not stop the rest of the batch.
    pub fn decode_batch(&self, paths: &[PathBuf]) -> Vec<BatchItem> {
        let options = self.settings.decode_options();
        paths
            .iter()
            .map(|path| {
                let result = read_model(path, options);
                match &result {
                    Ok(model) => info!("{}: {} records", path.display(), model.records.len()),
                    Err(e) => warn!("{}", e),
                }
                BatchItem { path: path.clone(), result }
            })
            .collect()
    }

    /// Resolves and loads the models referenced by `entries`, returning one
    /// instance per placement that could be loaded.
    pub fn instantiate(&mut self, entries: &[PlacementEntry]) -> Vec<Instance> {
        let options = self.settings.decode_options();
        let transform = self.settings.transform_options();
        let mut worlds: Vec<Mat4> = Vec::with_capacity(entries.len());
        let mut instance_of: Vec<Option<usize>> = Vec::with_capacity(entries.len());
        // Debris skips its whole subtree.
        let mut excluded: Vec<bool> = Vec::with_capacity(entries.len());
        let mut instances = Vec::new();
        for entry in entries {
            let parent_world = entry.parent.and_then(|p| worlds.get(p));
            let world = to_host(&entry.world_matrix, parent_world, transform);
            worlds.push(world);
            instance_of.push(None);

            let parent_excluded = entry.parent.and_then(|p| excluded.get(p).copied()).unwrap_or(false);
            let debris = !self.settings.include_debris && is_debris(&entry.referenced_path);
            excluded.push(parent_excluded || debris);
            if parent_excluded {
                continue;
            }
            if debris {
                info!("Skipping debris model {}", entry.referenced_path);
                continue;
            }
            let model_path = self.resolve_model_path(&entry.referenced_path);
            if let Err(e) = self.cache.load(&model_path, options) {
                warn!("{}", e);
                continue;
            }
            if let Some(slot) = instance_of.last_mut() {
                *slot = Some(instances.len());
            }
            instances.push(Instance {
                name: entry.name.clone(),
                model_path,
                world,
                parent: entry.parent.and_then(|p| instance_of.get(p).copied().flatten()),
            });
        }
        instances
    }

    /// Resolves the texture slots of a record to files on disk.
    pub fn resolve_textures(&self, record: &GeometryRecord) -> Vec<TextureBinding> {
        let layout = record.block;
        let mut bindings = Vec::new();
        for (slot, texture) in record.filepaths.iter().enumerate() {
            if texture.is_empty() {
                continue;
            }
            let path = self
                .settings
                .extraction_base_path
                .join(texture.replace(".ddsc", &self.settings.texture_extension));
            if !path.is_file() {
                warn!("{}", ImportError::MissingCollaborator { path });
                continue;
            }
            let colour_space = self.ddsc.colour_space(texture).unwrap_or(if layout.is_srgb_slot(slot) {
                ColourSpace::Srgb
            } else {
                ColourSpace::NonColor
            });
            bindings.push(TextureBinding { slot, path, colour_space, uv_channel: layout.uv_channel(slot) });
        }
        bindings
    }
}
