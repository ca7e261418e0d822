//! World object placements stored in BLO files (RTPC v01).

use log::{debug, warn};
use serde::Serialize;

use crate::format::{
    material::short_hash,
    rtpc::{self, RtpcNode},
    DecodeResult, PlacementEntry,
};

pub const K_CLASS_RIGID_OBJECT: &str = "CRigidObject";
pub const K_CLASS_STATIC_DECAL_OBJECT: &str = "CStaticDecalObject";
pub const K_CLASS_DYNAMIC_LIGHT_OBJECT: &str = "CDynamicLightObject";

pub const IDENTITY: [f32; 16] =
    [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct TextureMapping {
    pub offset: [f32; 2],
    pub tile: [f32; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StaticDecal {
    pub name: String,
    pub material_name: String,
    pub world_matrix: [f32; 16],
    pub parent: Option<usize>,
    pub diffuse_texture: Option<String>,
    pub diffuse_mapping: TextureMapping,
    pub alphamask_texture: Option<String>,
    pub alphamask_mapping: TextureMapping,
    pub alphamask_source_channel: u32,
    pub is_distance_field_stencil: bool,
    pub alpha_min: f32,
    pub alpha_max: f32,
    pub emissive: f32,
    /// Normalized to 0..1.
    pub color: [f32; 3],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Point,
    Spot,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DynamicLight {
    pub name: String,
    pub world_matrix: [f32; 16],
    pub parent: Option<usize>,
    pub kind: LightKind,
    pub color: [f32; 3],
    pub energy: f32,
    pub shadow_soft_size: f32,
    /// Cone angle in radians, for spot lights.
    pub spot_size: Option<f32>,
    pub spot_blend: Option<f32>,
    pub on_during_daytime: bool,
    pub projected_texture: Option<String>,
    pub projected_texture_enabled: bool,
    pub projected_texture_scale: [f32; 2],
}

/// Objects extracted from a BLO container.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BloScene {
    pub objects: Vec<PlacementEntry>,
    pub decals: Vec<StaticDecal>,
    pub lights: Vec<DynamicLight>,
}

fn node_name(node: &RtpcNode) -> String {
    match node.get_str("name") {
        Some(name) => name.to_string(),
        None => format!("{:08X}", node.name_hash),
    }
}

fn node_world(node: &RtpcNode) -> [f32; 16] {
    match node.get("world").and_then(rtpc::PropertyValue::as_mat4) {
        Some(world) => world,
        None => {
            debug!("{}: no world matrix", node_name(node));
            IDENTITY
        }
    }
}

fn texture(node: &RtpcNode, name: &str) -> Option<String> {
    node.get_str(name).filter(|s| !s.is_empty()).map(str::to_string)
}

fn mapping(node: &RtpcNode, prefix: &str) -> TextureMapping {
    let get = |field: &str| node.get_f32(&format!("{prefix}{field}"));
    TextureMapping {
        offset: [get("offset_u").unwrap_or(0.0), get("offset_v").unwrap_or(0.0)],
        tile: [get("tile_u").unwrap_or(1.0), get("tile_v").unwrap_or(1.0)],
    }
}

fn push_f32s(key: &mut String, values: &[f32]) {
    for v in values {
        key.push_str(&format!("{v:?}"));
    }
}

fn read_decal(node: &RtpcNode, parent: Option<usize>) -> StaticDecal {
    let raw_color = node.get("color").and_then(rtpc::PropertyValue::as_vec3).unwrap_or([255.0; 3]);
    let diffuse_texture = texture(node, "diffuse_texture");
    let alphamask_texture = texture(node, "alphamask_texture");
    let is_distance_field_stencil = node.get_bool("is_distance_field_stencil").unwrap_or(false);
    let alphamask_source_channel = node.get_f32("alphamask_source_channel").unwrap_or(0.0) as u32;
    let alpha_min = node.get_f32("alpha_min").unwrap_or(0.0);
    let alpha_max = node.get_f32("alpha_max").unwrap_or(1.0);
    let emissive = node.get_f32("Emissive").unwrap_or(0.0);

    let mut key = format!("{is_distance_field_stencil}{alphamask_source_channel}");
    push_f32s(&mut key, &[alpha_min, alpha_max, emissive]);
    push_f32s(&mut key, &raw_color);
    key.push_str(diffuse_texture.as_deref().unwrap_or(""));
    key.push_str(alphamask_texture.as_deref().unwrap_or(""));

    let name = node_name(node);
    StaticDecal {
        material_name: format!("{} - id:{}", name, short_hash([key.as_str()])),
        name,
        world_matrix: node_world(node),
        parent,
        diffuse_texture,
        diffuse_mapping: mapping(node, ""),
        alphamask_texture,
        alphamask_mapping: mapping(node, "alphamask_"),
        alphamask_source_channel,
        is_distance_field_stencil,
        alpha_min,
        alpha_max,
        emissive,
        color: raw_color.map(|c| c / 255.0),
    }
}

fn read_light(node: &RtpcNode, parent: Option<usize>) -> DynamicLight {
    let diffuse = node.get("diffuse").and_then(rtpc::PropertyValue::as_vec3).unwrap_or([1.0; 3]);
    let is_spot = node.get_bool("is_spot_light").unwrap_or(false);
    let multiplier = node.get_f32("multiplier").unwrap_or(1.0);
    let on_during_daytime = node.get_bool("on_during_daytime").unwrap_or(false);
    let projected_texture = texture(node, "projected_texture");
    let projected_texture_enabled = node.get_bool("projected_texture_enabled").unwrap_or(false);
    let u_scale = node.get_f32("projected_texture_u_scale").unwrap_or(1.0);
    let v_scale = node.get_f32("projected_texture_v_scale").unwrap_or(1.0);
    let radius = node.get_f32("radius").unwrap_or(0.0);
    let spot_angle = node.get_f32("spot_angle").unwrap_or(0.0);
    let spot_inner_angle = node.get_f32("spot_inner_angle").unwrap_or(0.0);

    let mut key = String::new();
    push_f32s(&mut key, &diffuse);
    key.push_str(&format!("{is_spot}{multiplier:?}{on_during_daytime}"));
    key.push_str(projected_texture.as_deref().unwrap_or(""));
    key.push_str(&format!("{projected_texture_enabled}"));
    push_f32s(&mut key, &[u_scale, v_scale, radius, spot_angle, spot_inner_angle]);

    let (kind, spot_size, spot_blend) = if is_spot {
        let blend = if spot_angle != 0.0 { spot_inner_angle / spot_angle } else { 0.0 };
        (LightKind::Spot, Some(spot_angle.to_radians()), Some(blend))
    } else {
        (LightKind::Point, None, None)
    };
    DynamicLight {
        name: format!("Dynamic Light - id:{}", short_hash([key.as_str()])),
        world_matrix: node_world(node),
        parent,
        kind,
        color: diffuse,
        energy: multiplier * 1000.0,
        shadow_soft_size: radius / 3.0,
        spot_size,
        spot_blend,
        on_during_daytime,
        projected_texture,
        projected_texture_enabled,
        projected_texture_scale: [u_scale, v_scale],
    }
}

fn collect(node: &RtpcNode, parent: Option<usize>, scene: &mut BloScene) {
    let mut child_parent = parent;
    if node.is_class(K_CLASS_RIGID_OBJECT) {
        match node.get_str("filename") {
            Some(filename) => {
                let mut entry = PlacementEntry::new(filename.to_string(), node_world(node));
                entry.name = Some(node_name(node));
                entry.parent = parent;
                child_parent = Some(scene.objects.len());
                scene.objects.push(entry);
            }
            None => warn!("Rigid object {} has no filename", node_name(node)),
        }
    } else if node.is_class(K_CLASS_STATIC_DECAL_OBJECT) {
        scene.decals.push(read_decal(node, parent));
    } else if node.is_class(K_CLASS_DYNAMIC_LIGHT_OBJECT) {
        scene.lights.push(read_light(node, parent));
    }
    for child in &node.children {
        collect(child, child_parent, scene);
    }
}

/// Decodes a BLO file and filters it by object class.
pub fn decode(data: &[u8]) -> DecodeResult<BloScene> {
    let container = rtpc::decode(data)?;
    let mut scene = BloScene::default();
    collect(&container.root, None, &mut scene);
    debug!(
        "BLO: {} objects, {} decals, {} lights",
        scene.objects.len(),
        scene.decals.len(),
        scene.lights.len()
    );
    Ok(scene)
}
