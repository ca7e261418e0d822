//! Byte layouts of the known render block types.
//!
//! Every block is read by the same interpreter; the types below only describe
//! where each field sits. Offsets and counts follow the latest revision of
//! each block seen in shipped data.

use crate::format::BlockTag;

/// Fields between the block tag and the first vertex stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderOp {
    Skip(usize),
    /// f32 multiplier applied to snorm16 positions.
    Scale,
    /// f32 pair used by [`super::codec::transform_uv`] on the given channel.
    UvExtent(usize),
    Flags,
    MaterialFloats(usize),
    /// u32 count of length-prefixed texture paths.
    Filepaths,
}

/// One field of a vertex in a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Element {
    PositionF32,
    /// snorm16 triplet, multiplied by the block scale when present.
    PositionSnorm16,
    BoneIndex,
    UvF32(usize),
    /// f32 pair with V negated.
    UvF32FlipV(usize),
    UvUnorm16(usize),
    Normal,
    Tangent,
    Color,
    Skip(usize),
    SkipIfFlags { mask: u32, bytes: usize },
}

impl Element {
    /// Encoded size given the block flags.
    pub fn size(self, flags: u32) -> usize {
        match self {
            Element::PositionF32 => 12,
            Element::PositionSnorm16 => 6,
            Element::BoneIndex => 2,
            Element::UvF32(_) | Element::UvF32FlipV(_) => 8,
            Element::UvUnorm16(_) => 4,
            Element::Normal | Element::Tangent | Element::Color => 4,
            Element::Skip(n) => n,
            Element::SkipIfFlags { mask, bytes } => {
                if flags & mask != 0 {
                    bytes
                } else {
                    0
                }
            }
        }
    }
}

/// Optional trailing UV channel stored as a u32 count and f32 pairs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayeredUv {
    pub mask: u32,
    pub channel: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialNaming {
    /// Derived from the first texture path plus a hash of the rest.
    Textures,
    Fixed(&'static str),
}

#[derive(Debug)]
pub struct BlockLayout {
    pub name: &'static str,
    pub tag: BlockTag,
    pub prelude: &'static [HeaderOp],
    pub streams: &'static [&'static [Element]],
    pub layered_uv: Option<LayeredUv>,
    pub flag_names: &'static [(u32, &'static str)],
    pub naming: MaterialNaming,
    /// UV channel per texture slot; slots past the end use channel 0.
    pub slot_uv: &'static [usize],
    /// Texture slots treated as colour data when the DDSC table has no entry.
    pub srgb_slots: &'static [usize],
    /// Texture slots ignored when they name a placeholder texture.
    pub layered_slots: &'static [usize],
    /// `false` for blocks that are known by name but whose layout is not.
    pub supported: bool,
}

impl BlockLayout {
    pub fn uv_channel(&self, slot: usize) -> usize { self.slot_uv.get(slot).copied().unwrap_or(0) }

    pub fn is_srgb_slot(&self, slot: usize) -> bool { self.srgb_slots.contains(&slot) }

    /// Names of the flag bits set in `flags`.
    pub fn flags_set(&self, flags: u32) -> Vec<&'static str> {
        self.flag_names.iter().filter(|(bit, _)| flags & bit != 0).map(|(_, name)| *name).collect()
    }
}

pub const K_TAG_CAR_PAINT_14: BlockTag = BlockTag(0x483304D6);
pub const K_TAG_WINDOW: BlockTag = BlockTag(0x5B2003F6);
pub const K_TAG_CAR_LIGHT: BlockTag = BlockTag(0xDB948BF1);
pub const K_TAG_BAVARIUM_SHIELD: BlockTag = BlockTag(0xA5D24CCD);
pub const K_TAG_WATER_HULL: BlockTag = BlockTag(0xF99C72A1);
pub const K_TAG_GENERAL_6: BlockTag = BlockTag(0xDBCA53CE);
pub const K_TAG_FOLIAGE_BARK_2: BlockTag = BlockTag(0x048C8394);
pub const K_TAG_LANDMARK: BlockTag = BlockTag(0x3B630E6D);
pub const K_TAG_LAYERED: BlockTag = BlockTag(0xC7021EE3);
pub const K_TAG_VEGETATION_FOLIAGE: BlockTag = BlockTag(0xD79884C6);
pub const K_TAG_GENERAL_MK3: BlockTag = BlockTag(0x2CEC5AD5);

pub const CAR_PAINT_DECALS: u32 = 0x1;
pub const CAR_PAINT_DAMAGE_BLEND: u32 = 0x2;
pub const CAR_PAINT_DIRT: u32 = 0x4;
pub const CAR_PAINT_SOFT_TINT: u32 = 0x10;
pub const CAR_PAINT_LAYERED: u32 = 0x20;
pub const CAR_PAINT_OVERLAY: u32 = 0x40;
pub const CAR_PAINT_DISABLE_BACKFACE_CULLING: u32 = 0x80;
pub const CAR_PAINT_ALPHABLENDING: u32 = 0x100;
pub const CAR_PAINT_ALPHATESTING: u32 = 0x200;
pub const CAR_PAINT_IS_DEFORM: u32 = 0x1000;
pub const CAR_PAINT_IS_SKINNED: u32 = 0x2000;

pub const GENERAL_6_BACKFACE_CULLING: u32 = 0x1;
pub const GENERAL_6_ALPHABLENDING: u32 = 0x2;
pub const GENERAL_6_ALPHATESTING: u32 = 0x4;

pub const FOLIAGE_BARK_2_LAYERED: u32 = 0x40;

const LANDMARK_STREAMS: &[&[Element]] = &[
    &[Element::PositionSnorm16, Element::BoneIndex],
    &[Element::UvUnorm16(0), Element::Color],
];

pub static CAR_PAINT_14: BlockLayout = BlockLayout {
    name: "CarPaint14",
    tag: K_TAG_CAR_PAINT_14,
    prelude: &[
        HeaderOp::Skip(1),
        HeaderOp::Flags,
        HeaderOp::Skip(4),
        HeaderOp::MaterialFloats(98),
        // control point remap table
        HeaderOp::Skip(1024),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[
        &[Element::PositionF32, Element::SkipIfFlags { mask: CAR_PAINT_IS_DEFORM, bytes: 12 }],
        &[
            Element::UvF32FlipV(0),
            Element::UvF32FlipV(1),
            Element::Normal,
            Element::Tangent,
            Element::SkipIfFlags { mask: CAR_PAINT_IS_DEFORM, bytes: 8 },
        ],
    ],
    layered_uv: Some(LayeredUv { mask: CAR_PAINT_LAYERED | CAR_PAINT_OVERLAY, channel: 2 }),
    flag_names: &[
        (CAR_PAINT_DECALS, "SUPPORT_DECALS"),
        (CAR_PAINT_DAMAGE_BLEND, "SUPPORT_DAMAGE_BLEND"),
        (CAR_PAINT_DIRT, "SUPPORT_DIRT"),
        (CAR_PAINT_SOFT_TINT, "SUPPORT_SOFT_TINT"),
        (CAR_PAINT_LAYERED, "SUPPORT_LAYERED"),
        (CAR_PAINT_OVERLAY, "SUPPORT_OVERLAY"),
        (CAR_PAINT_DISABLE_BACKFACE_CULLING, "DISABLE_BACKFACE_CULLING"),
        (CAR_PAINT_ALPHABLENDING, "TRANSPARENCY_ALPHABLENDING"),
        (CAR_PAINT_ALPHATESTING, "TRANSPARENCY_ALPHATESTING"),
        (CAR_PAINT_IS_DEFORM, "IS_DEFORM"),
        (CAR_PAINT_IS_SKINNED, "IS_SKINNED"),
    ],
    naming: MaterialNaming::Textures,
    slot_uv: &[0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 2, 2],
    srgb_slots: &[0, 5, 7, 10, 11],
    layered_slots: &[10, 11],
    supported: true,
};

pub static WINDOW: BlockLayout = BlockLayout {
    name: "Window",
    tag: K_TAG_WINDOW,
    prelude: &[
        HeaderOp::Skip(1),
        HeaderOp::MaterialFloats(6),
        HeaderOp::Skip(16),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[&[
        Element::PositionF32,
        Element::UvF32(0),
        Element::UvF32(1),
        Element::Normal,
        Element::Tangent,
        Element::Color,
    ]],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static CAR_LIGHT: BlockLayout = BlockLayout {
    name: "CarLight",
    tag: K_TAG_CAR_LIGHT,
    prelude: &[
        HeaderOp::Skip(5),
        HeaderOp::MaterialFloats(14),
        HeaderOp::Skip(1024),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[
        &[Element::PositionF32],
        &[Element::UvF32(0), Element::UvF32(1), Element::Normal, Element::Tangent],
    ],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static BAVARIUM_SHIELD: BlockLayout = BlockLayout {
    name: "BavariumShield",
    tag: K_TAG_BAVARIUM_SHIELD,
    prelude: &[
        HeaderOp::Skip(1),
        HeaderOp::MaterialFloats(4),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[&[Element::PositionF32, Element::UvF32FlipV(0), Element::Normal, Element::Tangent]],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Fixed("bavarium_shield"),
    slot_uv: &[],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static WATER_HULL: BlockLayout = BlockLayout {
    name: "WaterHull",
    tag: K_TAG_WATER_HULL,
    prelude: &[HeaderOp::Skip(21)],
    streams: &[&[Element::PositionF32]],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Fixed("waterhull"),
    slot_uv: &[],
    srgb_slots: &[],
    layered_slots: &[],
    supported: true,
};

pub static GENERAL_6: BlockLayout = BlockLayout {
    name: "General6",
    tag: K_TAG_GENERAL_6,
    prelude: &[
        HeaderOp::Skip(13),
        HeaderOp::Scale,
        HeaderOp::UvExtent(0),
        HeaderOp::UvExtent(1),
        HeaderOp::Skip(8),
        HeaderOp::Flags,
        HeaderOp::Skip(24),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[
        &[Element::PositionSnorm16, Element::BoneIndex],
        &[
            Element::UvUnorm16(0),
            Element::UvUnorm16(1),
            Element::Normal,
            Element::Tangent,
            Element::Color,
        ],
    ],
    layered_uv: None,
    flag_names: &[
        (GENERAL_6_BACKFACE_CULLING, "BACKFACE_CULLING"),
        (GENERAL_6_ALPHABLENDING, "TRANSPARENCY_ALPHABLENDING"),
        (GENERAL_6_ALPHATESTING, "TRANSPARENCY_ALPHATESTING"),
    ],
    naming: MaterialNaming::Textures,
    slot_uv: &[0, 0, 0, 1],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static FOLIAGE_BARK_2: BlockLayout = BlockLayout {
    name: "FoliageBark2",
    tag: K_TAG_FOLIAGE_BARK_2,
    prelude: &[
        HeaderOp::Skip(1),
        HeaderOp::Scale,
        HeaderOp::UvExtent(0),
        HeaderOp::UvExtent(1),
        HeaderOp::Skip(75),
        HeaderOp::Flags,
        HeaderOp::Skip(105),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[
        &[Element::PositionSnorm16, Element::BoneIndex, Element::Tangent],
        &[Element::UvUnorm16(0), Element::UvUnorm16(1)],
    ],
    layered_uv: None,
    flag_names: &[(FOLIAGE_BARK_2_LAYERED, "SUPPORT_LAYERED")],
    naming: MaterialNaming::Textures,
    slot_uv: &[0, 0, 0, 1, 1, 0, 0, 0, 0],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static LANDMARK: BlockLayout = BlockLayout {
    name: "Landmark",
    tag: K_TAG_LANDMARK,
    prelude: &[HeaderOp::Skip(89), HeaderOp::Filepaths, HeaderOp::Skip(16)],
    streams: LANDMARK_STREAMS,
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static LAYERED: BlockLayout = BlockLayout {
    name: "Layered",
    tag: K_TAG_LAYERED,
    prelude: &[HeaderOp::Skip(89), HeaderOp::Filepaths, HeaderOp::Skip(16)],
    streams: LANDMARK_STREAMS,
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static VEGETATION_FOLIAGE: BlockLayout = BlockLayout {
    name: "VegetationFoliage",
    tag: K_TAG_VEGETATION_FOLIAGE,
    prelude: &[
        HeaderOp::Skip(45),
        HeaderOp::Scale,
        HeaderOp::UvExtent(0),
        HeaderOp::UvExtent(1),
        HeaderOp::Skip(32),
        HeaderOp::Filepaths,
        HeaderOp::Skip(16),
    ],
    streams: &[
        &[Element::PositionSnorm16, Element::BoneIndex, Element::UvUnorm16(0)],
        &[Element::UvUnorm16(1), Element::Tangent],
    ],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[0, 0, 1, 0],
    srgb_slots: &[0],
    layered_slots: &[],
    supported: true,
};

pub static GENERAL_MK3: BlockLayout = BlockLayout {
    name: "GeneralMkIII",
    tag: K_TAG_GENERAL_MK3,
    prelude: &[],
    streams: &[],
    layered_uv: None,
    flag_names: &[],
    naming: MaterialNaming::Textures,
    slot_uv: &[],
    srgb_slots: &[],
    layered_slots: &[],
    supported: false,
};

pub static LAYOUTS: [&BlockLayout; 11] = [
    &CAR_PAINT_14,
    &WINDOW,
    &CAR_LIGHT,
    &BAVARIUM_SHIELD,
    &WATER_HULL,
    &GENERAL_6,
    &FOLIAGE_BARK_2,
    &LANDMARK,
    &LAYERED,
    &VEGETATION_FOLIAGE,
    &GENERAL_MK3,
];

pub fn find_layout(tag: BlockTag) -> Option<&'static BlockLayout> {
    LAYOUTS.iter().copied().find(|layout| layout.tag == tag)
}
