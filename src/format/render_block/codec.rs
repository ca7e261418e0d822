use serde::{Deserialize, Serialize};

use crate::util::reader::hex_to_float;

/// Sign of the denominator used for unorm16 V coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VSign {
    /// `v / -65535`
    #[default]
    Negated,
    /// `v / 65535`
    Positive,
}

/// Unpacks a normal or tangent stored as three 8-bit channels in the
/// mantissa of a float.
pub fn decompress_normal(packed: u32) -> [f32; 4] {
    let f = hex_to_float(packed) as f64;
    let channel = |v: f64| (v.rem_euclid(1.0) * 2.0 - 1.0) as f32;
    let w = if f >= 0.0 { 1.0 } else { -1.0 };
    [channel(f), channel(f / 256.0), channel(f / 65536.0), w]
}

#[inline]
pub fn snorm16x3(raw: [i16; 3]) -> [f32; 3] { raw.map(|v| v as f32 / 32767.0) }

#[inline]
pub fn unorm16x2(raw: [u16; 2], sign: VSign) -> [f32; 2] {
    let v_scale = match sign {
        VSign::Negated => -65535.0,
        VSign::Positive => 65535.0,
    };
    [raw[0] as f32 / 65535.0, raw[1] as f32 / v_scale]
}

/// Remaps a quantized UV into the block's texel extent.
pub fn transform_uv(uv: [f32; 2], extent: [f32; 2]) -> [f32; 2] {
    let [mut u, mut v] = uv;
    u -= 0.5;
    v += 0.5;
    if u < 0.0 {
        u += 1.0;
    }
    if v < 0.0 {
        v += 1.0;
    }
    u *= extent[0];
    v *= extent[1];
    u -= extent[0] / 2.0;
    v -= extent[1] / 2.0;
    [u * 2.0, v * 2.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_components_in_range() {
        // Packed as z * 256 + y + x / 256 with 8-bit channels.
        let steps = [0u32, 1, 2, 63, 127, 128, 200, 254, 255];
        for x in steps {
            for y in steps {
                for z in steps {
                    let magnitude = (z * 256) as f32 + y as f32 + x as f32 / 256.0;
                    for value in [magnitude, -magnitude] {
                        let packed = value.to_bits();
                        let [nx, ny, nz, w] = decompress_normal(packed);
                        for c in [nx, ny, nz] {
                            assert!((-1.0..1.0).contains(&c), "{packed:#010X} -> {c}");
                        }
                        assert!(w == 1.0 || w == -1.0);
                    }
                }
            }
        }
    }

    #[test]
    fn normal_negative_fraction_is_euclidean() {
        // -0.25: frac = 0.75 -> 0.5
        let [x, _, _, w] = decompress_normal((-0.25f32).to_bits());
        assert_eq!(x, 0.5);
        assert_eq!(w, -1.0);
    }

    #[test]
    fn normal_channels() {
        // 128.5 -> frac(128.5) = 0.5, frac(0.501953125) = 0.501953125
        let [x, y, z, w] = decompress_normal(128.5f32.to_bits());
        assert_eq!(x, 0.0);
        assert_eq!(y, 0.00390625);
        assert_eq!(z, (128.5f64 / 65536.0 * 2.0 - 1.0) as f32);
        assert_eq!(w, 1.0);
    }

    #[test]
    fn snorm_full_range() {
        assert_eq!(snorm16x3([32767, -32767, 0]), [1.0, -1.0, 0.0]);
    }

    #[test]
    fn unorm_v_sign() {
        assert_eq!(unorm16x2([65535, 65535], VSign::Negated), [1.0, -1.0]);
        assert_eq!(unorm16x2([65535, 65535], VSign::Positive), [1.0, 1.0]);
        assert_eq!(unorm16x2([0, 0], VSign::Negated)[0], 0.0);
    }

    #[test]
    fn uv_transform_unit_extent() {
        // (0.5, -0.5) -> (0, 0) -> (0, 0) -> (0, 0) -> (-0.5, -0.5) -> (-1, -1)
        assert_eq!(transform_uv([0.5, -0.5], [1.0, 1.0]), [-1.0, -1.0]);
    }

    #[test]
    fn uv_transform_wraps_negative() {
        // (0.25, -0.75) -> (-0.25, -0.25) -> (0.75, 0.75) -> (1.5, 3.0) -> (0.5, 1.0) -> (1, 2)
        assert_eq!(transform_uv([0.25, -0.75], [2.0, 4.0]), [1.0, 2.0]);
    }
}
