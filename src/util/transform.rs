//! Conversion from the game's row-major Y-up matrices to column-major Z-up.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Rotate parented objects by -90 degrees about X after composition.
    pub child_x_correction: bool,
}

// Y_src -> Z_host, Z_src -> -Y_host
const Y_UP_TO_Z_UP: Mat4 = Mat4::from_cols(Vec4::X, Vec4::Z, Vec4::NEG_Y, Vec4::W);

/// Converts a row-major source matrix into a host world matrix.
pub fn to_host(row_major: &[f32; 16], parent: Option<&Mat4>, options: TransformOptions) -> Mat4 {
    // Consuming row-major data as columns transposes it.
    let local = Y_UP_TO_Z_UP * Mat4::from_cols_array(row_major);
    let Some(parent) = parent else {
        return local;
    };
    let world = *parent * local;
    if options.child_x_correction {
        world * Mat4::from_rotation_x(-FRAC_PI_2)
    } else {
        world
    }
}
