//! Decoders for RBM render block models and the MDIC and BLO placement
//! containers that instance them.

pub mod format;
pub mod import;
pub mod util;
