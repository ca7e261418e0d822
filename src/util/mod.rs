pub mod file;
pub mod hash;
pub mod reader;
pub mod transform;
