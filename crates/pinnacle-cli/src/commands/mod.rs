//! Command implementations.

pub mod common;
pub mod convert;
pub mod optimize;
pub mod recent;
pub mod stats;
pub mod textures;
pub mod validate;
