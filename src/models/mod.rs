//! Data models

pub mod heart;
pub mod car;

pub use heart::*;
pub use car::*;
