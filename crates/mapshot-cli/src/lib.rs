//! mapshot - zoomable screenshots for Factorio.
//!
//! The library half of the `mapshot` binary: the embedded Factorio mod and
//! the render pipeline that stages a private workspace, runs Factorio
//! against it and waits for the mod to signal completion.

pub mod payload;
pub mod render;
