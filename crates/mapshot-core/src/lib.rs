//! mapshot Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Process management
//! - Filesystem access
//! - Runtime specifics
//!
//! Everything here describes a single render run and the contract between
//! the orchestrator and the mod running inside Factorio.

pub mod ids;
pub mod overrides;
pub mod status;

/// Name of the Factorio mod shipped with mapshot.
pub const MOD_NAME: &str = "mapshot";

/// Prefix of the marker file the mod writes once a render is complete.
pub const MARKER_PREFIX: &str = "mapshot-done-";

// Re-export commonly used types
pub use ids::RunId;
pub use overrides::Overrides;
pub use status::ExitOutcome;
