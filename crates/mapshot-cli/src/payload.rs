//! The Factorio mod embedded in the binary.

/// Version of the tool and of the embedded mod.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Files of the mod, as `(file name, content)` pairs.
///
/// `overrides.lua` is not part of it; it is generated per run.
pub const MOD_FILES: &[(&str, &str)] = &[
    ("info.json", include_str!("../factorio-mod/info.json")),
    ("control.lua", include_str!("../factorio-mod/control.lua")),
];
