//! The `overrides.lua` file handed to the mod through the workspace.

use std::fmt::Write;

use crate::RunId;

/// File name of the overrides chunk inside the mod directory.
pub const OVERRIDES_FILE: &str = "overrides.lua";

/// Default minimum tile size, in pixels, of the rendered output.
pub const DEFAULT_TILE_MIN: u32 = 64;

/// Per-run settings the mod picks up at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Run to start on load. The mod only renders when this is set, and
    /// names its marker file after it.
    pub on_startup: RunId,

    /// Name of the output, usually derived from the save name.
    pub shot_name: String,

    /// Minimum tile size in pixels.
    pub tile_min: u32,
}

impl Overrides {
    /// Create overrides for a run with the default tile size.
    pub fn new(on_startup: RunId, shot_name: impl Into<String>) -> Self {
        Self {
            on_startup,
            shot_name: shot_name.into(),
            tile_min: DEFAULT_TILE_MIN,
        }
    }

    /// Set the minimum tile size.
    pub fn with_tile_min(mut self, tile_min: u32) -> Self {
        self.tile_min = tile_min;
        self
    }

    /// Render as a Lua chunk returning a table.
    pub fn to_lua(&self) -> String {
        format!(
            "return {{\n  onstartup = {},\n  shotname = {},\n  tilemin = {},\n}}\n",
            lua_quote(self.on_startup.as_str()),
            lua_quote(&self.shot_name),
            self.tile_min,
        )
    }
}

/// Quote a string as a Lua string literal.
fn lua_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {
                // Lua decimal escapes take at most three digits.
                let _ = write!(out, "\\{:03}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
