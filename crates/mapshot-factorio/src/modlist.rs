//! The `mod-list.json` document Factorio uses to decide which mods load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved file name of the mod list inside a mods directory.
pub const MOD_LIST_FILE: &str = "mod-list.json";

/// Parsed `mod-list.json`.
///
/// Entry order is the load order and is kept as-is. Fields mapshot does not
/// know about are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModList {
    #[serde(default)]
    pub mods: Vec<ModEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One mod in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModEntry {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModEntry {
    /// Create an entry with no extra fields.
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            extra: Map::new(),
        }
    }
}

impl ModList {
    /// Parse a mod list from raw JSON.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Serialize in the indented form Factorio itself writes.
    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Enable a mod, adding it at the end of the list if it is not there.
    pub fn enable(&mut self, name: &str) {
        match self.mods.iter_mut().find(|m| m.name == name) {
            Some(entry) => entry.enabled = true,
            None => self.mods.push(ModEntry::new(name, true)),
        }
    }

    /// Returns true if the mod is listed and enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.mods.iter().any(|m| m.name == name && m.enabled)
    }
}
