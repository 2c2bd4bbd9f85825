//! Factorio installation settings and discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::FactorioError;
use crate::executor::FactorioExecutor;

/// Where to find Factorio.
///
/// Unset fields are discovered from the usual install locations.
#[derive(Debug, Clone, Default)]
pub struct FactorioSettings {
    /// Factorio data directory (the one holding `saves/`, `mods/` and
    /// `script-output/`).
    pub datadir: Option<PathBuf>,

    /// Factorio executable.
    pub binary: Option<PathBuf>,
}

/// A resolved Factorio installation.
#[derive(Debug, Clone)]
pub struct Factorio {
    datadir: PathBuf,
    binary: PathBuf,
}

impl Factorio {
    /// Resolve settings against the filesystem.
    pub fn new(settings: &FactorioSettings) -> Result<Self, FactorioError> {
        let datadir = match &settings.datadir {
            Some(dir) => pick_first(vec![dir.clone()], Path::is_dir)
                .ok_or_else(|| FactorioError::DataDirNotFound(vec![dir.clone()]))?,
            None => {
                let candidates = datadir_candidates();
                pick_first(candidates.clone(), Path::is_dir)
                    .ok_or(FactorioError::DataDirNotFound(candidates))?
            }
        };

        let binary = match &settings.binary {
            Some(bin) => pick_first(vec![bin.clone()], Path::is_file)
                .ok_or_else(|| FactorioError::BinaryNotFound(vec![bin.clone()]))?,
            None => {
                let candidates = binary_candidates(&datadir);
                pick_first(candidates.clone(), Path::is_file)
                    .ok_or(FactorioError::BinaryNotFound(candidates))?
            }
        };

        debug!(datadir = %datadir.display(), binary = %binary.display(), "Resolved Factorio installation");
        Ok(Self { datadir, binary })
    }

    /// Use the given paths without checking them.
    pub fn from_paths(datadir: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        Self {
            datadir: datadir.into(),
            binary: binary.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.datadir
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.datadir.join("mods")
    }

    pub fn saves_dir(&self) -> PathBuf {
        self.datadir.join("saves")
    }

    /// Directory where mods write files through `game.write_file`.
    pub fn script_output(&self) -> PathBuf {
        self.datadir.join("script-output")
    }

    /// Path of a save.
    ///
    /// A bare name maps to `saves/<name>.zip`; anything that already looks
    /// like a path (a `.zip` suffix or a separator) is used as given.
    pub fn save_file(&self, name: &str) -> PathBuf {
        let looks_like_path = name.ends_with(".zip")
            || name.contains('/')
            || name.contains(std::path::MAIN_SEPARATOR);
        if looks_like_path {
            PathBuf::from(name)
        } else {
            self.saves_dir().join(format!("{}.zip", name))
        }
    }

    /// Executor running this installation's binary.
    pub fn executor(&self) -> FactorioExecutor {
        FactorioExecutor::new(&self.binary)
    }
}

fn pick_first(candidates: Vec<PathBuf>, accept: fn(&Path) -> bool) -> Option<PathBuf> {
    candidates.into_iter().find(|p| {
        let ok = accept(p);
        debug!(path = %p.display(), found = ok, "Checked Factorio candidate");
        ok
    })
}

fn datadir_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".factorio"));
    }
    // Application Support on macOS, AppData\Roaming on Windows.
    if let Some(data) = dirs::data_dir() {
        candidates.push(data.join("factorio"));
    }
    candidates
}

fn binary_candidates(datadir: &Path) -> Vec<PathBuf> {
    let exe = if cfg!(windows) { "factorio.exe" } else { "factorio" };
    let mut candidates = vec![datadir.join("bin").join("x64").join(exe)];

    let steam_roots: Vec<PathBuf> = [
        dirs::home_dir().map(|h| h.join(".steam").join("steam")),
        dirs::data_dir().map(|d| d.join("Steam")),
        Some(PathBuf::from(r"C:\Program Files (x86)\Steam")),
    ]
    .into_iter()
    .flatten()
    .collect();

    for root in steam_roots {
        let install = root.join("steamapps").join("common").join("Factorio");
        candidates.push(install.join("bin").join("x64").join(exe));
        candidates.push(
            install
                .join("factorio.app")
                .join("Contents")
                .join("MacOS")
                .join("factorio"),
        );
    }

    candidates.push(
        PathBuf::from(r"C:\Program Files\Factorio")
            .join("bin")
            .join("x64")
            .join(exe),
    );
    candidates
}
