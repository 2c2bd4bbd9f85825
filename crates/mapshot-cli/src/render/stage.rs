//! Workspace staging: save, mods and the mapshot mod itself.

use std::io;
use std::path::{Path, PathBuf};

use mapshot_core::overrides::OVERRIDES_FILE;
use mapshot_core::{Overrides, RunId, MOD_NAME};
use mapshot_factorio::{ModList, MOD_LIST_FILE};
use tracing::{debug, info};

use super::error::StageError;
use super::fs::StagingFs;
use crate::payload::MOD_FILES;

/// What to do with one entry of the source mods directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// A copy of the mapshot mod; the embedded one replaces it.
    Skip,
    /// The mod list, copied with mapshot force-enabled.
    RewriteModList,
    /// Anything else, copied as-is.
    Copy,
}

/// Decide how to stage a mods directory entry from its name.
pub fn classify_entry(name: &str) -> EntryAction {
    if name == MOD_NAME
        || name
            .strip_prefix(MOD_NAME)
            .is_some_and(|rest| rest.starts_with('_'))
    {
        EntryAction::Skip
    } else if name == MOD_LIST_FILE {
        EntryAction::RewriteModList
    } else {
        EntryAction::Copy
    }
}

/// Inputs of [`stage`].
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// Save file to render.
    pub save: PathBuf,

    /// Output name; also the file stem of the staged save.
    pub shot_name: String,

    /// Factorio's own mods directory.
    pub mods: PathBuf,

    pub run_id: RunId,

    pub tile_min: u32,
}

/// Paths of a staged workspace, as passed to Factorio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedWorkspace {
    pub save: PathBuf,
    pub mods: PathBuf,
}

/// Populate `root` with everything Factorio needs for a render.
///
/// `root` must exist and be empty.
pub fn stage<F>(fs: &F, root: &Path, request: &StageRequest) -> Result<StagedWorkspace, StageError>
where
    F: StagingFs + ?Sized,
{
    // Game save
    let save = root.join(format!("{}.zip", request.shot_name));
    fs.copy_deep(&request.save, &save)
        .map_err(|source| StageError::CopySave {
            src: request.save.clone(),
            dst: save.clone(),
            source,
        })?;
    info!(src = %request.save.display(), dst = %save.display(), "Copied save");

    // The mod directory goes first so the layout is valid whatever order
    // the source entries come in.
    let mods = root.join("mods");
    let mod_dir = mods.join(MOD_NAME);
    fs.create_dir_all(&mod_dir)
        .map_err(|source| StageError::CreateDir {
            path: mod_dir.clone(),
            source,
        })?;

    let names = fs
        .read_dir(&request.mods)
        .map_err(|source| StageError::ReadModsDir {
            path: request.mods.clone(),
            source,
        })?;

    let mut found_mod_list = false;
    for name in names {
        let src = request.mods.join(&name);
        let dst = mods.join(&name);
        let action = name
            .to_str()
            .map(classify_entry)
            .unwrap_or(EntryAction::Copy);

        match action {
            EntryAction::Skip => {
                info!(path = %src.display(), "Ignoring mod file");
            }
            EntryAction::RewriteModList => {
                write_mod_list(fs, &src, &dst)?;
                info!(path = %dst.display(), "Created mod list");
                found_mod_list = true;
            }
            EntryAction::Copy => {
                fs.copy_deep(&src, &dst)
                    .map_err(|source| StageError::Copy {
                        src: src.clone(),
                        dst: dst.clone(),
                        source,
                    })?;
                debug!(src = %src.display(), dst = %dst.display(), "Copied mod file");
            }
        }
    }

    if !found_mod_list {
        return Err(StageError::ModListNotFound {
            path: request.mods.clone(),
        });
    }
    info!(src = %request.mods.display(), dst = %mods.display(), "Copied mods");

    for (name, content) in MOD_FILES {
        write_file(fs, &mod_dir.join(name), content.as_bytes())?;
    }
    info!(path = %mod_dir.display(), "Mod created");

    let overrides = Overrides::new(request.run_id.clone(), request.shot_name.clone())
        .with_tile_min(request.tile_min);
    let overrides_path = mod_dir.join(OVERRIDES_FILE);
    write_file(fs, &overrides_path, overrides.to_lua().as_bytes())?;
    info!(path = %overrides_path.display(), "Overrides file created");

    Ok(StagedWorkspace { save, mods })
}

fn write_mod_list<F>(fs: &F, src: &Path, dst: &Path) -> Result<(), StageError>
where
    F: StagingFs + ?Sized,
{
    let raw = fs.read(src).map_err(|source| StageError::ReadModList {
        path: src.to_path_buf(),
        source,
    })?;
    let mut list = ModList::from_slice(&raw).map_err(|source| StageError::ParseModList {
        path: src.to_path_buf(),
        source,
    })?;
    list.enable(MOD_NAME);
    let raw = list.to_vec_pretty().map_err(StageError::SerializeModList)?;
    write_file(fs, dst, &raw)
}

fn write_file<F>(fs: &F, path: &Path, contents: &[u8]) -> Result<(), StageError>
where
    F: StagingFs + ?Sized,
{
    fs.write(path, contents).map_err(|source: io::Error| StageError::Write {
        path: path.to_path_buf(),
        source,
    })
}
