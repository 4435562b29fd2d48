//! Save-game discovery and serialization (spec §6).
//!
//! A save is the whole `World` serialized as RON, named
//! `<slot>-hollowgate-<version>.ron`, discovered by scanning a directory and
//! parsing the slot/version back out of the filename. Saves live under a
//! per-world subdirectory (see `save_dir_for_slug`), and `SaveSummary`/
//! `SaveFileStatus` report enough about a save file to list it without
//! fully deserializing the world.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use log::warn;

use crate::world::World;

pub const SAVE_FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SAVE_DIR: &str = "saved_games";
const FILENAME_INFIX: &str = "hollowgate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub slot: String,
    pub version: String,
    pub path: PathBuf,
    pub file_name: String,
    pub modified: Option<SystemTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub world_title: String,
    pub player_location: String,
    pub turn_count: u64,
    pub score: isize,
    pub deaths: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFileStatus {
    Ready,
    VersionMismatch { save_version: String, current_version: String },
    Corrupted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFileEntry {
    pub slot: String,
    pub version: String,
    pub path: PathBuf,
    pub file_name: String,
    pub modified: Option<SystemTime>,
    pub summary: Option<SaveSummary>,
    pub status: SaveFileStatus,
}

/// Compute a save directory for a slug (typically the catalogue's world
/// title, sanitized): each world gets its own subfolder under the save root.
pub fn save_dir_for_slug(raw: &str) -> PathBuf {
    default_save_root().join(crate::slug::sanitize_slug(raw))
}

/// The root saves live under absent a `--save-dir` override: a user-level
/// data directory when one is available, falling back to `./saved_games`
/// for environments (containers, CI) without a resolvable home directory.
pub fn default_save_root() -> PathBuf {
    dirs::data_dir().map(|dir| dir.join("hollowgate").join(SAVE_DIR)).unwrap_or_else(|| PathBuf::from(SAVE_DIR))
}

/// Write `world` to `dir/<slot>-hollowgate-<version>.ron`, creating `dir` if
/// it doesn't already exist.
///
/// # Errors
/// Returns an error if the directory can't be created, the world can't be
/// serialized, or the file can't be written.
pub fn save_to_slot(world: &World, dir: &Path, slot: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating save directory {}", dir.display()))?;
    let slug = crate::slug::sanitize_slug(slot);
    let path = dir.join(format!("{slug}-{FILENAME_INFIX}-{SAVE_FORMAT_VERSION}.ron"));
    let ron = ron::ser::to_string_pretty(world, ron::ser::PrettyConfig::default()).context("serializing world to RON")?;
    fs::write(&path, ron).with_context(|| format!("writing save file {}", path.display()))?;
    Ok(path)
}

/// Load a save file from disk and deserialize the world it holds.
///
/// # Errors
/// Returns an error if the file cannot be read or deserialized.
pub fn load_save_file(path: &Path) -> Result<World> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading save file {}", path.display()))?;
    ron::from_str::<World>(&raw).with_context(|| format!("parsing save file {}", path.display()))
}

/// Discover save slot files stored directly in `dir`.
///
/// # Errors
/// Returns an error if the directory contents cannot be read or enumerated.
pub fn collect_save_slots(dir: &Path) -> Result<Vec<SaveSlot>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut slots = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", dir.display()))?;
        if let Some(slot) = slot_from_entry(&entry) {
            slots.push(slot);
        }
    }
    slots.sort_by(|a, b| a.slot.cmp(&b.slot).then(a.version.cmp(&b.version)));
    Ok(slots)
}

/// Build descriptive entries (with parsed summaries/status) for the save
/// files in `dir`, most-recently-modified first.
///
/// # Errors
/// Returns an error if reading the directory fails.
pub fn build_save_entries(dir: &Path) -> Result<Vec<SaveFileEntry>> {
    let slots = collect_save_slots(dir)?;
    let mut entries: Vec<_> = slots.into_iter().map(entry_for_slot).collect();
    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.slot.cmp(&b.slot)));
    Ok(entries)
}

/// Format a modified time as a compact "time ago" string.
pub fn format_modified(modified: SystemTime) -> String {
    match SystemTime::now().duration_since(modified) {
        Ok(delta) => format_duration(delta),
        Err(_) => "in the future".to_string(),
    }
}

fn entry_for_slot(slot: SaveSlot) -> SaveFileEntry {
    let mut version = slot.version.clone();
    let (summary, status) = match fs::read_to_string(&slot.path) {
        Ok(raw) => match ron::from_str::<World>(&raw) {
            Ok(world) => {
                version = SAVE_FORMAT_VERSION.to_string();
                let status = if slot.version == SAVE_FORMAT_VERSION {
                    SaveFileStatus::Ready
                } else {
                    SaveFileStatus::VersionMismatch {
                        save_version: slot.version.clone(),
                        current_version: SAVE_FORMAT_VERSION.to_string(),
                    }
                };
                let summary = SaveSummary {
                    world_title: world.title.clone(),
                    player_location: world.room(&world.winner.here).map(|r| r.name.clone()).unwrap_or_else(|_| "Nowhere".into()),
                    turn_count: world.moves,
                    score: world.score,
                    deaths: world.deaths,
                };
                (Some(summary), status)
            },
            Err(err) => {
                warn!("failed to parse save '{}' ({}): {}", slot.slot, slot.path.display(), err);
                (None, SaveFileStatus::Corrupted { message: format!("parse error: {}", trim_error(&err)) })
            },
        },
        Err(err) => {
            warn!("failed to read save '{}' ({}): {}", slot.slot, slot.path.display(), err);
            (None, SaveFileStatus::Corrupted { message: format!("read error: {}", trim_error(&err)) })
        },
    };

    SaveFileEntry { slot: slot.slot, version, path: slot.path, file_name: slot.file_name, modified: slot.modified, summary, status }
}

fn slot_from_entry(entry: &fs::DirEntry) -> Option<SaveSlot> {
    let path = entry.path();
    if !path.is_file() {
        return None;
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
        return None;
    }
    let file_name = path.file_name().and_then(|name| name.to_str())?.to_string();
    let stem = path.file_stem().and_then(|stem| stem.to_str())?;
    let marker = format!("-{FILENAME_INFIX}-");
    let (slot, version) = stem.rsplit_once(&marker)?;
    if slot.is_empty() {
        return None;
    }
    let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
    Some(SaveSlot { slot: slot.to_string(), version: version.to_string(), path, file_name, modified })
}

fn format_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = MINUTE * 60;
    const DAY: u64 = HOUR * 24;
    const WEEK: u64 = DAY * 7;
    const MONTH: u64 = DAY * 30;
    const YEAR: u64 = DAY * 365;

    let secs = duration.as_secs();
    if secs < 30 {
        "just now".to_string()
    } else if secs < MINUTE {
        format!("{secs}s ago")
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else if secs < MONTH {
        format!("{}w ago", secs / WEEK)
    } else if secs < YEAR {
        format!("{}mo ago", secs / MONTH)
    } else {
        format!("{}y ago", secs / YEAR)
    }
}

fn trim_error(err: &impl ToString) -> String {
    let message = err.to_string();
    if message.chars().count() <= 120 {
        return message;
    }
    let mut trimmed = String::new();
    for (idx, ch) in message.chars().enumerate() {
        if idx >= 117 {
            trimmed.push_str("...");
            break;
        }
        trimmed.push(ch);
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::bare_world;
    use tempfile::tempdir;

    #[test]
    fn collect_save_slots_handles_missing_directory() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("missing");
        assert!(collect_save_slots(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips_world_state() -> Result<()> {
        let dir = tempdir()?;
        let mut world = bare_world();
        world.score = 42;
        world.moves = 7;
        let path = save_to_slot(&world, dir.path(), "alpha")?;
        let loaded = load_save_file(&path)?;
        assert_eq!(loaded.score, 42);
        assert_eq!(loaded.moves, 7);
        Ok(())
    }

    #[test]
    fn build_save_entries_reports_status_variants() -> Result<()> {
        let dir = tempdir()?;
        let world = bare_world();
        save_to_slot(&world, dir.path(), "alpha")?;
        fs::write(dir.path().join(format!("beta-{FILENAME_INFIX}-0.0.1.ron")), ron::ser::to_string(&world)?)?;
        fs::write(dir.path().join(format!("gamma-{FILENAME_INFIX}-{SAVE_FORMAT_VERSION}.ron")), "not valid ron")?;

        let mut entries = build_save_entries(dir.path())?;
        entries.sort_by(|a, b| a.slot.cmp(&b.slot));

        let alpha = entries.iter().find(|e| e.slot == "alpha").unwrap();
        assert!(matches!(alpha.status, SaveFileStatus::Ready));

        let beta = entries.iter().find(|e| e.slot == "beta").unwrap();
        assert!(matches!(beta.status, SaveFileStatus::VersionMismatch { .. }));

        let gamma = entries.iter().find(|e| e.slot == "gamma").unwrap();
        assert!(matches!(gamma.status, SaveFileStatus::Corrupted { .. }));
        assert!(gamma.summary.is_none());

        Ok(())
    }
}
