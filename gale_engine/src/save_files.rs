//! Save-slot discovery and housekeeping.
//!
//! Each slot is a directory under the save root holding `game.dat` and one
//! `region-<id>.dat` delta per region that has been changed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::savefile::{self, FileReader, SaveError};
use crate::world::{GAME_FILE, GAME_SAVE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFileStatus {
    Ready,
    VersionMismatch { found: u32, expected: u32 },
    Corrupted { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub slot: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    /// Number of region delta files in the slot.
    pub regions: usize,
    pub status: SaveFileStatus,
}

/// Directory of one named slot.
pub fn slot_dir(save_root: &Path, slot: &str) -> PathBuf {
    save_root.join(slot)
}

/// Discover the save slots under `root`. Directories without a game file are skipped.
///
/// # Errors
/// Returns an error if the directory contents cannot be read or enumerated.
pub fn collect_save_slots(root: &Path) -> Result<Vec<SaveSlot>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut slots = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("reading {}", root.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", root.display()))?;
        let path = entry.path();
        if !path.join(GAME_FILE).is_file() {
            continue;
        }
        let Some(slot) = path.file_name().and_then(|name| name.to_str()).map(str::to_string) else {
            continue;
        };
        slots.push(inspect_slot(slot, &path)?);
    }
    slots.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.slot.cmp(&b.slot)));
    Ok(slots)
}

fn inspect_slot(slot: String, path: &Path) -> Result<SaveSlot> {
    let game_file = path.join(GAME_FILE);
    let modified = fs::metadata(&game_file).ok().and_then(|meta| meta.modified().ok());
    let regions = region_files(path)?.len();
    let status = match savefile::read_file(&game_file) {
        Ok(bytes) => match FileReader::open(&bytes, "game", GAME_SAVE_VERSION) {
            Ok(_) => SaveFileStatus::Ready,
            Err(SaveError::VersionMismatch { found, expected, .. }) => {
                SaveFileStatus::VersionMismatch { found, expected }
            },
            Err(err) => {
                warn!("save slot '{slot}' looks corrupt: {err}");
                SaveFileStatus::Corrupted {
                    message: err.to_string(),
                }
            },
        },
        Err(err) => SaveFileStatus::Corrupted {
            message: err.to_string(),
        },
    };
    Ok(SaveSlot {
        slot,
        path: path.to_path_buf(),
        modified,
        regions,
        status,
    })
}

fn region_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry.with_context(|| format!("enumerating {}", dir.display()))?.path();
        let is_delta = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("region-") && name.ends_with(".dat"));
        if is_delta {
            files.push(path);
        }
    }
    Ok(files)
}

/// Remove the game file and every region delta from a slot, ready for a new game.
///
/// # Errors
/// Returns an error if a file cannot be removed.
pub fn clear_slot(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    let game_file = dir.join(GAME_FILE);
    let doomed = region_files(dir)?.into_iter().chain(game_file.is_file().then_some(game_file));
    for path in doomed {
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        removed += 1;
    }
    info!("cleared {removed} files from save slot '{}'", dir.display());
    Ok(removed)
}

const AGE_UNITS: [(u64, &str); 4] = [(604_800, "week"), (86_400, "day"), (3_600, "hour"), (60, "minute")];

/// How long ago a slot was written, for the slot listing.
pub fn format_modified(modified: SystemTime) -> String {
    SystemTime::now()
        .duration_since(modified)
        .map_or_else(|_| "just now".to_string(), format_age)
}

/// Largest whole unit of `age`, e.g. "3 hours ago".
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    AGE_UNITS
        .iter()
        .find(|(size, _)| secs >= *size)
        .map_or_else(
            || "moments ago".to_string(),
            |(size, unit)| {
                let count = secs / size;
                let plural = if count == 1 { "" } else { "s" };
                format!("{count} {unit}{plural} ago")
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::savefile::FileWriter;
    use tempfile::tempdir;

    fn write_game(dir: &Path, version: u32) -> Result<()> {
        fs::create_dir_all(dir)?;
        let bytes = FileWriter::with_header(version).finish();
        fs::write(dir.join(GAME_FILE), bytes)?;
        Ok(())
    }

    #[test]
    fn collect_save_slots_handles_missing_directory() -> Result<()> {
        let dir = tempdir()?;
        assert!(collect_save_slots(&dir.path().join("missing"))?.is_empty());
        Ok(())
    }

    #[test]
    fn slots_report_their_status() -> Result<()> {
        let root = tempdir()?;
        write_game(&slot_dir(root.path(), "alpha"), GAME_SAVE_VERSION)?;
        fs::write(slot_dir(root.path(), "alpha").join("region-1.dat"), b"")?;
        write_game(&slot_dir(root.path(), "beta"), GAME_SAVE_VERSION + 1)?;
        fs::create_dir_all(slot_dir(root.path(), "gamma"))?;
        fs::write(slot_dir(root.path(), "gamma").join(GAME_FILE), b"junk")?;
        fs::create_dir_all(slot_dir(root.path(), "empty"))?;

        let slots = collect_save_slots(root.path())?;
        assert_eq!(slots.len(), 3);
        let find = |name: &str| slots.iter().find(|slot| slot.slot == name).unwrap();
        assert_eq!(find("alpha").status, SaveFileStatus::Ready);
        assert_eq!(find("alpha").regions, 1);
        assert!(matches!(find("beta").status, SaveFileStatus::VersionMismatch { .. }));
        assert!(matches!(find("gamma").status, SaveFileStatus::Corrupted { .. }));
        Ok(())
    }

    #[test]
    fn clearing_a_slot_removes_only_save_files() -> Result<()> {
        let root = tempdir()?;
        let dir = slot_dir(root.path(), "alpha");
        write_game(&dir, GAME_SAVE_VERSION)?;
        fs::write(dir.join("region-3.dat"), b"")?;
        fs::write(dir.join("notes.txt"), b"keep me")?;
        assert_eq!(clear_slot(&dir)?, 2);
        assert!(dir.join("notes.txt").exists());
        assert!(!dir.join(GAME_FILE).exists());
        Ok(())
    }

    #[test]
    fn ages_use_the_largest_unit() {
        assert_eq!(format_age(Duration::from_secs(5)), "moments ago");
        assert_eq!(format_age(Duration::from_secs(7_200)), "2 hours ago");
        assert_eq!(format_age(Duration::from_secs(86_400 + 5)), "1 day ago");
        assert_eq!(format_age(Duration::from_secs(3 * 604_800)), "3 weeks ago");
    }
}
