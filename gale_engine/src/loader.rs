//! Loading static data: region YAML files and the sky strings file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use gale_data::RegionDef;
use log::{info, warn};

use crate::time_weather::WeatherData;

/// A region file found on disk, named `<id>-<name>.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFile {
    pub id: u32,
    pub name: String,
    pub path: PathBuf,
}

impl RegionFile {
    /// Parse a region file name. Returns `None` for anything not shaped like `<id>-<name>.yml`.
    pub fn from_path(path: &Path) -> Option<RegionFile> {
        if path.extension().and_then(|ext| ext.to_str()) != Some("yml") {
            return None;
        }
        let stem = path.file_stem().and_then(|stem| stem.to_str())?;
        let (id, name) = stem.split_once('-')?;
        let id: u32 = id.parse().ok().filter(|id| *id > 0)?;
        if name.is_empty() {
            return None;
        }
        Some(RegionFile {
            id,
            name: name.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Find every region file in `dir`, ordered by region id.
///
/// # Errors
/// Returns an error if the directory cannot be read or two files claim the same id.
pub fn discover_regions(dir: &Path) -> Result<Vec<RegionFile>> {
    let mut found: BTreeMap<u32, RegionFile> = BTreeMap::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading region directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", dir.display()))?;
        let path = entry.path();
        let Some(file) = RegionFile::from_path(&path) else {
            if path.extension().and_then(|ext| ext.to_str()) == Some("yml") {
                warn!("skipping '{}': region files are named <id>-<name>.yml", path.display());
            }
            continue;
        };
        if let Some(other) = found.get(&file.id) {
            bail!(
                "region id {} is used by both '{}' and '{}'",
                file.id,
                other.path.display(),
                file.path.display()
            );
        }
        found.insert(file.id, file);
    }
    info!("{} region files found in '{}'", found.len(), dir.display());
    Ok(found.into_values().collect())
}

/// Read, parse and validate one region file.
///
/// # Errors
/// Errors bubble up from file IO, YAML parsing, or failed validation.
pub fn load_region_def(path: &Path) -> Result<RegionDef> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading region file {}", path.display()))?;
    let def: RegionDef =
        serde_yml::from_str(&raw).with_context(|| format!("parsing region file {}", path.display()))?;
    validate_region_def(&def).with_context(|| format!("validating region file {}", path.display()))?;
    Ok(def)
}

/// Validate a region definition and return a single aggregated error.
fn validate_region_def(def: &RegionDef) -> Result<()> {
    let errors = gale_data::validate_region(def);
    if errors.is_empty() {
        return Ok(());
    }
    let details = errors
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("region '{}' failed validation:\n{details}", def.identifier.name);
}

/// Read the raw key/value strings file.
///
/// # Errors
/// Errors bubble up from file IO or YAML parsing.
pub fn load_strings(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading strings file {}", path.display()))?;
    serde_yml::from_str(&raw).with_context(|| format!("parsing strings file {}", path.display()))
}

/// Load the strings file and split it into transition tables and narrative text.
///
/// # Errors
/// Errors bubble up from [`load_strings`] or malformed transition tables.
pub fn load_weather_data(path: &Path) -> Result<WeatherData> {
    let entries = load_strings(path)?;
    let data = WeatherData::from_entries(entries)
        .with_context(|| format!("building weather tables from {}", path.display()))?;
    info!("{} narrative strings loaded from '{}'", data.strings.len(), path.display());
    Ok(data)
}
