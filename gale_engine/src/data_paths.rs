use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Cached path to the directory holding the region files and strings.
static DATA_ROOT: LazyLock<PathBuf> = LazyLock::new(detect_data_root);

pub const REGION_DIR: &str = "regions";
pub const STRINGS_FILE: &str = "strings.yml";

/// The configured data directory if there is one, otherwise the detected root.
pub fn data_root(configured: Option<&Path>) -> PathBuf {
    configured.map_or_else(|| DATA_ROOT.clone(), Path::to_path_buf)
}

/// Resolve the most likely location of the runtime data directory.
fn detect_data_root() -> PathBuf {
    let mut candidates = vec![PathBuf::from("gale_engine/data"), PathBuf::from("data")];

    if let Ok(exe_path) = env::current_exe()
        && let Some(dir) = exe_path.parent()
    {
        candidates.push(dir.join("gale_engine/data"));
        candidates.push(dir.join("data"));

        if let Some(parent) = dir.parent() {
            candidates.push(parent.join("gale_engine/data"));
            candidates.push(parent.join("data"));
        }
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.join(REGION_DIR).is_dir())
        .unwrap_or_else(|| PathBuf::from("gale_engine/data"))
}
