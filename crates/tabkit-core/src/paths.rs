//! Well-known locations of browser data on disk.

use std::path::{Path, PathBuf};

/// File names inside a Firefox-family profile directory.
pub struct ProfileFiles;

impl ProfileFiles {
    pub const PLACES: &'static str = "places.sqlite";
    pub const RECOVERY: &'static str = "sessionstore-backups/recovery.jsonlz4";
    pub const SESSION: &'static str = "sessionstore.jsonlz4";
}

/// Safari's synced-tabs database.
pub fn cloud_tabs_db() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("Containers")
            .join("com.apple.Safari")
            .join("Data")
            .join("Library")
            .join("Safari")
            .join("CloudTabs.db")
    })
}

/// Directory holding the profiles of a Firefox-family browser.
///
/// `app_dir` is the browser's directory name, e.g. `"Firefox"` or `"zen"`.
pub fn profiles_dir(app_dir: &str) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join(app_dir)
            .join("Profiles")
    } else {
        home.join(format!(".{}", app_dir.to_lowercase()))
    })
}

/// Path of a well-known file inside `profile`.
pub fn profile_file(profile: &Path, file: &str) -> PathBuf {
    profile.join(file)
}

/// Profile directories under `root` that contain a places database,
/// sorted by name.
pub fn find_profiles(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut profiles: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(ProfileFiles::PLACES).is_file())
        .collect();
    profiles.sort();
    profiles
}
