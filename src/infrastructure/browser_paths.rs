//! Browser history path discovery.
//!
//! Handles locating Chromium-family profile directories across platforms.

use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

/// Known browser data directories, relative to the home directory.
const BROWSER_DIRS: &[(&str, &str)] = &[
    // Linux
    ("Chrome", ".config/google-chrome"),
    ("Chromium", ".config/chromium"),
    ("Brave", ".config/BraveSoftware/Brave-Browser"),
    ("Edge", ".config/microsoft-edge"),
    ("Vivaldi", ".config/vivaldi"),
    // macOS
    ("Chrome", "Library/Application Support/Google/Chrome"),
    ("Chromium", "Library/Application Support/Chromium"),
    ("Brave", "Library/Application Support/BraveSoftware/Brave-Browser"),
    ("Edge", "Library/Application Support/Microsoft Edge"),
    ("Vivaldi", "Library/Application Support/Vivaldi"),
    // Windows
    ("Chrome", "AppData/Local/Google/Chrome/User Data"),
    ("Brave", "AppData/Local/BraveSoftware/Brave-Browser/User Data"),
    ("Edge", "AppData/Local/Microsoft/Edge/User Data"),
];

const HISTORY_DB_NAME: &str = "History";

/// A discovered history database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserProfile {
    pub browser: &'static str,
    pub profile: String,
    pub history_db: PathBuf,
}

/// Finds every profile `History` file under the home directory.
///
/// # Errors
/// Returns error if the home directory cannot be determined.
pub fn find_history_databases() -> Result<Vec<BrowserProfile>> {
    let home = dirs::home_dir().ok_or_else(|| AppError::Config {
        message: "Could not determine home directory".into(),
    })?;
    Ok(find_history_databases_in(&home))
}

/// Finds every profile `History` file under `home`.
#[must_use]
pub fn find_history_databases_in(home: &Path) -> Vec<BrowserProfile> {
    let mut found = Vec::new();

    for &(browser, dir) in BROWSER_DIRS {
        let data_dir = home.join(dir);
        if !data_dir.is_dir() {
            continue;
        }

        let entries = match std::fs::read_dir(&data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", data_dir.display(), e);
                continue;
            }
        };

        let mut profiles: Vec<BrowserProfile> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let db = entry.path().join(HISTORY_DB_NAME);
                db.is_file().then(|| BrowserProfile {
                    browser,
                    profile: entry.file_name().to_string_lossy().into_owned(),
                    history_db: db,
                })
            })
            .collect();

        // "Default" first, then alphabetical
        profiles.sort_by(|a, b| {
            (a.profile != "Default", &a.profile).cmp(&(b.profile != "Default", &b.profile))
        });

        for profile in &profiles {
            tracing::debug!("Found {} history DB: {}", profile.browser, profile.history_db.display());
        }
        found.extend(profiles);
    }

    found
}

/// Picks the history database to export from.
///
/// # Errors
/// Returns error if no history database can be found.
pub fn default_history_database() -> Result<PathBuf> {
    find_history_databases()?
        .into_iter()
        .next()
        .map(|p| p.history_db)
        .ok_or_else(|| AppError::Config {
            message: "No browser history database found. Pass --db <PATH> to select one".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch_profile(root: &Path, dir: &str, profile: &str) {
        let profile_dir = root.join(dir).join(profile);
        std::fs::create_dir_all(&profile_dir).unwrap();
        std::fs::write(profile_dir.join(HISTORY_DB_NAME), b"").unwrap();
    }

    #[test]
    fn test_finds_profiles_default_first() {
        let home = tempdir().unwrap();
        touch_profile(home.path(), ".config/google-chrome", "Profile 1");
        touch_profile(home.path(), ".config/google-chrome", "Default");
        touch_profile(home.path(), ".config/chromium", "Default");
        std::fs::create_dir_all(home.path().join(".config/google-chrome/Crashpad")).unwrap();

        let found = find_history_databases_in(home.path());
        let names: Vec<(&str, &str)> = found
            .iter()
            .map(|p| (p.browser, p.profile.as_str()))
            .collect();

        assert_eq!(
            names,
            vec![("Chrome", "Default"), ("Chrome", "Profile 1"), ("Chromium", "Default")]
        );
    }

    #[test]
    fn test_empty_home_finds_nothing() {
        let home = tempdir().unwrap();
        assert!(find_history_databases_in(home.path()).is_empty());
    }
}
