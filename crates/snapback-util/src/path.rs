//! Path utilities.

use std::path::{Component, Path, PathBuf};

/// Get the snapback configuration directory.
///
/// This follows XDG conventions on Linux:
/// - `$XDG_CONFIG_HOME/snapback` if set
/// - `~/.config/snapback` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("snapback"))
}

/// Default location of the persisted configuration file.
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Get the snapback logs directory.
///
/// Linux: `~/.local/state/snapback/logs`, falling back to the data dir on
/// platforms without a state directory.
pub fn logs_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join("snapback").join("logs"))
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => result.push(component),
        }
    }

    result
}

/// Join a single directory entry name onto `base`.
///
/// Returns `None` if `name` is empty, contains a separator, or would
/// resolve outside of `base` (`.`/`..`).
pub fn join_entry(base: &Path, name: &str) -> Option<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return None,
    }

    let joined = normalize(&base.join(name));
    if joined.parent() == Some(normalize(base).as_path()) {
        Some(joined)
    } else {
        None
    }
}
