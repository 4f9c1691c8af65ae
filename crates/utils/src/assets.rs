use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "TASKBOARD_ASSET_DIR";

pub fn asset_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            let path = PathBuf::from(override_dir);
            ensure_dir(&path);
            return path;
        }
    }

    let path = if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        match ProjectDirs::from("dev", "taskboard", "taskboard") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                tracing::warn!("No home directory available, using the temp dir for assets");
                std::env::temp_dir().join("taskboard")
            }
        }
    };

    ensure_dir(&path);
    path
}

fn ensure_dir(path: &PathBuf) {
    if path.exists() {
        return;
    }
    if let Err(err) = std::fs::create_dir_all(path) {
        tracing::warn!("Failed to create asset directory {}: {}", path.display(), err);
    }
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}

pub fn database_path() -> PathBuf {
    asset_dir().join("db.sqlite")
}
