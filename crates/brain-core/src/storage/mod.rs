mod config;
pub mod database;
pub mod migrations;

pub use config::{BrainConfig, Thresholds};
pub use database::{Database, InMemoryStore, KvStore};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// 1. `IKU_BRAIN_DATA_DIR` if set
/// 2. `~/.config/iku-brain-dev/` when `IKU_BRAIN_ENV=dev`
/// 3. `~/.config/iku-brain/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("IKU_BRAIN_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("IKU_BRAIN_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("iku-brain-dev")
            } else {
                base_dir.join("iku-brain")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
