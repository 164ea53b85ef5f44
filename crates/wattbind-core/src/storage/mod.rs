pub mod binding_db;
mod config;
pub mod history_db;

pub use binding_db::{Binding, BindingDb, ScheduleEntry};
pub use config::{Config, MessengerConfig, RateLimitConfig, UpstreamConfig};
pub use history_db::{HistoryDb, Reading, RoomKey};

use std::path::PathBuf;

/// Returns `~/.config/wattbind[-dev]/` based on WATTBIND_ENV.
///
/// Set WATTBIND_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WATTBIND_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wattbind-dev")
    } else {
        base_dir.join("wattbind")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
