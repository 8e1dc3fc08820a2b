use anyhow::{Context, Result};
use etcetera::app_strategy::{AppStrategy, AppStrategyArgs};
use std::fs;
use std::path::PathBuf;

// Choose the Strategy based on OS
// Windows -> AppData\Roaming\ytmix
#[cfg(target_os = "windows")]
use etcetera::app_strategy::Windows as Strategy;

// Mac & Linux -> ~/.config/ytmix
#[cfg(not(target_os = "windows"))]
use etcetera::app_strategy::Xdg as Strategy;

pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    pub fn init() -> Result<Self> {
        let args = AppStrategyArgs {
            top_level_domain: "com".to_string(),
            author: "ytmix".to_string(),
            app_name: "ytmix".to_string(),
        };

        let strategy =
            Strategy::new(args).map_err(|_| anyhow::anyhow!("Could not determine system paths"))?;

        let config_dir = strategy.config_dir();
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed to create config dir: {}", config_dir.display()))?;

        Ok(Self {
            config_file: config_dir.join("config.json"),
            config_dir,
        })
    }
}
