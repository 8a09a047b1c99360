use crate::constants::APP_DIR_NAME;
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR_ENV: &str = "KANGKANG_CONFIG_DIR";

fn fallback_dir() -> PathBuf {
  std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn env_override() -> Option<PathBuf> {
  let dir = std::env::var(CONFIG_DIR_ENV).ok()?;
  let trimmed = dir.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(PathBuf::from(trimmed))
  }
}

pub(crate) fn app_config_dir() -> PathBuf {
  let base = env_override()
    .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR_NAME)))
    .unwrap_or_else(fallback_dir);
  let _ = fs::create_dir_all(&base);
  base
}

pub(crate) fn app_data_dir() -> PathBuf {
  let base = env_override()
    .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR_NAME)))
    .unwrap_or_else(fallback_dir);
  let _ = fs::create_dir_all(&base);
  base
}

pub(crate) fn resolve_config_path(filename: &str) -> PathBuf {
  app_config_dir().join(filename)
}

pub(crate) fn resolve_data_path(filename: &str) -> PathBuf {
  app_data_dir().join(filename)
}
