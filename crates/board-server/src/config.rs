use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use board_db::DEFAULT_POOL_SIZE;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub project_root: PathBuf,
    pub web_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pool_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let project_root = project_root(env::var("PROJECT_ROOT").ok(), env::current_dir().ok());

        let host = env::var("BOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("BOARD_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .context("BOARD_PORT is not a valid port")?;
        let data_dir = env::var("BOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("data"));
        let pool_size = match env::var("BOARD_POOL_SIZE") {
            Ok(v) => v.parse().context("BOARD_POOL_SIZE is not a number")?,
            Err(_) => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            host,
            port,
            web_dir: project_root.join("web"),
            project_root,
            data_dir,
            pool_size,
        })
    }
}

/// `PROJECT_ROOT` if set, otherwise the working directory (or its parent
/// when started from inside `src/`).
pub fn project_root(env_root: Option<String>, cwd: Option<PathBuf>) -> PathBuf {
    if let Some(root) = env_root.filter(|r| !r.is_empty()) {
        info!("Using PROJECT_ROOT: {}", root);
        return PathBuf::from(root);
    }

    let Some(cwd) = cwd else {
        warn!("Cannot determine working directory, using '.'");
        return PathBuf::from(".");
    };

    if cwd.file_name().is_some_and(|name| name == "src") {
        return cwd.parent().map(Path::to_path_buf).unwrap_or(cwd);
    }
    cwd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        let root = project_root(Some("/srv/board".into()), Some("/tmp/src".into()));
        assert_eq!(root, PathBuf::from("/srv/board"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let root = project_root(Some(String::new()), Some("/tmp/app".into()));
        assert_eq!(root, PathBuf::from("/tmp/app"));
    }

    #[test]
    fn src_directory_resolves_to_parent() {
        let root = project_root(None, Some("/home/me/board/src".into()));
        assert_eq!(root, PathBuf::from("/home/me/board"));
    }

    #[test]
    fn unknown_cwd_falls_back_to_dot() {
        assert_eq!(project_root(None, None), PathBuf::from("."));
    }
}
