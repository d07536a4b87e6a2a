//! Config file discovery across the search path.
//!
//! Directories are consulted in a fixed order and the first one holding
//! `config.yaml` wins. Finding nothing is not an error.

use std::path::PathBuf;
use tracing::debug;

/// Base name of the config file.
pub const CONFIG_BASE_NAME: &str = "config";

/// Accepted config file extension.
pub const CONFIG_EXTENSION: &str = "yaml";

/// Directory under `/etc` and `$HOME` that holds the config file.
pub const APP_DIR_NAME: &str = "emqx-exhook";

/// System-wide config directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/emqx-exhook";

/// Where a search directory comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLocation {
    /// `/etc/emqx-exhook`
    System,
    /// `~/.emqx-exhook`
    Home,
    /// The working directory
    WorkingDir,
    /// The parent of the working directory
    ParentDir,
    /// `./conf`
    ConfDir,
    /// Supplied explicitly by the caller
    Custom,
}

impl std::fmt::Display for SearchLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchLocation::System => write!(f, "system"),
            SearchLocation::Home => write!(f, "home"),
            SearchLocation::WorkingDir => write!(f, "working dir"),
            SearchLocation::ParentDir => write!(f, "parent dir"),
            SearchLocation::ConfDir => write!(f, "conf dir"),
            SearchLocation::Custom => write!(f, "custom"),
        }
    }
}

/// One entry of the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDir {
    pub path: PathBuf,
    pub location: SearchLocation,
}

/// Ordered list of directories searched for the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<SearchDir>,
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self::standard()
    }
}

impl SearchPaths {
    /// The documented search order, rooted at the real system, home and
    /// working directories. Relative entries resolve against the working
    /// directory at lookup time.
    pub fn standard() -> Self {
        let home = dirs::home_dir();
        Self::standard_with(PathBuf::from(SYSTEM_CONFIG_DIR), home, PathBuf::from("."))
    }

    /// The documented search order over explicit roots.
    ///
    /// The home entry is omitted when `home` is `None`.
    pub fn standard_with(system_dir: PathBuf, home: Option<PathBuf>, cwd: PathBuf) -> Self {
        let mut dirs = vec![SearchDir {
            path: system_dir,
            location: SearchLocation::System,
        }];
        if let Some(home) = home {
            dirs.push(SearchDir {
                path: home.join(format!(".{}", APP_DIR_NAME)),
                location: SearchLocation::Home,
            });
        }
        let parent = cwd.join("..");
        let conf = cwd.join("conf");
        dirs.push(SearchDir {
            path: cwd,
            location: SearchLocation::WorkingDir,
        });
        dirs.push(SearchDir {
            path: parent,
            location: SearchLocation::ParentDir,
        });
        dirs.push(SearchDir {
            path: conf,
            location: SearchLocation::ConfDir,
        });
        Self { dirs }
    }

    /// Search exactly these directories, in this order.
    pub fn with_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs
                .into_iter()
                .map(|path| SearchDir {
                    path,
                    location: SearchLocation::Custom,
                })
                .collect(),
        }
    }

    pub fn dirs(&self) -> &[SearchDir] {
        &self.dirs
    }

    /// Directory paths in search order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.dirs.iter().map(|d| d.path.clone()).collect()
    }

    /// Find `config.yaml` along this search path.
    pub fn find_config(&self) -> Option<PathBuf> {
        discover_config_path(&self.paths(), CONFIG_BASE_NAME, CONFIG_EXTENSION)
    }
}

/// Return `<dir>/<base_name>.<extension>` for the first directory in
/// `search_dirs` that contains it as a regular file.
pub fn discover_config_path(
    search_dirs: &[PathBuf],
    base_name: &str,
    extension: &str,
) -> Option<PathBuf> {
    let file_name = format!("{}.{}", base_name, extension);
    for dir in search_dirs {
        let candidate = dir.join(&file_name);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Found config file");
            return Some(candidate);
        }
        debug!(dir = %dir.display(), "No config file in search directory");
    }
    None
}
