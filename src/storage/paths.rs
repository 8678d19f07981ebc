//! Paths inside the state directory and the shell history file.

use std::path::{Path, PathBuf};

/// Target settings file.
pub const TARGET_FILE: &str = "target.json";
/// Credentials file.
pub const CREDS_FILE: &str = "creds.json";
/// Prompt presets file.
pub const PROMPTS_FILE: &str = "prompts.json";
/// Bare parent message pointer.
pub const PARENT_FILE: &str = "parent_uuid";
/// Cached conversation listing.
pub const LISTING_FILE: &str = "list_chats";

/// Environment variable naming the shell history file.
pub const ENV_HISTFILE: &str = "HISTFILE";
/// History file used when `HISTFILE` is not set.
pub const DEFAULT_HISTORY_FILE: &str = ".zsh_history";

/// Files making up one state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    /// Paths rooted at the user-supplied state directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The state directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to `target.json`.
    #[must_use]
    pub fn target_file(&self) -> PathBuf {
        self.root.join(TARGET_FILE)
    }

    /// Path to `creds.json`.
    #[must_use]
    pub fn creds_file(&self) -> PathBuf {
        self.root.join(CREDS_FILE)
    }

    /// Path to `prompts.json`.
    #[must_use]
    pub fn prompts_file(&self) -> PathBuf {
        self.root.join(PROMPTS_FILE)
    }

    /// Path to `parent_uuid`.
    #[must_use]
    pub fn parent_file(&self) -> PathBuf {
        self.root.join(PARENT_FILE)
    }

    /// Path to `list_chats`.
    #[must_use]
    pub fn listing_file(&self) -> PathBuf {
        self.root.join(LISTING_FILE)
    }
}

/// Resolve the shell history file.
///
/// `HISTFILE` wins, then `$HOME/.zsh_history`, then the platform home directory.
#[must_use]
pub fn history_file() -> Option<PathBuf> {
    resolve_history_file(
        std::env::var_os(ENV_HISTFILE).map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn resolve_history_file(histfile: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = histfile.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    home.filter(|h| !h.as_os_str().is_empty())
        .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
        .map(|home| home.join(DEFAULT_HISTORY_FILE))
}
